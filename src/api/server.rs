//! API server lifecycle: starts/stops the axum HTTP server that serves
//! analysis requests to the observation-entry workflow.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    /// Address actually bound; differs from the requested one for port 0.
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

/// Bind `addr`, mount `api_router`, and serve in a background task.
///
/// Port 0 picks an ephemeral port; the bound address is in the returned
/// handle.
pub async fn start_api_server(addr: SocketAddr, ctx: ApiContext) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::AiSettings;
    use crate::pipeline::analysis::AnalysisOrchestrator;
    use crate::pipeline::inference::{MockInferenceClient, RawModelOutput};
    use crate::pipeline::object_code::ObjectCodeResolver;

    fn test_ctx() -> ApiContext {
        let client = Arc::new(MockInferenceClient::new(RawModelOutput::default()));
        ApiContext::new(
            AnalysisOrchestrator::new(client, ObjectCodeResolver::empty()),
            AiSettings::default(),
        )
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start_api_server(loopback(), test_ctx())
            .await
            .expect("server should start");

        assert!(server.addr.port() > 0);

        let url = format!("http://{}/api/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["aiEnabled"], false);

        server.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn reports_bound_address() {
        let mut server = start_api_server(loopback(), test_ctx())
            .await
            .expect("server should start");

        assert!(server.addr.ip().is_loopback());
        assert_ne!(server.addr.port(), 0);

        server.shutdown();
    }

    #[tokio::test]
    async fn bind_conflict_is_error() {
        let mut first = start_api_server(loopback(), test_ctx()).await.unwrap();
        let second = start_api_server(first.addr, test_ctx()).await;
        assert!(second.is_err());
        first.shutdown();
    }
}
