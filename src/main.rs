use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;

use pipevision_lib::api::{start_api_server, ApiContext};
use pipevision_lib::db::{self, DatabaseError};
use pipevision_lib::models::{AiSettings, SettingsError};
use pipevision_lib::{build_orchestrator, config, init_tracing};

#[derive(Debug, Parser)]
#[command(
    name = "pipevision",
    version,
    about = "Suggest observation fields from pipeline inspection frames",
    disable_help_subcommand = true
)]
struct Cli {
    /// Override the AI settings file
    #[arg(long = "settings", value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Override the object code mapping database
    #[arg(long = "mappings-db", value_name = "FILE", global = true)]
    mappings_db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one image and print the suggestion as JSON
    Analyze { image: PathBuf },
    /// Serve the HTTP API until interrupted
    Serve {
        #[arg(default_value = config::DEFAULT_API_ADDR)]
        addr: SocketAddr,
    },
    /// Map a detected object class to an observation code
    Map {
        class: String,
        code: String,
        /// Store the mapping but keep it out of suggestions
        #[arg(long)]
        inactive: bool,
    },
    /// List object code mappings
    Mappings,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Server(String),
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let settings_path = cli.settings.unwrap_or_else(config::settings_path);
    let mappings_db = cli.mappings_db.unwrap_or_else(config::mappings_db_path);

    match cli.command {
        Command::Analyze { image } => {
            let settings = AiSettings::load(&settings_path)?;
            let bytes = std::fs::read(&image)?;
            let orchestrator = build_orchestrator(&settings, &mappings_db);
            let suggestion = orchestrator.analyze(&bytes, &settings);
            let output = serde_json::json!({
                "suggestion": suggestion,
                "autoPopulate": suggestion.auto_populate(&settings),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(if suggestion.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Serve { addr } => {
            let settings = AiSettings::load(&settings_path)?;
            tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
            // Built before the runtime: the inference client is blocking.
            let ctx = ApiContext::new(build_orchestrator(&settings, &mappings_db), settings);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(serve(addr, ctx))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Map {
            class,
            code,
            inactive,
        } => {
            let conn = db::open_database(&mappings_db)?;
            db::upsert_mapping(&conn, &class, &code, !inactive)?;
            println!(
                "{} -> {}{}",
                db::normalize_class_name(&class),
                code.trim(),
                if inactive { " (inactive)" } else { "" }
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Mappings => {
            let conn = db::open_database(&mappings_db)?;
            for m in db::list_mappings(&conn)? {
                println!(
                    "{}\t{}\t{}",
                    m.class_name,
                    m.observation_code,
                    if m.is_active { "active" } else { "inactive" }
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(addr: SocketAddr, ctx: ApiContext) -> Result<(), CliError> {
    let mut server = start_api_server(addr, ctx).await.map_err(CliError::Server)?;
    println!("Listening on http://{}", server.addr);
    tokio::signal::ctrl_c().await?;
    server.shutdown();
    Ok(())
}
