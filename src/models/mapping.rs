use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the object class → observation code lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCodeMapping {
    pub id: Uuid,
    /// Always stored lower-cased.
    pub class_name: String,
    pub observation_code: String,
    pub is_active: bool,
    pub updated_at: String,
}
