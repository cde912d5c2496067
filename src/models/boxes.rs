use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Patch;

/// Reusable shipping crate with a fixed tare weight (hortfrut_boxes). The
/// recompute engine only ever reads the tare; CRUD lives at the API layer.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxRecord {
    pub id: i32,
    pub company_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub weight: f64,
    pub photo_url: Option<String>,
    pub active: bool,
}

/// Payload for registering a box.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBox {
    pub company_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub weight: f64,
    pub photo_url: Option<String>,
}

/// Partial box update; same three-state semantics as item patches. `Null` on
/// a required column (name, weight, active) is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxPatch {
    pub name: Patch<String>,
    pub description: Patch<String>,
    pub weight: Patch<f64>,
    pub active: Patch<bool>,
    pub photo_url: Patch<String>,
}

/// Listing filter for boxes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxFilter {
    pub company_id: Option<String>,
    pub active: Option<bool>,
}
