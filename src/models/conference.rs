use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{ConferenceItem, Patch};

/// Conference lifecycle. Transitions only move forward:
/// pending → in_progress (first item import) → completed (finalize, terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConferenceStatus {
    Pending,
    InProgress,
    Completed,
}

// Stored in a plain VARCHAR column; encode/decode through &str.
impl sqlx::Type<sqlx::Postgres> for ConferenceStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for ConferenceStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ConferenceStatus {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        ConferenceStatus::parse(<&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?)
    }
}

impl ConferenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConferenceStatus::Pending => "pending",
            ConferenceStatus::InProgress => "in_progress",
            ConferenceStatus::Completed => "completed",
        }
    }

    fn parse(s: &str) -> Result<Self, sqlx::error::BoxDynError> {
        match s {
            "pending" => Ok(ConferenceStatus::Pending),
            "in_progress" => Ok(ConferenceStatus::InProgress),
            "completed" => Ok(ConferenceStatus::Completed),
            other => Err(format!("unknown conference status: {other}").into()),
        }
    }

    /// Status after items are imported. Only a pending conference advances;
    /// importing into one that already moved on leaves the status untouched,
    /// so no path through here goes backward.
    pub fn advance_on_import(self) -> Self {
        match self {
            ConferenceStatus::Pending => ConferenceStatus::InProgress,
            other => other,
        }
    }

    /// Whether a direct edit may move this status to `next`. The legacy
    /// backend wrote whatever status the request carried, which could reopen
    /// a completed conference; here only forward (or same-state) moves pass.
    pub fn can_transition_to(self, next: Self) -> bool {
        next.rank() >= self.rank()
    }

    fn rank(self) -> u8 {
        match self {
            ConferenceStatus::Pending => 0,
            ConferenceStatus::InProgress => 1,
            ConferenceStatus::Completed => 2,
        }
    }
}

/// One goods-receiving session tied to a supplier invoice
/// (hortfrut_conferences). Totals stay NULL until finalize freezes them.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub id: i32,
    pub company_id: Option<String>,
    pub supplier_name: Option<String>,
    pub invoice_number: Option<String>,
    pub conference_date: NaiveDate,
    pub status: ConferenceStatus,
    pub total_expected_weight: Option<f64>,
    pub total_actual_weight: Option<f64>,
    pub total_cost: Option<f64>,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Conference with all of its items, as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ConferenceDetail {
    #[serde(flatten)]
    pub conference: Conference,
    pub items: Vec<ConferenceItem>,
}

/// Aggregated figures computed at finalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceTotals {
    pub total_expected_weight: f64,
    pub total_actual_weight: f64,
    pub total_cost: f64,
}

/// Payload for creating a conference.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConference {
    pub company_id: Option<String>,
    pub conference_date: NaiveDate,
    pub supplier_name: Option<String>,
    pub invoice_number: Option<String>,
    pub observations: Option<String>,
}

/// Partial update to a conference header, as received by the PUT conference
/// endpoint. Totals and the conference date are not editable; status moves
/// only forward.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferencePatch {
    pub supplier_name: Patch<String>,
    pub invoice_number: Patch<String>,
    pub observations: Patch<String>,
    pub status: Patch<ConferenceStatus>,
}

/// Listing filter (company, status, date window).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferenceFilter {
    pub company_id: Option<String>,
    pub status: Option<ConferenceStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_advances_only_from_pending() {
        assert_eq!(
            ConferenceStatus::Pending.advance_on_import(),
            ConferenceStatus::InProgress
        );
        assert_eq!(
            ConferenceStatus::InProgress.advance_on_import(),
            ConferenceStatus::InProgress
        );
        // A completed conference never reopens.
        assert_eq!(
            ConferenceStatus::Completed.advance_on_import(),
            ConferenceStatus::Completed
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ConferenceStatus::InProgress).unwrap(),
            r#""in_progress""#
        );
    }
}
