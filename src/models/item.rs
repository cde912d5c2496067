use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Weighing mode of an item: priced by net weight or by unit count. Items
/// imported from the invoice start without a mode (NULL column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Kg,
    Unit,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Kg => "kg",
            ProductType::Unit => "unit",
        }
    }

    fn parse(s: &str) -> Result<Self, sqlx::error::BoxDynError> {
        match s {
            "kg" => Ok(ProductType::Kg),
            "unit" => Ok(ProductType::Unit),
            other => Err(format!("unknown product type: {other}").into()),
        }
    }
}

// Stored in a plain VARCHAR column; encode/decode through &str.
impl sqlx::Type<sqlx::Postgres> for ProductType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for ProductType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ProductType {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        ProductType::parse(<&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?)
    }
}

/// One invoice line inside a receiving conference (hortfrut_conference_items).
///
/// The catalog columns (barcode, curve, section, groups) and the current
/// price/margin figures come in via CSV import; the weighing columns are
/// filled field-by-field during the physical conference; the derived columns
/// (net_weight, new_cost, suggested_price and the two margins) are owned by
/// the recompute engine.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceItem {
    pub id: i32,
    pub conference_id: i32,

    // Product data imported from the invoice/catalog
    pub barcode: Option<String>,
    pub product_name: String,
    pub curve: Option<String>,
    pub section: Option<String>,
    pub product_group: Option<String>,
    pub sub_group: Option<String>,

    // Prices and margins as they currently stand in the system
    pub current_cost: Option<f64>,
    pub current_sale_price: Option<f64>,
    pub reference_margin: Option<f64>,
    pub current_margin: Option<f64>,

    // Conference data entered by the operator
    pub product_type: Option<ProductType>,
    pub total_paid_value: Option<f64>,
    pub new_cost: Option<f64>,
    pub supplier_id: Option<i32>,
    pub box_id: Option<i32>,
    pub box_quantity: Option<i32>,
    pub gross_weight: Option<f64>,
    pub net_weight: Option<f64>,
    pub expected_weight: Option<f64>,
    pub weight_difference: Option<f64>,
    pub total_units: Option<i32>,
    pub units_per_box: Option<i32>,
    pub invoice_box_quantity: Option<i32>,
    pub invoice_status: Option<String>,

    // System calculations
    pub suggested_price: Option<f64>,
    pub margin_if_keep_price: Option<f64>,

    // Quality and photos
    pub quality: Option<String>,
    pub photo_url: Option<String>,
    pub observations: Option<String>,

    pub checked: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Not derived: a blank row pins both timestamps to the epoch instead of
// demanding Default from DateTime.
impl Default for ConferenceItem {
    fn default() -> Self {
        ConferenceItem {
            id: 0,
            conference_id: 0,
            barcode: None,
            product_name: String::new(),
            curve: None,
            section: None,
            product_group: None,
            sub_group: None,
            current_cost: None,
            current_sale_price: None,
            reference_margin: None,
            current_margin: None,
            product_type: None,
            total_paid_value: None,
            new_cost: None,
            supplier_id: None,
            box_id: None,
            box_quantity: None,
            gross_weight: None,
            net_weight: None,
            expected_weight: None,
            weight_difference: None,
            total_units: None,
            units_per_box: None,
            invoice_box_quantity: None,
            invoice_status: None,
            suggested_price: None,
            margin_if_keep_price: None,
            quality: None,
            photo_url: None,
            observations: None,
            checked: false,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }
}

/// One row of a bulk item import. The CSV itself is parsed by the caller;
/// this is the already-structured line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    pub barcode: Option<String>,
    pub product_name: String,
    pub curve: Option<String>,
    pub section: Option<String>,
    pub product_group: Option<String>,
    pub sub_group: Option<String>,
    pub current_cost: Option<f64>,
    pub current_sale_price: Option<f64>,
    pub reference_margin: Option<f64>,
    pub current_margin: Option<f64>,
    pub expected_weight: Option<f64>,
}
