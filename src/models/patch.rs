use serde::{Deserialize, Deserializer};

use super::ProductType;

/// Three-state field update: a key missing from the request body leaves the
/// field alone, an explicit `null` clears it, and a value overwrites it.
/// Collapsing `Absent` and `Null` would silently change update semantics, so
/// the distinction is kept in the type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Patch<T> {
    Absent,
    Null,
    Value(T),
}

// Not derived: the derive would demand T: Default for a variant that holds
// no value at all.
impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Writes the patch onto an optional field.
    pub fn apply_to(&self, slot: &mut Option<T>)
    where
        T: Clone,
    {
        match self {
            Patch::Absent => {}
            Patch::Null => *slot = None,
            Patch::Value(v) => *slot = Some(v.clone()),
        }
    }

    /// The value the field will hold after the patch, without applying it.
    pub fn resolve(&self, current: Option<T>) -> Option<T>
    where
        T: Clone,
    {
        match self {
            Patch::Absent => current,
            Patch::Null => None,
            Patch::Value(v) => Some(v.clone()),
        }
    }
}

// serde only invokes a field deserializer when the key is present, so a
// missing key falls back to `#[serde(default)]` (= Absent) and this impl only
// has to split `null` from a concrete value.
impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|opt| match opt {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

/// Partial update to a conference item, as received by the PUT item endpoint.
/// Only the fields staff can touch during the physical conference are here;
/// derived fields (net weight, suggested price, margins) are recomputed by the
/// engine and cannot be set directly, except for `new_cost`, whose manual
/// override is part of the workflow.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemPatch {
    pub product_type: Patch<ProductType>,
    pub total_paid_value: Patch<f64>,
    pub invoice_box_quantity: Patch<i32>,
    pub invoice_status: Patch<String>,
    pub units_per_box: Patch<i32>,
    pub total_units: Patch<i32>,
    pub box_id: Patch<i32>,
    pub box_quantity: Patch<i32>,
    pub gross_weight: Patch<f64>,
    pub quality: Patch<String>,
    pub photo_url: Patch<String>,
    pub observations: Patch<String>,
    pub checked: Patch<bool>,
    pub supplier_id: Patch<i32>,
    pub new_cost: Patch<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_absent() {
        let patch: ItemPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.gross_weight, Patch::Absent);
        assert_eq!(patch.quality, Patch::Absent);
    }

    #[test]
    fn explicit_null_clears() {
        let patch: ItemPatch = serde_json::from_str(r#"{"grossWeight": null}"#).unwrap();
        assert_eq!(patch.gross_weight, Patch::Null);
        assert_eq!(patch.box_id, Patch::Absent);
    }

    #[test]
    fn value_overwrites() {
        let patch: ItemPatch =
            serde_json::from_str(r#"{"grossWeight": 10.5, "boxQuantity": 4}"#).unwrap();
        assert_eq!(patch.gross_weight, Patch::Value(10.5));
        assert_eq!(patch.box_quantity, Patch::Value(4));
    }

    #[test]
    fn resolve_prefers_patch_over_current() {
        assert_eq!(Patch::Value(2).resolve(Some(1)), Some(2));
        assert_eq!(Patch::<i32>::Null.resolve(Some(1)), None);
        assert_eq!(Patch::<i32>::Absent.resolve(Some(1)), Some(1));
    }

    #[test]
    fn apply_to_three_states() {
        let mut slot = Some("keep".to_string());
        Patch::<String>::Absent.apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("keep"));
        Patch::Value("new".to_string()).apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("new"));
        Patch::<String>::Null.apply_to(&mut slot);
        assert_eq!(slot, None);
    }
}
