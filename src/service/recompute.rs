use crate::error::AppError;
use crate::models::{ConferenceItem, ItemPatch, Patch, ProductType};

/// Resolves a box id to its tare weight. `Ok(None)` means the box is unknown;
/// only a transport/storage failure is an error.
pub trait BoxLookup {
    fn tare_weight(&self, box_id: i32) -> Result<Option<f64>, AppError>;
}

/// Applies a partial update to an item snapshot and re-derives the dependent
/// fields. The cascade runs in a fixed order; each step states its own
/// preconditions and skips silently when they do not hold:
///
/// 1. apply_patch          (verbatim field assignment)
/// 2. reconcile_weight     (net weight from gross weight and box tare)
/// 3. derive_cost          (corrected unit cost from the paid value)
/// 4. derive_suggested_price
/// 5. derive_current_margin
/// 6. derive_margin_if_keep_price
///
/// Degenerate arithmetic (margin of 100%, zero sale price) resolves to
/// infinite or NaN values rather than an error; downstream screens show them
/// as-is. The only failure path is a storage failure inside the box lookup.
pub fn recompute_item(
    existing: &ConferenceItem,
    patch: &ItemPatch,
    boxes: &dyn BoxLookup,
) -> Result<ConferenceItem, AppError> {
    let next = apply_patch(existing.clone(), patch);
    let next = reconcile_weight(next, boxes)?;
    let next = derive_cost(next);
    let next = derive_suggested_price(next);
    let next = derive_current_margin(next);
    let next = derive_margin_if_keep_price(next);
    Ok(next)
}

/// Step 1: every field present in the patch is written onto the snapshot,
/// including a direct new_cost override. Absent fields stay as they are.
fn apply_patch(mut item: ConferenceItem, patch: &ItemPatch) -> ConferenceItem {
    patch.product_type.apply_to(&mut item.product_type);
    patch.total_paid_value.apply_to(&mut item.total_paid_value);
    patch.invoice_box_quantity.apply_to(&mut item.invoice_box_quantity);
    patch.invoice_status.apply_to(&mut item.invoice_status);
    patch.units_per_box.apply_to(&mut item.units_per_box);
    patch.total_units.apply_to(&mut item.total_units);
    patch.box_id.apply_to(&mut item.box_id);
    patch.box_quantity.apply_to(&mut item.box_quantity);
    patch.gross_weight.apply_to(&mut item.gross_weight);
    patch.quality.apply_to(&mut item.quality);
    patch.photo_url.apply_to(&mut item.photo_url);
    patch.observations.apply_to(&mut item.observations);
    patch.supplier_id.apply_to(&mut item.supplier_id);
    patch.new_cost.apply_to(&mut item.new_cost);
    // checked backs a NOT NULL column, so `null` has no value to store and is
    // treated the same as an absent key.
    if let Patch::Value(checked) = patch.checked {
        item.checked = checked;
    }
    item
}

/// Step 2: net weight = gross weight - tare * box count, but only once gross
/// weight, box and box count are all present and non-zero. When the box id
/// does not resolve, the previous net weight is kept; the legacy backend
/// swallowed the miss and it is unsettled whether that was fallback or bug,
/// so the behavior is preserved (see tests).
fn reconcile_weight(
    mut item: ConferenceItem,
    boxes: &dyn BoxLookup,
) -> Result<ConferenceItem, AppError> {
    let (Some(gross), Some(box_id), Some(box_quantity)) =
        (item.gross_weight, item.box_id, item.box_quantity)
    else {
        return Ok(item);
    };
    if gross == 0.0 || box_id == 0 || box_quantity == 0 {
        return Ok(item);
    }
    if let Some(tare) = boxes.tare_weight(box_id)? {
        // Negative net weight is allowed; the conference screen flags it.
        item.net_weight = Some(gross - tare * f64::from(box_quantity));
    }
    Ok(item)
}

/// Step 3: new cost from the invoice total. Kg items divide by net weight,
/// unit items by unit count; when neither denominator is usable the value
/// assigned in step 1 (possibly a manual override) stays.
fn derive_cost(mut item: ConferenceItem) -> ConferenceItem {
    let Some(paid) = item.total_paid_value.filter(|v| *v != 0.0) else {
        return item;
    };
    match item.product_type {
        Some(ProductType::Kg) => {
            if let Some(net) = item.net_weight.filter(|w| *w > 0.0) {
                item.new_cost = Some(paid / net);
            }
        }
        Some(ProductType::Unit) => {
            if let Some(units) = item.total_units.filter(|u| *u > 0) {
                item.new_cost = Some(paid / f64::from(units));
            }
        }
        None => {}
    }
    item
}

/// Step 4: sale price needed to hit the reference margin. A reference margin
/// of 100 divides by zero and stores an infinite price; above 100 the price
/// goes negative. Both are outputs the conference screens already tolerate
/// and are kept unguarded.
fn derive_suggested_price(mut item: ConferenceItem) -> ConferenceItem {
    if let (Some(cost), Some(margin)) = (
        item.new_cost.filter(|v| *v != 0.0),
        item.reference_margin.filter(|v| *v != 0.0),
    ) {
        item.suggested_price = Some(cost / (1.0 - margin / 100.0));
    }
    item
}

/// Step 5: always recomputed, even when the patch touched nothing
/// price-related, overwriting whatever the import supplied.
fn derive_current_margin(mut item: ConferenceItem) -> ConferenceItem {
    if let (Some(cost), Some(price)) = (
        item.current_cost.filter(|v| *v != 0.0),
        item.current_sale_price.filter(|v| *v != 0.0),
    ) {
        if price > 0.0 {
            item.current_margin = Some((price - cost) / price * 100.0);
        }
    }
    item
}

/// Step 6: margin obtained by keeping the current sale price at the new cost.
/// No zero-guard on the sale price, matching the legacy arithmetic.
fn derive_margin_if_keep_price(mut item: ConferenceItem) -> ConferenceItem {
    if let (Some(cost), Some(price)) = (
        item.new_cost.filter(|v| *v != 0.0),
        item.current_sale_price.filter(|v| *v != 0.0),
    ) {
        item.margin_if_keep_price = Some((price - cost) / price * 100.0);
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Boxes(HashMap<i32, f64>);

    impl Boxes {
        fn with(entries: &[(i32, f64)]) -> Self {
            Boxes(entries.iter().copied().collect())
        }

        fn empty() -> Self {
            Boxes(HashMap::new())
        }
    }

    impl BoxLookup for Boxes {
        fn tare_weight(&self, box_id: i32) -> Result<Option<f64>, AppError> {
            Ok(self.0.get(&box_id).copied())
        }
    }

    fn item() -> ConferenceItem {
        ConferenceItem {
            product_name: "Banana Prata".to_string(),
            ..ConferenceItem::default()
        }
    }

    fn weigh_patch() -> ItemPatch {
        ItemPatch {
            gross_weight: Patch::Value(10.0),
            box_id: Patch::Value(1),
            box_quantity: Patch::Value(4),
            ..ItemPatch::default()
        }
    }

    #[test]
    fn net_weight_subtracts_tare_per_box() {
        let boxes = Boxes::with(&[(1, 0.5)]);
        let next = recompute_item(&item(), &weigh_patch(), &boxes).unwrap();
        assert_eq!(next.net_weight, Some(8.0));
    }

    #[test]
    fn negative_net_weight_is_allowed() {
        let boxes = Boxes::with(&[(1, 1.0)]);
        let patch = ItemPatch {
            gross_weight: Patch::Value(1.0),
            ..weigh_patch()
        };
        let next = recompute_item(&item(), &patch, &boxes).unwrap();
        assert_eq!(next.net_weight, Some(-3.0));
    }

    #[test]
    fn unknown_box_keeps_previous_net_weight() {
        let existing = ConferenceItem {
            net_weight: Some(3.2),
            ..item()
        };
        let next = recompute_item(&existing, &weigh_patch(), &Boxes::empty()).unwrap();
        assert_eq!(next.net_weight, Some(3.2));
    }

    #[test]
    fn weight_skipped_when_any_input_missing() {
        let boxes = Boxes::with(&[(1, 0.5)]);
        let patch = ItemPatch {
            box_quantity: Patch::Null,
            ..weigh_patch()
        };
        let next = recompute_item(&item(), &patch, &boxes).unwrap();
        assert_eq!(next.net_weight, None);
    }

    #[test]
    fn kg_cost_divides_paid_value_by_net_weight() {
        let boxes = Boxes::with(&[(1, 0.5)]);
        let existing = ConferenceItem {
            product_type: Some(ProductType::Kg),
            ..item()
        };
        let patch = ItemPatch {
            total_paid_value: Patch::Value(20.0),
            ..weigh_patch()
        };
        // gross 10 - 0.5 * 4 = net 8; 20 / 8 = 2.5
        let next = recompute_item(&existing, &patch, &boxes).unwrap();
        assert_eq!(next.net_weight, Some(8.0));
        assert_eq!(next.new_cost, Some(2.5));
    }

    #[test]
    fn unit_cost_divides_paid_value_by_units() {
        let patch = ItemPatch {
            product_type: Patch::Value(ProductType::Unit),
            total_paid_value: Patch::Value(40.0),
            total_units: Patch::Value(8),
            ..ItemPatch::default()
        };
        let next = recompute_item(&item(), &patch, &Boxes::empty()).unwrap();
        assert_eq!(next.new_cost, Some(5.0));
    }

    #[test]
    fn manual_cost_override_survives_when_no_denominator() {
        let patch = ItemPatch {
            new_cost: Patch::Value(7.25),
            total_paid_value: Patch::Value(100.0),
            ..ItemPatch::default()
        };
        // No product type, no weight, no units: step 3 cannot derive and the
        // override from step 1 stands.
        let next = recompute_item(&item(), &patch, &Boxes::empty()).unwrap();
        assert_eq!(next.new_cost, Some(7.25));
    }

    #[test]
    fn suggested_price_targets_reference_margin() {
        let existing = ConferenceItem {
            reference_margin: Some(20.0),
            ..item()
        };
        let patch = ItemPatch {
            new_cost: Patch::Value(10.0),
            ..ItemPatch::default()
        };
        let next = recompute_item(&existing, &patch, &Boxes::empty()).unwrap();
        assert_eq!(next.suggested_price, Some(12.5));
    }

    #[test]
    fn full_reference_margin_yields_infinite_price() {
        let existing = ConferenceItem {
            reference_margin: Some(100.0),
            ..item()
        };
        let patch = ItemPatch {
            new_cost: Patch::Value(10.0),
            ..ItemPatch::default()
        };
        let next = recompute_item(&existing, &patch, &Boxes::empty()).unwrap();
        assert!(next.suggested_price.unwrap().is_infinite());
    }

    #[test]
    fn current_margin_recomputed_on_unrelated_patch() {
        let existing = ConferenceItem {
            current_cost: Some(10.0),
            current_sale_price: Some(20.0),
            // Stale figure from the import; any update overwrites it.
            current_margin: Some(1.0),
            ..item()
        };
        let patch = ItemPatch {
            quality: Patch::Value("good".to_string()),
            ..ItemPatch::default()
        };
        let next = recompute_item(&existing, &patch, &Boxes::empty()).unwrap();
        assert_eq!(next.current_margin, Some(50.0));
        assert_eq!(next.quality.as_deref(), Some("good"));
    }

    #[test]
    fn margin_if_keep_price_uses_new_cost() {
        let existing = ConferenceItem {
            current_sale_price: Some(20.0),
            ..item()
        };
        let patch = ItemPatch {
            new_cost: Patch::Value(10.0),
            ..ItemPatch::default()
        };
        let next = recompute_item(&existing, &patch, &Boxes::empty()).unwrap();
        assert_eq!(next.margin_if_keep_price, Some(50.0));
    }

    #[test]
    fn recompute_is_idempotent() {
        let boxes = Boxes::with(&[(1, 0.5)]);
        let existing = ConferenceItem {
            product_type: Some(ProductType::Kg),
            current_cost: Some(2.0),
            current_sale_price: Some(4.0),
            reference_margin: Some(20.0),
            ..item()
        };
        let patch = ItemPatch {
            total_paid_value: Patch::Value(20.0),
            checked: Patch::Value(true),
            ..weigh_patch()
        };
        let once = recompute_item(&existing, &patch, &boxes).unwrap();
        let twice = recompute_item(&once, &patch, &boxes).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn null_checked_leaves_flag_untouched() {
        let existing = ConferenceItem {
            checked: true,
            ..item()
        };
        let patch: ItemPatch = serde_json::from_str(r#"{"checked": null}"#).unwrap();
        let next = recompute_item(&existing, &patch, &Boxes::empty()).unwrap();
        assert!(next.checked);
    }

    #[test]
    fn later_update_from_same_snapshot_discards_earlier_patch() {
        // Two operators edit the same item from the same loaded snapshot.
        // Each recompute starts from that snapshot, so the result of the
        // second carries nothing from the first; persisting whole rows in
        // arrival order means the last write wins.
        let boxes = Boxes::with(&[(1, 0.5)]);
        let base = item();

        let first = recompute_item(&base, &weigh_patch(), &boxes).unwrap();
        assert_eq!(first.net_weight, Some(8.0));

        let second_patch = ItemPatch {
            quality: Patch::Value("good".to_string()),
            ..ItemPatch::default()
        };
        let second = recompute_item(&base, &second_patch, &boxes).unwrap();
        assert_eq!(second.quality.as_deref(), Some("good"));
        assert_eq!(second.gross_weight, None);
        assert_eq!(second.net_weight, None);
        assert_eq!(second.box_id, None);
    }

    #[test]
    fn null_patch_clears_and_stops_derivation() {
        let boxes = Boxes::with(&[(1, 0.5)]);
        let existing = recompute_item(&item(), &weigh_patch(), &boxes).unwrap();
        assert_eq!(existing.net_weight, Some(8.0));

        let patch = ItemPatch {
            gross_weight: Patch::Null,
            ..ItemPatch::default()
        };
        let next = recompute_item(&existing, &patch, &boxes).unwrap();
        // Gross weight cleared; the stale net weight stays because step 2's
        // preconditions no longer hold.
        assert_eq!(next.gross_weight, None);
        assert_eq!(next.net_weight, Some(8.0));
    }
}
