use crate::models::{Conference, ConferenceItem, ConferenceStatus, ConferenceTotals};

/// Sums item-level figures into conference totals. Items missing a figure
/// contribute 0 to that total with no warning; the cost total only counts
/// items carrying both a new cost and a net weight; one without the other
/// contributes nothing, not a partial product.
pub fn aggregate_totals(items: &[ConferenceItem]) -> ConferenceTotals {
    let mut totals = ConferenceTotals::default();
    for item in items {
        if let Some(expected) = item.expected_weight.filter(|v| *v != 0.0) {
            totals.total_expected_weight += expected;
        }
        if let Some(net) = item.net_weight.filter(|v| *v != 0.0) {
            totals.total_actual_weight += net;
        }
        if let (Some(cost), Some(net)) = (
            item.new_cost.filter(|v| *v != 0.0),
            item.net_weight.filter(|v| *v != 0.0),
        ) {
            totals.total_cost += cost * net;
        }
    }
    totals
}

/// Writes the aggregated totals onto the conference and moves it to its
/// terminal status. Deliberately permissive: items are not validated, and a
/// conference with no items finalizes with all-zero totals.
pub fn finalize(mut conference: Conference, items: &[ConferenceItem]) -> Conference {
    let totals = aggregate_totals(items);
    conference.total_expected_weight = Some(totals.total_expected_weight);
    conference.total_actual_weight = Some(totals.total_actual_weight);
    conference.total_cost = Some(totals.total_cost);
    conference.status = ConferenceStatus::Completed;
    conference
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn conference() -> Conference {
        Conference {
            id: 1,
            company_id: Some("lj01".to_string()),
            supplier_name: Some("CEASA".to_string()),
            invoice_number: Some("000123".to_string()),
            conference_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            status: ConferenceStatus::InProgress,
            total_expected_weight: None,
            total_actual_weight: None,
            total_cost: None,
            observations: None,
            created_at: Utc::now(),
        }
    }

    fn weighed(net: Option<f64>, cost: Option<f64>, expected: Option<f64>) -> ConferenceItem {
        ConferenceItem {
            net_weight: net,
            new_cost: cost,
            expected_weight: expected,
            ..ConferenceItem::default()
        }
    }

    #[test]
    fn totals_skip_items_missing_either_cost_factor() {
        let items = vec![
            weighed(Some(8.0), Some(2.5), Some(10.0)),
            // No net weight: counts toward expected only, never toward cost.
            weighed(None, Some(3.0), Some(5.0)),
        ];
        let totals = aggregate_totals(&items);
        assert_eq!(totals.total_actual_weight, 8.0);
        assert_eq!(totals.total_expected_weight, 15.0);
        assert_eq!(totals.total_cost, 20.0);
    }

    #[test]
    fn cost_needs_both_figures() {
        let items = vec![weighed(Some(4.0), None, None)];
        let totals = aggregate_totals(&items);
        assert_eq!(totals.total_actual_weight, 4.0);
        assert_eq!(totals.total_cost, 0.0);
    }

    #[test]
    fn finalize_freezes_totals_and_completes() {
        let items = vec![weighed(Some(8.0), Some(2.5), Some(10.0))];
        let done = finalize(conference(), &items);
        assert_eq!(done.status, ConferenceStatus::Completed);
        assert_eq!(done.total_actual_weight, Some(8.0));
        assert_eq!(done.total_expected_weight, Some(10.0));
        assert_eq!(done.total_cost, Some(20.0));
    }

    #[test]
    fn finalize_with_no_items_zeroes_totals() {
        // A pending conference with zero items finalizes anyway; the
        // aggregator does not re-verify intermediate state.
        let pending = Conference {
            status: ConferenceStatus::Pending,
            ..conference()
        };
        let done = finalize(pending, &[]);
        assert_eq!(done.status, ConferenceStatus::Completed);
        assert_eq!(done.total_expected_weight, Some(0.0));
        assert_eq!(done.total_actual_weight, Some(0.0));
        assert_eq!(done.total_cost, Some(0.0));
    }
}
