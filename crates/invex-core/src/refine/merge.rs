//! Combining heuristic and refined records.

use serde::{Deserialize, Serialize};

use crate::models::record::{ExtractedRecord, InvoiceField};

/// Which side wins when both extraction passes produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Refined value when present, heuristic value otherwise.
    #[default]
    PreferRefined,
    /// Heuristic value when present; refinement only fills gaps.
    PreferHeuristic,
}

fn pick<T: Clone>(heuristic: &Option<T>, refined: &Option<T>, policy: MergePolicy) -> (Option<T>, bool) {
    match (policy, heuristic, refined) {
        (MergePolicy::PreferRefined, _, Some(r)) => (Some(r.clone()), true),
        (MergePolicy::PreferHeuristic, None, Some(r)) => (Some(r.clone()), true),
        _ => (heuristic.clone(), false),
    }
}

fn pick_list<T: Clone>(heuristic: &[T], refined: &[T], policy: MergePolicy) -> (Vec<T>, bool) {
    let take_refined = match policy {
        MergePolicy::PreferRefined => !refined.is_empty(),
        MergePolicy::PreferHeuristic => heuristic.is_empty() && !refined.is_empty(),
    };
    if take_refined {
        (refined.to_vec(), true)
    } else {
        (heuristic.to_vec(), false)
    }
}

/// Merge field by field. Returns the merged record and the names of the
/// fields whose value came from `refined`.
pub fn merge_records(
    heuristic: &ExtractedRecord,
    refined: &ExtractedRecord,
    policy: MergePolicy,
) -> (ExtractedRecord, Vec<&'static str>) {
    let mut taken = Vec::new();
    let mut note = |field: &'static str, from_refined: bool| {
        if from_refined {
            taken.push(field);
        }
    };

    macro_rules! merge_field {
        ($field:ident, $variant:expr) => {{
            let (value, from_refined) = pick(&heuristic.$field, &refined.$field, policy);
            note($variant.name(), from_refined);
            value
        }};
    }

    let invoice_number = merge_field!(invoice_number, InvoiceField::InvoiceNumber);
    let date = merge_field!(date, InvoiceField::Date);
    let vendor = merge_field!(vendor, InvoiceField::Vendor);
    let subtotal = merge_field!(subtotal, InvoiceField::Subtotal);
    let tax = merge_field!(tax, InvoiceField::Tax);
    let total = merge_field!(total, InvoiceField::Total);
    let currency = merge_field!(currency, InvoiceField::Currency);

    let (line_items, from_refined) = pick_list(&heuristic.line_items, &refined.line_items, policy);
    note("line_items", from_refined);
    let (headers, from_refined) = pick_list(&heuristic.headers, &refined.headers, policy);
    note("headers", from_refined);

    let merged = ExtractedRecord {
        invoice_number,
        date,
        vendor,
        subtotal,
        tax,
        total,
        currency,
        line_items,
        headers,
    };
    (merged, taken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::LineItem;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn heuristic() -> ExtractedRecord {
        ExtractedRecord {
            invoice_number: Some("INV-1".to_string()),
            total: Some(Decimal::new(24500, 2)),
            line_items: vec![LineItem {
                description: Some("Widget".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn refined() -> ExtractedRecord {
        ExtractedRecord {
            invoice_number: Some("INV-0001".to_string()),
            vendor: Some("Acme".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_prefer_refined() {
        let (merged, taken) = merge_records(&heuristic(), &refined(), MergePolicy::PreferRefined);
        assert_eq!(merged.invoice_number.as_deref(), Some("INV-0001"));
        assert_eq!(merged.vendor.as_deref(), Some("Acme"));
        // Absent in the refined record, so the heuristic value stays
        assert_eq!(merged.total, Some(Decimal::new(24500, 2)));
        assert_eq!(merged.line_items.len(), 1);
        assert_eq!(taken, vec!["invoice_number", "vendor"]);
    }

    #[test]
    fn test_prefer_heuristic() {
        let (merged, taken) = merge_records(&heuristic(), &refined(), MergePolicy::PreferHeuristic);
        assert_eq!(merged.invoice_number.as_deref(), Some("INV-1"));
        assert_eq!(merged.vendor.as_deref(), Some("Acme"));
        assert_eq!(taken, vec!["vendor"]);
    }

    #[test]
    fn test_line_items_merge_as_list() {
        let mut refined = refined();
        refined.line_items = vec![LineItem::default(), LineItem::default()];
        let (merged, taken) = merge_records(&heuristic(), &refined, MergePolicy::PreferRefined);
        assert_eq!(merged.line_items.len(), 2);
        assert!(taken.contains(&"line_items"));
    }

    #[test]
    fn test_policy_serde() {
        let policy: MergePolicy = serde_json::from_str("\"prefer_heuristic\"").unwrap();
        assert_eq!(policy, MergePolicy::PreferHeuristic);
        assert_eq!(serde_json::to_string(&MergePolicy::default()).unwrap(), "\"prefer_refined\"");
    }
}
