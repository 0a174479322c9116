//! Categorized spending breakdown

use std::collections::HashMap;

use crate::models::{CategoryTotal, Transaction};

/// Categories excluded from spend: internal transfers are not purchases
const TRANSFER_CATEGORIES: [&str; 2] = ["Transfer", "Transfer Out"];

/// Maximum number of breakdown entries returned
const MAX_CATEGORIES: usize = 5;

/// Fallback category for transactions the provider left uncategorized
const UNCATEGORIZED: &str = "Uncategorized";

/// Roll transactions into a categorized spending breakdown
///
/// Pure function of its input:
/// - internal transfers (`Transfer` / `Transfer Out`) are excluded
/// - only positive amounts (outflows) count as spend
/// - missing or empty categories map to `Uncategorized`
/// - output is sorted by total descending, ties broken by category name
/// - at most the top 5 categories are returned; the rest are dropped,
///   not folded into an "Other" bucket
pub fn compute_breakdown(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for tx in transactions {
        if !tx.is_spend() {
            continue;
        }

        let category = tx
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);

        if TRANSFER_CATEGORIES.contains(&category) {
            continue;
        }

        *totals.entry(category).or_insert(0.0) += tx.amount;
    }

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    breakdown.truncate(MAX_CATEGORIES);

    breakdown
}
