//! Gray-charge detection
//!
//! Scans a lookback window for recurring, subscription-like charges: the
//! same merchant billing approximately the same amount on a steady cadence.
//! Detection is pure pattern matching over (merchant, amount, gaps); no
//! category labels or provider hints are consulted.

use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::Result;
use crate::insight::{InsightBackend, InsightClient};
use crate::models::{AnomalyReport, Cadence, RecurringCharge, Transaction};
use crate::store::TransactionStore;

/// Detection configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Days of history to scan
    pub lookback_days: i64,
    /// Charges within the same whole-dollar bucket are treated as the same
    /// amount (±$1 tolerance band)
    pub amount_bucket: f64,
    /// Allowed deviation of each gap from the median gap (fraction)
    pub gap_tolerance: f64,
    /// Minimum occurrences before a group can be flagged
    pub min_occurrences: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lookback_days: 60,
            amount_bucket: 1.0,
            gap_tolerance: 0.20,
            min_occurrences: 2,
        }
    }
}

/// Recurring-charge ("gray charge") detector
pub struct GrayChargeDetector {
    config: DetectorConfig,
}

impl Default for GrayChargeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GrayChargeDetector {
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
        }
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Scan the snapshot and narrate the findings
    ///
    /// The insight payload carries only the detected patterns (merchant,
    /// amount, cadence, count), never the raw feed. An insight failure
    /// degrades to a generated numeric narrative.
    pub async fn analyze(
        &self,
        store: &TransactionStore,
        insight: Option<&InsightClient>,
    ) -> Result<AnomalyReport> {
        self.analyze_as_of(store, Utc::now().date_naive(), insight)
            .await
    }

    /// Analyze with an explicit "today" (injected for deterministic tests)
    pub async fn analyze_as_of(
        &self,
        store: &TransactionStore,
        today: NaiveDate,
        insight: Option<&InsightClient>,
    ) -> Result<AnomalyReport> {
        let recurring_charges = self.detect_recurring_charges(store.transactions(), today);

        let narrative = match insight {
            Some(client) => match client.summarize_recurring(&recurring_charges).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Insight service failed, degrading to numeric narrative");
                    fallback_narrative(&recurring_charges)
                }
            },
            None => fallback_narrative(&recurring_charges),
        };

        Ok(AnomalyReport {
            narrative,
            recurring_charges,
        })
    }

    /// Find recurring charges in the lookback window
    ///
    /// Groups spend transactions by (normalized merchant, whole-dollar
    /// amount bucket) and flags a group when it has at least
    /// `min_occurrences` and every gap between consecutive occurrences
    /// falls within `gap_tolerance` of the median gap. An empty result
    /// means nothing qualified; it is not an error.
    pub fn detect_recurring_charges(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Vec<RecurringCharge> {
        let cutoff = today - Duration::days(self.config.lookback_days);

        let mut groups: HashMap<(String, i64), Vec<&Transaction>> = HashMap::new();
        for tx in transactions {
            if !tx.is_spend() || tx.date < cutoff || tx.date > today {
                continue;
            }
            let merchant = normalize_merchant(&tx.name);
            let bucket = (tx.amount / self.config.amount_bucket).round() as i64;
            groups.entry((merchant, bucket)).or_default().push(tx);
        }

        let mut charges = Vec::new();
        for ((merchant, _), mut txs) in groups {
            if txs.len() < self.config.min_occurrences {
                continue;
            }
            txs.sort_by_key(|t| t.date);

            let gaps: Vec<f64> = txs
                .windows(2)
                .map(|w| (w[1].date - w[0].date).num_days() as f64)
                .collect();

            let median_gap = median(&gaps);
            if median_gap < 1.0 {
                // Same-day duplicates are a billing hiccup, not a cadence
                continue;
            }

            let tolerance = median_gap * self.config.gap_tolerance;
            let consistent = gaps.iter().all(|g| (g - median_gap).abs() <= tolerance);
            if !consistent {
                continue;
            }

            let Some(cadence) = Cadence::from_gap_days(median_gap) else {
                continue;
            };

            let amounts: Vec<f64> = txs.iter().map(|t| t.amount).collect();

            debug!(
                merchant = %merchant,
                occurrences = txs.len(),
                median_gap,
                "Flagged recurring charge"
            );

            charges.push(RecurringCharge {
                merchant,
                amount: median(&amounts),
                cadence,
                interval_days: median_gap.round() as i64,
                occurrences: txs.len(),
                first_seen: txs.first().map(|t| t.date).unwrap_or(today),
                last_seen: txs.last().map(|t| t.date).unwrap_or(today),
            });
        }

        // Largest typical amount first; merchant name breaks ties so the
        // output is deterministic across runs
        charges.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.merchant.cmp(&b.merchant))
        });

        charges
    }
}

/// Simple merchant name normalization
///
/// Uppercases, strips separator punctuation, drops trailing reference
/// digits, and keeps the first three words — enough to make
/// "NETFLIX.COM*8841" and "NETFLIX.COM*9023" group together.
fn normalize_merchant(name: &str) -> String {
    static TRAILING_REF: OnceLock<Regex> = OnceLock::new();
    let trailing_ref = TRAILING_REF.get_or_init(|| Regex::new(r"\b\d{3,}\b").unwrap());

    let upper = name.to_uppercase().replace(['*', '#'], " ");
    let stripped = trailing_ref.replace_all(&upper, " ");

    stripped
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Calculate median of a slice
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Numeric fallback when no insight backend is configured or it fails
fn fallback_narrative(charges: &[RecurringCharge]) -> String {
    if charges.is_empty() {
        return "No recurring charges detected in this window.".to_string();
    }

    let total: f64 = charges.iter().map(|c| c.amount).sum();
    let lines: Vec<String> = charges
        .iter()
        .map(|c| {
            format!(
                "{} at ${:.2} ({:?}, {} charges)",
                c.merchant,
                c.amount,
                c.cadence,
                c.occurrences
            )
        })
        .collect();

    format!(
        "Detected {} recurring charge(s) totaling ${:.2} per cycle: {}.",
        charges.len(),
        total,
        lines.join("; ")
    )
}
