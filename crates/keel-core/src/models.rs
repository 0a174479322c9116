//! Shared data model for the aggregation and forecasting engine
//!
//! Everything here is an immutable snapshot type: accounts and transactions
//! are fetched once per analysis session and never mutated, and the derived
//! views (breakdown, forecast, anomaly report) are recomputed from scratch
//! on every request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Account type as reported by the bank-data provider
///
/// Determines the sign convention when computing the net balance:
/// depository and investment balances count as assets, credit and loan
/// balances count as debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Depository,
    Investment,
    Credit,
    Loan,
    /// Anything the provider reports that we don't recognize
    #[serde(other)]
    Other,
}

impl AccountType {
    /// Sign applied to this account's balance when summing net worth
    pub fn balance_sign(&self) -> f64 {
        match self {
            AccountType::Depository | AccountType::Investment | AccountType::Other => 1.0,
            AccountType::Credit | AccountType::Loan => -1.0,
        }
    }
}

/// A linked account snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub name: String,
    /// Current balance; positive = asset value
    pub balance: f64,
}

impl Account {
    /// Balance contribution to the net total (debt subtracts)
    pub fn net_balance(&self) -> f64 {
        self.balance * self.account_type.balance_sign()
    }
}

/// A single transaction from an account's feed
///
/// Sign convention follows the provider: positive amount = money leaving
/// the account (a debit/spend), negative = inflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    /// Merchant name / description
    pub name: String,
    /// Provider-assigned category, possibly absent
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
}

impl Transaction {
    /// Whether this transaction counts as spend (an outflow)
    pub fn is_spend(&self) -> bool {
        self.amount > 0.0
    }
}

/// A savings goal: reach `target_amount` by `target_date`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Goal {
    pub target_amount: f64,
    pub target_date: NaiveDate,
}

impl Goal {
    /// Build a validated goal from raw request fields
    pub fn parse(target_amount: f64, target_date: &str) -> Result<Self> {
        if !target_amount.is_finite() || target_amount < 0.0 {
            return Err(Error::InvalidGoal(format!(
                "target amount must be non-negative, got {}",
                target_amount
            )));
        }

        let target_date = NaiveDate::parse_from_str(target_date, "%Y-%m-%d")
            .map_err(|_| Error::InvalidGoal(format!("unparseable target date: {}", target_date)))?;

        Ok(Self {
            target_amount,
            target_date,
        })
    }
}

/// One entry of a spending breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// One day of the forecast history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    /// Observed balance; present only for past days with history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    /// Fitted trend value, present for every day including future ones
    pub trend: f64,
}

/// Result of a savings-goal forecast
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    pub current_balance: f64,
    pub projected_balance: f64,
    pub is_on_track: bool,
    /// Daily series ordered by date ascending, from the earliest history
    /// date through the goal's target date
    pub history: Vec<BalancePoint>,
    pub ai_insight: String,
}

/// Estimated billing cadence of a recurring charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Weekly,
    Monthly,
    Yearly,
}

impl Cadence {
    /// Map a median gap between occurrences to a cadence estimate
    ///
    /// Mirrors the interval bands used for subscription frequency detection:
    /// under 10 days reads as weekly, under 45 as monthly, under 400 as
    /// yearly. Anything longer is too sparse to call recurring.
    pub fn from_gap_days(gap: f64) -> Option<Self> {
        if gap < 10.0 {
            Some(Cadence::Weekly)
        } else if gap < 45.0 {
            Some(Cadence::Monthly)
        } else if gap < 400.0 {
            Some(Cadence::Yearly)
        } else {
            None
        }
    }
}

/// A flagged recurring ("gray") charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringCharge {
    /// Normalized merchant name
    pub merchant: String,
    /// Typical charge amount (median across occurrences)
    pub amount: f64,
    pub cadence: Cadence,
    /// Median gap between consecutive occurrences, in days
    pub interval_days: i64,
    pub occurrences: usize,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

/// Result of the gray-charge scan
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    /// Human-readable summary of the findings
    pub narrative: String,
    /// The numeric findings the narrative was generated from
    pub recurring_charges: Vec<RecurringCharge>,
}

/// Numeric summary handed to the insight service for forecast narration
///
/// Deliberately carries no transaction-level detail: only the goal, the
/// fitted trend, and category rollups.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastSummary {
    pub target_amount: f64,
    pub target_date: NaiveDate,
    pub current_balance: f64,
    pub projected_balance: f64,
    pub is_on_track: bool,
    /// Fitted trend slope in dollars per day
    pub daily_trend: f64,
    /// Top spending categories over the recent window
    pub top_categories: Vec<CategoryTotal>,
}
