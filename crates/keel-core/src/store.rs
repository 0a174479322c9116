//! Transaction store: one user's normalized snapshot for an analysis session

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::models::{Account, Transaction};

/// Immutable snapshot of one user's accounts and transactions
///
/// Built once per analysis session from a provider feed and then handed to
/// the aggregation, forecasting, and detection code. Normalization on
/// construction: transactions are sorted by date ascending and empty
/// categories are mapped to `None`.
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
}

impl TransactionStore {
    pub fn new(accounts: Vec<Account>, mut transactions: Vec<Transaction>) -> Self {
        for tx in &mut transactions {
            if tx.category.as_deref().is_some_and(|c| c.trim().is_empty()) {
                tx.category = None;
            }
        }
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        Self {
            accounts,
            transactions,
        }
    }

    /// Consume the store, yielding the normalized accounts and transactions
    pub fn into_parts(self) -> (Vec<Account>, Vec<Transaction>) {
        (self.accounts, self.transactions)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Net balance across all accounts (debt accounts subtract)
    pub fn net_balance(&self) -> f64 {
        self.accounts.iter().map(|a| a.net_balance()).sum()
    }

    /// Earliest transaction date in the snapshot, if any
    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.transactions.first().map(|t| t.date)
    }

    /// Transactions on or after the cutoff date
    pub fn transactions_since(&self, cutoff: NaiveDate) -> &[Transaction] {
        let start = self.transactions.partition_point(|t| t.date < cutoff);
        &self.transactions[start..]
    }

    /// Signed net flow per day (positive = money left the account that day)
    pub fn daily_net_flow(&self) -> HashMap<NaiveDate, f64> {
        let mut by_date: HashMap<NaiveDate, f64> = HashMap::new();
        for tx in &self.transactions {
            *by_date.entry(tx.date).or_insert(0.0) += tx.amount;
        }
        by_date
    }
}
