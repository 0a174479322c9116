//! Sandbox provider for tests and local development
//!
//! Produces a deterministic synthetic feed: a recurring streaming charge,
//! monthly rent, payroll inflows, weekly groceries with drifting amounts,
//! and a one-off furniture purchase. The same window always yields the
//! same transactions, so tests can assert on exact findings.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::error::{Error, Result};
use crate::models::{Account, AccountType, Transaction};

use super::BankProvider;

/// Sandbox bank-data provider
#[derive(Clone, Default)]
pub struct SandboxProvider {
    /// When false, every call fails with a provider error
    pub healthy: bool,
}

impl SandboxProvider {
    /// Create a healthy sandbox provider
    pub fn new() -> Self {
        Self { healthy: true }
    }

    /// Create a sandbox provider whose calls all fail
    pub fn failing() -> Self {
        Self { healthy: false }
    }

    fn ensure_healthy(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(Error::Provider("sandbox provider unavailable".to_string()))
        }
    }
}

/// Emit a charge every `interval` days anchored at `end - offset`, walking
/// backward until the window start.
fn recur(
    out: &mut Vec<Transaction>,
    start: NaiveDate,
    end: NaiveDate,
    offset: i64,
    interval: i64,
    name: &str,
    category: &str,
    amount: impl Fn(usize) -> f64,
) {
    let mut date = end - Duration::days(offset);
    let mut n = 0;
    while date >= start {
        out.push(Transaction {
            id: format!("sandbox-{}-{}", name.to_lowercase().replace(' ', "-"), n),
            date,
            name: name.to_string(),
            category: Some(category.to_string()),
            amount: (amount(n) * 100.0).round() / 100.0,
        });
        date -= Duration::days(interval);
        n += 1;
    }
}

#[async_trait]
impl BankProvider for SandboxProvider {
    async fn create_link_token(&self, user_id: &str) -> Result<String> {
        self.ensure_healthy()?;
        Ok(format!("link-sandbox-{}", user_id))
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<String> {
        self.ensure_healthy()?;
        if public_token.is_empty() {
            return Err(Error::Provider("empty public token".to_string()));
        }
        Ok(format!("access-sandbox-{}", public_token))
    }

    async fn fetch_feed(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<Account>, Vec<Transaction>)> {
        self.ensure_healthy()?;
        if access_token.is_empty() {
            return Err(Error::Provider("missing access token".to_string()));
        }

        let accounts = vec![
            Account {
                id: "sandbox-checking".to_string(),
                account_type: AccountType::Depository,
                name: "Sandbox Checking".to_string(),
                balance: 2500.0,
            },
            Account {
                id: "sandbox-card".to_string(),
                account_type: AccountType::Credit,
                name: "Sandbox Card".to_string(),
                balance: 430.0,
            },
        ];

        let mut transactions = Vec::new();

        // Subscription-style charge: same merchant, same amount, ~monthly
        recur(
            &mut transactions,
            start,
            end,
            5,
            30,
            "Streamly",
            "Entertainment",
            |_| 15.99,
        );
        // Rent: monthly, fixed
        recur(
            &mut transactions,
            start,
            end,
            10,
            30,
            "Horizon Apartments",
            "Rent",
            |_| 1450.0,
        );
        // Payroll: monthly inflow
        recur(
            &mut transactions,
            start,
            end,
            15,
            30,
            "Acme Payroll",
            "Transfer",
            |_| -2600.0,
        );
        // Groceries: weekly, drifting amounts so no two charges share a
        // dollar bucket
        recur(
            &mut transactions,
            start,
            end,
            2,
            7,
            "Fresh Mart",
            "Groceries",
            |n| 42.0 + n as f64 * 3.17,
        );

        // One-off large purchase
        let furniture = end - Duration::days(20);
        if furniture >= start {
            transactions.push(Transaction {
                id: "sandbox-furniture-0".to_string(),
                date: furniture,
                name: "Oak & Iron Furniture".to_string(),
                category: Some("Shopping".to_string()),
                amount: 500.0,
            });
        }

        Ok((accounts, transactions))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn host(&self) -> &str {
        "sandbox://local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sandbox_feed_is_deterministic() {
        let provider = SandboxProvider::new();
        let start = "2026-04-01".parse().unwrap();
        let end = "2026-06-01".parse().unwrap();

        let (accounts, first) = provider.fetch_feed("access", start, end).await.unwrap();
        let (_, second) = provider.fetch_feed("access", start, end).await.unwrap();

        assert_eq!(accounts.len(), 2);
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| a.id == b.id));
    }

    #[tokio::test]
    async fn test_sandbox_feed_contains_recurring_charge() {
        let provider = SandboxProvider::new();
        let start = "2026-04-01".parse().unwrap();
        let end = "2026-06-01".parse().unwrap();

        let (_, transactions) = provider.fetch_feed("access", start, end).await.unwrap();
        let streamly: Vec<_> = transactions.iter().filter(|t| t.name == "Streamly").collect();
        assert!(streamly.len() >= 2);
        assert!(streamly.iter().all(|t| (t.amount - 15.99).abs() < 0.01));
    }

    #[tokio::test]
    async fn test_failing_sandbox_errors() {
        let provider = SandboxProvider::failing();
        let err = provider.create_link_token("user").await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(!provider.health_check().await);
    }
}
