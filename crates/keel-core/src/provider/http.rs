//! HTTP bank-data provider
//!
//! Speaks the aggregator's JSON-over-HTTP API (Plaid-style endpoints):
//! link token creation, public-token exchange, balance and transaction
//! fetches. Credentials ride in each request body; auth headers are the
//! transport layer's concern.

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Account, AccountType, Transaction};

use super::BankProvider;
use async_trait::async_trait;

/// HTTP provider backend
#[derive(Clone)]
pub struct HttpProvider {
    http_client: Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl HttpProvider {
    pub fn new(base_url: &str, client_id: &str, secret: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("BANK_PROVIDER_HOST").ok()?;
        let client_id = std::env::var("BANK_PROVIDER_CLIENT_ID").ok()?;
        let secret = std::env::var("BANK_PROVIDER_SECRET").ok()?;
        Some(Self::new(&host, &client_id, &secret))
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "{} returned {}: {}",
                path, status, detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("invalid response from {}: {}", path, e)))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct LinkTokenCreateRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    client_name: &'a str,
    language: &'a str,
    country_codes: [&'a str; 1],
    products: [&'a str; 1],
    user: LinkTokenUser<'a>,
}

#[derive(Debug, Serialize)]
struct LinkTokenUser<'a> {
    client_user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Debug, Serialize)]
struct PublicTokenExchangeRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    public_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublicTokenExchangeResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct BalanceGetRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct BalanceGetResponse {
    accounts: Vec<WireAccount>,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    account_id: String,
    name: String,
    #[serde(rename = "type")]
    account_type: AccountType,
    balances: WireBalances,
}

#[derive(Debug, Deserialize)]
struct WireBalances {
    current: Option<f64>,
}

#[derive(Debug, Serialize)]
struct TransactionsGetRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    options: TransactionsGetOptions,
}

#[derive(Debug, Serialize)]
struct TransactionsGetOptions {
    count: u32,
}

#[derive(Debug, Deserialize)]
struct TransactionsGetResponse {
    transactions: Vec<WireTransaction>,
}

#[derive(Debug, Deserialize)]
struct WireTransaction {
    transaction_id: String,
    date: NaiveDate,
    name: String,
    amount: f64,
    #[serde(default)]
    category: Option<Vec<String>>,
    #[serde(default)]
    personal_finance_category: Option<WirePfc>,
}

#[derive(Debug, Deserialize)]
struct WirePfc {
    primary: String,
}

impl WireTransaction {
    /// Best available category: the provider's personal-finance hierarchy
    /// wins (primary, underscores to spaces, title case), falling back to
    /// the legacy category list's first entry.
    fn category(&self) -> Option<String> {
        if let Some(pfc) = &self.personal_finance_category {
            return Some(title_case(&pfc.primary.replace('_', " ")));
        }
        self.category
            .as_ref()
            .and_then(|c| c.first())
            .cloned()
            .filter(|c| !c.is_empty())
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl BankProvider for HttpProvider {
    async fn create_link_token(&self, user_id: &str) -> Result<String> {
        let request = LinkTokenCreateRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            client_name: "Keel",
            language: "en",
            country_codes: ["US"],
            products: ["transactions"],
            user: LinkTokenUser {
                client_user_id: user_id,
            },
        };

        let response: LinkTokenCreateResponse =
            self.post("/link/token/create", &request).await?;
        Ok(response.link_token)
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<String> {
        let request = PublicTokenExchangeRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            public_token,
        };

        let response: PublicTokenExchangeResponse =
            self.post("/item/public_token/exchange", &request).await?;
        Ok(response.access_token)
    }

    async fn fetch_feed(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<Account>, Vec<Transaction>)> {
        let balance_request = BalanceGetRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            access_token,
        };
        let balances: BalanceGetResponse =
            self.post("/accounts/balance/get", &balance_request).await?;

        let tx_request = TransactionsGetRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            access_token,
            start_date: start,
            end_date: end,
            options: TransactionsGetOptions { count: 500 },
        };
        let feed: TransactionsGetResponse = self.post("/transactions/get", &tx_request).await?;

        let accounts = balances
            .accounts
            .into_iter()
            .map(|a| Account {
                id: a.account_id,
                account_type: a.account_type,
                name: a.name,
                balance: a.balances.current.unwrap_or(0.0),
            })
            .collect();

        let transactions: Vec<Transaction> = feed
            .transactions
            .into_iter()
            .map(|t| Transaction {
                category: t.category(),
                id: t.transaction_id,
                date: t.date,
                name: t.name,
                amount: t.amount,
            })
            .collect();

        debug!(
            count = transactions.len(),
            %start,
            %end,
            "Fetched transaction feed"
        );

        Ok((accounts, transactions))
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(&self.base_url)
            .send()
            .await
            .map(|r| !r.status().is_server_error())
            .unwrap_or(false)
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
