//! Bank-link lifecycle state machine
//!
//! Owns one user's `BankConnection` and drives it through the linking flow:
//!
//! ```text
//! Disconnected -> LinkTokenRequested -> LinkTokenReady -> ExchangePending -> Connected
//!                       |                                      |
//!                       +----------> Failed <------------------+
//! ```
//!
//! Every transition is guarded, so it is impossible to fire an exchange
//! without a valid link token or to double-link an already connected user.
//! `Failed` is equivalent to `Disconnected` for retry purposes, and a failed
//! exchange rolls back to `LinkTokenReady` with the token intact.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::provider::{BankProvider, ProviderClient};

/// Named state of a bank connection
///
/// The `LinkTokenRequested` and `ExchangePending` variants are the in-flight
/// states while a provider call is outstanding; they exist so that a
/// concurrent observer sees an explicit "busy" state instead of a stale one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    LinkTokenRequested,
    LinkTokenReady { link_token: String },
    ExchangePending { link_token: String },
    Connected { access_token: String },
    Failed { reason: String },
}

impl LinkStatus {
    /// Short label for logging and status endpoints
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Disconnected => "disconnected",
            LinkStatus::LinkTokenRequested => "link_token_requested",
            LinkStatus::LinkTokenReady { .. } => "link_token_ready",
            LinkStatus::ExchangePending { .. } => "exchange_pending",
            LinkStatus::Connected { .. } => "connected",
            LinkStatus::Failed { .. } => "failed",
        }
    }
}

/// One user's bank connection, mutated only by the state machine below
#[derive(Debug, Clone)]
pub struct BankConnection {
    pub user_id: String,
    pub status: LinkStatus,
}

/// Drives the linking state machine for a single user
///
/// Callers must serialize access per user (the server keeps one manager per
/// user behind an async mutex); the manager itself guards every transition
/// so misuse surfaces as `InvalidTransition` rather than a corrupt state.
#[derive(Debug)]
pub struct LinkSessionManager {
    connection: BankConnection,
}

impl LinkSessionManager {
    pub fn new(user_id: &str) -> Self {
        Self {
            connection: BankConnection {
                user_id: user_id.to_string(),
                status: LinkStatus::Disconnected,
            },
        }
    }

    pub fn user_id(&self) -> &str {
        &self.connection.user_id
    }

    pub fn status(&self) -> &LinkStatus {
        &self.connection.status
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection.status, LinkStatus::Connected { .. })
    }

    /// Durable feed credential; the sole gate for transaction access
    pub fn access_token(&self) -> Result<&str> {
        match &self.connection.status {
            LinkStatus::Connected { access_token } => Ok(access_token),
            _ => Err(Error::NotConnected),
        }
    }

    /// Request a link token from the provider
    ///
    /// Valid from `Disconnected` (and `Failed`, which counts as disconnected
    /// so the flow is retryable). Success lands in `LinkTokenReady`; a
    /// provider failure lands in `Failed` with the provider's message.
    pub async fn request_link_token(&mut self, provider: &ProviderClient) -> Result<String> {
        match &self.connection.status {
            LinkStatus::Disconnected | LinkStatus::Failed { .. } => {}
            other => {
                return Err(Error::InvalidTransition(format!(
                    "cannot request a link token while {}",
                    other.label()
                )));
            }
        }

        self.connection.status = LinkStatus::LinkTokenRequested;

        match provider.create_link_token(&self.connection.user_id).await {
            Ok(link_token) => {
                debug!(user = %self.connection.user_id, "Link token issued");
                self.connection.status = LinkStatus::LinkTokenReady {
                    link_token: link_token.clone(),
                };
                Ok(link_token)
            }
            Err(e) => {
                warn!(user = %self.connection.user_id, error = %e, "Link token request failed");
                self.connection.status = LinkStatus::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Exchange a public token for a durable access token
    ///
    /// Valid from `LinkTokenReady`; sits in `ExchangePending` while the
    /// provider call is in flight. On success the connection is `Connected`;
    /// on failure it rolls back to `LinkTokenReady` (the link token stays
    /// reusable). Idempotent while already `Connected`: a duplicate call is
    /// a no-op success, never a second link.
    pub async fn exchange_public_token(
        &mut self,
        provider: &ProviderClient,
        public_token: &str,
    ) -> Result<()> {
        let link_token = match &self.connection.status {
            LinkStatus::Connected { .. } => {
                debug!(user = %self.connection.user_id, "Duplicate exchange ignored - already connected");
                return Ok(());
            }
            LinkStatus::LinkTokenReady { link_token } => link_token.clone(),
            other => {
                return Err(Error::InvalidTransition(format!(
                    "cannot exchange a public token while {}",
                    other.label()
                )));
            }
        };

        self.connection.status = LinkStatus::ExchangePending {
            link_token: link_token.clone(),
        };

        match provider.exchange_public_token(public_token).await {
            Ok(access_token) => {
                info!(user = %self.connection.user_id, "Bank account connected");
                self.connection.status = LinkStatus::Connected { access_token };
                Ok(())
            }
            Err(e) => {
                // Roll back so the same link token can be retried; never
                // leave the connection in a half-linked state.
                warn!(user = %self.connection.user_id, error = %e, "Token exchange failed");
                self.connection.status = LinkStatus::LinkTokenReady { link_token };
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderClient, SandboxProvider};

    fn sandbox() -> ProviderClient {
        ProviderClient::Sandbox(SandboxProvider::new())
    }

    fn failing() -> ProviderClient {
        ProviderClient::Sandbox(SandboxProvider::failing())
    }

    #[tokio::test]
    async fn test_full_link_flow() {
        let provider = sandbox();
        let mut mgr = LinkSessionManager::new("user-1");
        assert_eq!(mgr.status().label(), "disconnected");
        assert!(matches!(mgr.access_token(), Err(Error::NotConnected)));

        let token = mgr.request_link_token(&provider).await.unwrap();
        assert!(!token.is_empty());
        assert_eq!(mgr.status().label(), "link_token_ready");

        mgr.exchange_public_token(&provider, "public-sandbox-token")
            .await
            .unwrap();
        assert!(mgr.is_connected());
        assert!(mgr.access_token().is_ok());
    }

    #[tokio::test]
    async fn test_exchange_requires_link_token() {
        let provider = sandbox();
        let mut mgr = LinkSessionManager::new("user-1");

        let err = mgr
            .exchange_public_token(&provider, "public-sandbox-token")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
        assert_eq!(mgr.status().label(), "disconnected");
    }

    #[tokio::test]
    async fn test_duplicate_exchange_is_noop() {
        let provider = sandbox();
        let mut mgr = LinkSessionManager::new("user-1");
        mgr.request_link_token(&provider).await.unwrap();
        mgr.exchange_public_token(&provider, "public-sandbox-token")
            .await
            .unwrap();

        let first_token = mgr.access_token().unwrap().to_string();

        // Second exchange while connected: no-op success, same credential
        mgr.exchange_public_token(&provider, "public-sandbox-token")
            .await
            .unwrap();
        assert_eq!(mgr.access_token().unwrap(), first_token);
    }

    #[tokio::test]
    async fn test_link_token_failure_is_retryable() {
        let mut mgr = LinkSessionManager::new("user-1");

        let err = mgr.request_link_token(&failing()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(mgr.status().label(), "failed");

        // Failed counts as disconnected: a retry against a healthy provider succeeds
        mgr.request_link_token(&sandbox()).await.unwrap();
        assert_eq!(mgr.status().label(), "link_token_ready");
    }

    #[tokio::test]
    async fn test_failed_exchange_rolls_back_to_ready() {
        let mut mgr = LinkSessionManager::new("user-1");
        let token = mgr.request_link_token(&sandbox()).await.unwrap();

        let err = mgr
            .exchange_public_token(&failing(), "public-sandbox-token")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        // Token remains reusable after the rollback
        match mgr.status() {
            LinkStatus::LinkTokenReady { link_token } => assert_eq!(link_token, &token),
            other => panic!("expected link_token_ready, got {}", other.label()),
        }

        // And the retry succeeds
        mgr.exchange_public_token(&sandbox(), "public-sandbox-token")
            .await
            .unwrap();
        assert!(mgr.is_connected());
    }

    #[tokio::test]
    async fn test_cannot_request_token_while_connected() {
        let provider = sandbox();
        let mut mgr = LinkSessionManager::new("user-1");
        mgr.request_link_token(&provider).await.unwrap();
        mgr.exchange_public_token(&provider, "public-sandbox-token")
            .await
            .unwrap();

        let err = mgr.request_link_token(&provider).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
        assert!(mgr.is_connected());
    }
}
