//! Finance backend client
//!
//! The backend is a set of HTTP functions; the piggy bank only needs the
//! child's most recent movement.

use std::time::Duration;

use serde_json::Value;

use crate::{Error, Result};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Queries the finance backend
#[derive(Debug, Clone)]
pub struct FinanceClient {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
}

impl FinanceClient {
    /// Create a client for `user_id` against the functions at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the URL or user id is empty, or the HTTP client
    /// cannot be built
    pub fn new(base_url: &str, user_id: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(Error::Config("finance backend URL is required".to_string()));
        }
        if user_id.trim().is_empty() {
            return Err(Error::Config("finance user id is required".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            user_id: user_id.trim().to_string(),
        })
    }

    /// Endpoint for the latest movement
    #[must_use]
    pub fn last_transaction_url(&self) -> String {
        format!("{}/last-transaction", self.base_url)
    }

    /// Fetch the most recent movement as raw JSON
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the backend answers with a
    /// non-success status, or the body is not JSON
    pub async fn last_transaction(&self) -> Result<Value> {
        let url = self.last_transaction_url();
        tracing::debug!(%url, "querying last transaction");

        let response = self
            .client
            .post(&url)
            .query(&[("solicitante_id", self.user_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!("last-transaction returned {status}: {body}")));
        }

        let movement: Value = response.json().await?;
        tracing::debug!(%movement, "last transaction received");
        Ok(movement)
    }
}
