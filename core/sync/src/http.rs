//! HTTP transport for the sync endpoint.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::action::SyncAction;
use crate::endpoint::SyncEndpoint;
use momenta_common::{Error, Result};

/// HTTP sync endpoint.
///
/// POSTs each action as JSON to `<base>/sync/<kind>`.
pub struct HttpEndpoint {
    http: Client,
    base: Url,
}

impl HttpEndpoint {
    /// Create an endpoint for the given base URL.
    ///
    /// # Errors
    /// - Base URL does not parse
    pub fn new(base: impl AsRef<str>) -> Result<Self> {
        let base = Url::parse(base.as_ref())
            .map_err(|e| Error::InvalidInput(format!("invalid endpoint url: {}", e)))?;

        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    fn url_for(&self, action: &SyncAction) -> Result<Url> {
        self.base
            .join(&format!("sync/{}", action.kind.as_str()))
            .map_err(|e| Error::InvalidInput(format!("invalid endpoint url: {}", e)))
    }
}

#[async_trait]
impl SyncEndpoint for HttpEndpoint {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, action: &SyncAction) -> Result<()> {
        let url = self.url_for(action)?;

        let response = self
            .http
            .post(url)
            .json(action)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "sync endpoint returned {} for {}",
                status,
                action.kind.as_str()
            )));
        }

        Ok(())
    }
}
