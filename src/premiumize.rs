use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::PremiumizeConfig;
use crate::error::SubmissionError;

/// Body of a transfer-creation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub status: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Destination for links the user chose to download.
#[async_trait]
pub trait TransferSink: Send + Sync {
    async fn submit(&self, link: &str) -> Result<SubmissionResult, SubmissionError>;
}

pub struct PremiumizeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PremiumizeClient {
    pub fn new(config: &PremiumizeConfig) -> Result<Self, SubmissionError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(SubmissionError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl TransferSink for PremiumizeClient {
    async fn submit(&self, link: &str) -> Result<SubmissionResult, SubmissionError> {
        let url = format!("{}/transfer/direct/create", self.base_url);

        let response = self
            .client
            .post(&url)
            .form(&[("src", link), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Transfer request for {} failed with {}", link, status);
            return Err(SubmissionError::Status(status));
        }

        let result: SubmissionResult = response.json().await?;
        if result.status == "error" {
            let message = result
                .message
                .unwrap_or_else(|| "unspecified error".to_string());
            warn!("Transfer of {} rejected: {}", link, message);
            return Err(SubmissionError::Rejected(message));
        }

        info!("Submitted {} (status: {})", link, result.status);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_rejected_up_front() {
        let config = PremiumizeConfig::default();
        assert!(matches!(
            PremiumizeClient::new(&config),
            Err(SubmissionError::MissingApiKey)
        ));
    }

    #[test]
    fn result_tolerates_sparse_bodies() {
        let result: SubmissionResult = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert_eq!(result.status, "success");
        assert!(result.id.is_none());
    }
}
