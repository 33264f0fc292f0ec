pub mod base;
pub mod tickets_cloud;

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::models::Event;

pub const DEFAULT_API_BASE: &str = "https://ticketscloud.com";
const USER_AGENT: &str = "vnvnc-core/0.1 (+https://vnvnc.ru)";

#[derive(Debug, thiserror::Error)]
pub enum TicketsError {
    #[error("ticketing api key is not configured")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketsConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TicketsConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            timeout_secs: 20,
        }
    }
}

pub struct TicketsCloud {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl TicketsCloud {
    pub fn from_config(config: &TicketsConfig) -> Result<Self, TicketsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| TicketsError::Http(err.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .as_ref()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        })
    }

    pub async fn events(&self) -> Result<Vec<Event>, TicketsError> {
        let body = self.request("/v1/resources/events", &[]).await?;
        tickets_cloud::parse_events_payload(&body)
    }

    pub async fn search(&self, title: &str) -> Result<Vec<Event>, TicketsError> {
        let title = title.trim();
        let params: Vec<(&str, &str)> = if title.is_empty() {
            Vec::new()
        } else {
            vec![("title", title)]
        };
        let body = self.request("/v1/resources/events", &params).await?;
        tickets_cloud::parse_events_payload(&body)
    }

    pub async fn event_details(&self, event_id: &str) -> Result<Event, TicketsError> {
        let path = format!("/v1/resources/events/{}", event_id.trim());
        let body = self.request(&path, &[]).await?;
        tickets_cloud::parse_event_payload(&body)
    }

    async fn request(&self, path: &str, params: &[(&str, &str)]) -> Result<String, TicketsError> {
        let api_key = self.api_key.as_deref().ok_or(TicketsError::MissingApiKey)?;
        let mut url = Url::parse(&format!("{}{}", self.api_base, path))
            .map_err(|err| TicketsError::Http(err.to_string()))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        tracing::debug!(%url, "ticketing request");
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("key {api_key}"))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| TicketsError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TicketsError::Http(err.to_string()))?;

        if !status.is_success() {
            return Err(TicketsError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = TicketsCloud::from_config(&TicketsConfig::default()).expect("client");
        assert!(matches!(client.events().await, Err(TicketsError::MissingApiKey)));
    }

    #[test]
    fn normalizes_base_url_and_blank_key() {
        let client = TicketsCloud::from_config(&TicketsConfig {
            api_base: "https://stage.freetc.net/".to_string(),
            api_key: Some("   ".to_string()),
            timeout_secs: 5,
        })
        .expect("client");
        assert_eq!(client.api_base, "https://stage.freetc.net");
        assert!(client.api_key.is_none());
    }
}
