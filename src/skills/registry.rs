//! Skill registry client
//!
//! Remote marketplace exposing search-by-query and fetch-by-id.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("skill registry request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("skill registry returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid skill registry URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("skill registry unavailable: {0}")]
    Unavailable(String),
}

impl SkillError {
    /// Transient failures worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            SkillError::Request(e) => e.is_timeout() || e.is_connect(),
            SkillError::Status { status, .. } => *status >= 500 || *status == 429,
            SkillError::Url(_) => false,
            SkillError::Unavailable(_) => true,
        }
    }
}

#[async_trait]
pub trait SkillRegistryClient: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SkillSummary>, SkillError>;
    /// Raw skill content; `None` when no skill has this id
    async fn fetch(&self, id: &str) -> Result<Option<String>, SkillError>;
}

/// Search responses come either bare or wrapped in `{skills: [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Bare(Vec<SkillSummary>),
    Wrapped { skills: Vec<SkillSummary> },
}

/// JSON-over-HTTP registry client
pub struct HttpSkillRegistry {
    client: Client,
    base_url: url::Url,
}

impl HttpSkillRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SkillError> {
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("deskpilot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: url::Url::parse(&base)?,
        })
    }

    pub fn from_config(config: &crate::config::SkillsConfig) -> Result<Self, SkillError> {
        Self::new(
            &config.registry_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, SkillError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl SkillRegistryClient for HttpSkillRegistry {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SkillSummary>, SkillError> {
        let mut url = self.endpoint("skills/search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &limit.to_string());

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(SkillError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let mut skills = match response.json::<SearchResponse>().await? {
            SearchResponse::Bare(skills) => skills,
            SearchResponse::Wrapped { skills } => skills,
        };
        skills.truncate(limit);
        tracing::debug!("Skill search '{}' returned {} results", query, skills.len());
        Ok(skills)
    }

    async fn fetch(&self, id: &str) -> Result<Option<String>, SkillError> {
        let mut url = self.endpoint("skills/")?;
        url.path_segments_mut()
            .map_err(|_| SkillError::Unavailable("registry URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(id)
            .push("content");

        let response = self.client.get(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.text().await?)),
            status => Err(SkillError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join_keeps_base_path() {
        let registry =
            HttpSkillRegistry::new("https://skills.example.com/api", Duration::from_secs(5)).unwrap();
        assert_eq!(
            registry.endpoint("skills/search").unwrap().as_str(),
            "https://skills.example.com/api/skills/search"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpSkillRegistry::new("not a url", Duration::from_secs(5)),
            Err(SkillError::Url(_))
        ));
    }

    #[test]
    fn test_search_response_shapes() {
        let bare: SearchResponse =
            serde_json::from_str(r#"[{"id":"a","name":"A","description":"x"}]"#).unwrap();
        let wrapped: SearchResponse =
            serde_json::from_str(r#"{"skills":[{"id":"b","name":"B"}]}"#).unwrap();
        assert!(matches!(bare, SearchResponse::Bare(ref s) if s[0].id == "a"));
        assert!(matches!(wrapped, SearchResponse::Wrapped { ref skills } if skills[0].description.is_empty()));
    }

    #[test]
    fn test_retryable_status() {
        let err = SkillError::Status {
            status: 503,
            url: "u".to_string(),
        };
        assert!(err.is_retryable());
        let err = SkillError::Status {
            status: 400,
            url: "u".to_string(),
        };
        assert!(!err.is_retryable());
    }
}
