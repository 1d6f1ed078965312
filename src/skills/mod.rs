//! Skill marketplace search
//!
//! Agent tools call the [`SkillRegistryClient`] directly and report failures.
//! The UI goes through [`SkillSearch`], which degrades to empty results.

pub mod debounce;
pub mod registry;

pub use debounce::Debouncer;
pub use registry::{HttpSkillRegistry, SkillError, SkillRegistryClient, SkillSummary};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_UI_LIMIT: usize = 20;

pub struct SkillSearch {
    client: Arc<dyn SkillRegistryClient>,
    debouncer: Debouncer,
}

impl SkillSearch {
    pub fn new(client: Arc<dyn SkillRegistryClient>, debounce: Duration) -> Self {
        Self {
            client,
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn client(&self) -> Arc<dyn SkillRegistryClient> {
        self.client.clone()
    }

    /// Marketplace panel search; errors become an empty list
    pub async fn search_for_ui(&self, query: &str) -> Vec<SkillSummary> {
        search_or_empty(self.client.as_ref(), query).await
    }

    /// Marketplace panel fetch; errors become `None`
    pub async fn fetch_for_ui(&self, id: &str) -> Option<String> {
        match self.client.fetch(id).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Skill fetch for '{}' failed: {}", id, e);
                None
            }
        }
    }

    /// Search after the debounce delay, sending results unless superseded
    pub fn search_debounced(&self, query: String, tx: mpsc::UnboundedSender<Vec<SkillSummary>>) {
        let client = self.client.clone();
        self.debouncer.schedule(async move {
            let results = search_or_empty(client.as_ref(), &query).await;
            let _ = tx.send(results);
        });
    }

    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }
}

async fn search_or_empty(client: &dyn SkillRegistryClient, query: &str) -> Vec<SkillSummary> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    match client.search(query, DEFAULT_UI_LIMIT).await {
        Ok(skills) => skills,
        Err(e) => {
            tracing::warn!("Skill search for '{}' failed: {}", query, e);
            Vec::new()
        }
    }
}
