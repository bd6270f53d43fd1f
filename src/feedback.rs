//! Where event comments and ratings come from. Retrieval is the host
//! service's job; the engine only reads through this trait.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[async_trait::async_trait]
pub trait FeedbackSource: Send + Sync {
    /// Free-text comments for an event, in submission order.
    async fn comments(&self, event_id: &str) -> Result<Vec<String>>;
    /// Numeric ratings submitted for an event in `year`.
    async fn ratings(&self, event_id: &str, year: i32) -> Result<Vec<f64>>;
    /// Year the event took place, when known.
    async fn event_year(&self, event_id: &str) -> Result<Option<i32>>;
}

/// Seed data for one event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFeedback {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub comments: Vec<String>,
    /// Ratings keyed by year.
    #[serde(default)]
    pub ratings: HashMap<i32, Vec<f64>>,
}

#[derive(Debug, Default)]
pub struct InMemoryFeedback {
    events: RwLock<HashMap<String, EventFeedback>>,
}

impl InMemoryFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, event_id: impl Into<String>, feedback: EventFeedback) {
        let mut g = self.events.write().unwrap_or_else(|p| p.into_inner());
        g.insert(event_id.into(), feedback);
    }

    pub fn with_event(self, event_id: impl Into<String>, feedback: EventFeedback) -> Self {
        self.insert(event_id, feedback);
        self
    }

    fn read<T>(&self, event_id: &str, f: impl FnOnce(&EventFeedback) -> T) -> Result<T> {
        let g = self
            .events
            .read()
            .map_err(|_| anyhow!("feedback lock poisoned"))?;
        g.get(event_id)
            .map(f)
            .ok_or_else(|| anyhow!("unknown event `{event_id}`"))
    }
}

#[async_trait::async_trait]
impl FeedbackSource for InMemoryFeedback {
    async fn comments(&self, event_id: &str) -> Result<Vec<String>> {
        self.read(event_id, |e| e.comments.clone())
    }

    async fn ratings(&self, event_id: &str, year: i32) -> Result<Vec<f64>> {
        self.read(event_id, |e| e.ratings.get(&year).cloned().unwrap_or_default())
    }

    async fn event_year(&self, event_id: &str) -> Result<Option<i32>> {
        self.read(event_id, |e| e.year)
    }
}
