use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Event;
use crate::moscow;

pub const DEFAULT_FREE_TITLE_MARKER: &str = "все свои";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub sunday_free_default: bool,
    pub force_paid_event_ids: Vec<String>,
    pub force_free_event_ids: Vec<String>,
    pub free_title_marker: Option<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            sunday_free_default: false,
            force_paid_event_ids: Vec::new(),
            force_free_event_ids: Vec::new(),
            free_title_marker: Some(DEFAULT_FREE_TITLE_MARKER.to_string()),
        }
    }
}

impl EventsConfig {
    pub fn title_matches(&self, title: Option<&str>) -> bool {
        let (Some(marker), Some(title)) = (self.free_title_marker.as_deref(), title) else {
            return false;
        };
        let marker = marker.trim().to_lowercase();
        !marker.is_empty() && title.to_lowercase().contains(&marker)
    }

    /// First match wins: forced free, forced paid, title marker, Sunday default.
    /// Without a usable timestamp only the id overrides can apply.
    pub fn should_treat_as_free(
        &self,
        event_id: Option<&str>,
        raw_date: Option<&DateTime<Utc>>,
        title: Option<&str>,
    ) -> bool {
        if let Some(id) = event_id {
            if self.force_free_event_ids.iter().any(|free| free == id) {
                return true;
            }
            if self.force_paid_event_ids.iter().any(|paid| paid == id) {
                return false;
            }
        }
        if raw_date.is_none() {
            return false;
        }
        if self.title_matches(title) {
            return true;
        }
        self.sunday_free_default && moscow::is_moscow_sunday(raw_date)
    }

    pub fn is_free(&self, event: &Event) -> bool {
        self.should_treat_as_free(
            Some(event.id.as_str()),
            event.raw_date.as_ref(),
            Some(event.title.as_str()),
        )
    }
}
