use std::sync::{Mutex, PoisonError};

use serde_json::Value;

pub trait Analytics: Send + Sync {
    fn track_event(&self, name: &str, payload: &Value);
}

pub struct NoopAnalytics;

impl Analytics for NoopAnalytics {
    fn track_event(&self, _name: &str, _payload: &Value) {}
}

pub struct LogAnalytics;

impl Analytics for LogAnalytics {
    fn track_event(&self, name: &str, payload: &Value) {
        tracing::info!(target: "vnvnc_core::analytics", event = name, %payload, "tracked");
    }
}

#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

impl Analytics for RecordingAnalytics {
    fn track_event(&self, name: &str, payload: &Value) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), payload.clone()));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn recorder_keeps_order() {
        let recorder = RecordingAnalytics::default();
        let sinks: [&dyn Analytics; 3] = [&NoopAnalytics, &LogAnalytics, &recorder];
        for sink in sinks {
            sink.track_event("ticket_click", &json!({ "event_id": "abc" }));
        }
        recorder.track_event("add_to_cart", &json!({}));
        assert_eq!(recorder.names(), vec!["ticket_click", "add_to_cart"]);
        assert_eq!(recorder.events()[0].1["event_id"], "abc");
    }
}
