use chrono::{DateTime, Utc};

use crate::models::Event;

pub fn event_at(id: &str, raw_date: Option<DateTime<Utc>>) -> Event {
    Event {
        id: id.to_string(),
        title: format!("Event {id}"),
        description: String::new(),
        date: String::new(),
        time: None,
        image: "/default-event.jpg".to_string(),
        venue: Some("VNVNC".to_string()),
        status: None,
        age_rating: None,
        poster_original: None,
        poster_small: None,
        widget_available: false,
        purchase_url: None,
        raw_date,
        has_specific_time: raw_date.is_some(),
        has_price: false,
        event_timestamp: raw_date.map(|dt| dt.timestamp_millis()),
        ticket_types: Vec::new(),
    }
}
