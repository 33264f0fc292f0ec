use serde::Deserialize;
use serde_json::Value;

use super::base::{self, EventStart};
use super::TicketsError;
use crate::models::{Event, TicketType};
use crate::moscow::MoscowTime;

pub const VENUE_NAME: &str = "VNVNC";
const PURCHASE_URL_BASE: &str = "https://ticketscloud.com/v2/event";

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    #[serde(default)]
    lifetime: String,
    status: Option<String>,
    #[serde(default)]
    title: ApiTitle,
    age_rating: Option<u32>,
    #[serde(default)]
    media: ApiMedia,
    view_limits: Option<ApiViewLimits>,
    #[serde(default)]
    ticket_types: Vec<ApiTicketType>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiTitle {
    #[serde(default)]
    text: String,
    desc: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiMedia {
    cover_original: Option<ApiImage>,
    cover: Option<ApiImage>,
    cover_small: Option<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiViewLimits {
    #[serde(default)]
    widget: bool,
}

#[derive(Debug, Deserialize)]
struct ApiTicketType {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    price_min: Value,
    #[serde(default)]
    price_max: Value,
}

fn image_url(image: &Option<ApiImage>) -> Option<&str> {
    image.as_ref().map(|img| img.url.as_str())
}

fn format_api_event(api: ApiEvent) -> Event {
    let start: Option<EventStart> = base::parse_lifetime(&api.lifetime);
    let msk = start.map(|s| MoscowTime::from_instant(&s.instant));
    let has_specific_time = start.is_some_and(|s| s.has_specific_time);

    let image = base::first_url([
        image_url(&api.media.cover),
        image_url(&api.media.cover_small),
        image_url(&api.media.cover_original),
    ])
    .unwrap_or_else(|| base::DEFAULT_IMAGE.to_string());

    let ticket_types: Vec<TicketType> = api
        .ticket_types
        .iter()
        .map(|t| TicketType {
            id: t.id.clone(),
            name: t.name.clone(),
            price: base::price_value(&t.price_min).or_else(|| base::price_value(&t.price_max)),
            available: 0,
            total: 0,
        })
        .collect();
    let has_price = ticket_types.iter().any(|t| t.price.is_some());

    Event {
        purchase_url: Some(format!("{PURCHASE_URL_BASE}/{}", api.id)),
        id: api.id,
        title: api.title.text.trim().to_string(),
        description: base::sanitize_description(api.title.desc.as_deref()),
        date: msk
            .as_ref()
            .map(base::ru_long_date)
            .unwrap_or_else(|| base::NO_DATE_LABEL.to_string()),
        time: msk
            .as_ref()
            .filter(|_| has_specific_time)
            .map(base::display_time),
        image,
        venue: Some(VENUE_NAME.to_string()),
        status: api.status,
        age_rating: api.age_rating,
        poster_original: image_url(&api.media.cover_original).map(str::to_string),
        poster_small: image_url(&api.media.cover_small).map(str::to_string),
        widget_available: api.view_limits.is_some_and(|v| v.widget),
        raw_date: start.map(|s| s.instant),
        has_specific_time,
        has_price,
        event_timestamp: start.map(|s| s.instant.timestamp_millis()),
        ticket_types,
    }
}

/// The list endpoint answers either with an array or with an object keyed
/// "0", "1", ...; entries that do not look like events are skipped.
pub fn parse_events_payload(body: &str) -> Result<Vec<Event>, TicketsError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|err| TicketsError::Parse(err.to_string()))?;
    let entries: Vec<Value> = match payload {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        _ => return Err(TicketsError::Parse("unexpected events payload".to_string())),
    };

    let mut events: Vec<Event> = entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| match serde_json::from_value::<ApiEvent>(entry) {
            Ok(api) => Some(format_api_event(api)),
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed ticketing event");
                None
            }
        })
        .collect();

    events.sort_by_key(|event| (event.event_timestamp.is_none(), event.event_timestamp));
    Ok(events)
}

pub fn parse_event_payload(body: &str) -> Result<Event, TicketsError> {
    let api: ApiEvent =
        serde_json::from_str(body).map_err(|err| TicketsError::Parse(err.to_string()))?;
    Ok(format_api_event(api))
}
