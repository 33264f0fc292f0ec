use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::models::Event;
use crate::moscow;
use crate::tickets::base::DEFAULT_IMAGE as DEFAULT_POSTER;

pub const SITE_ORIGIN: &str = "https://vnvnc.ru";
pub const DEFAULT_TITLE: &str = "VNVNC Concert Hall";
pub const DEFAULT_DESCRIPTION: &str =
    "Конюшенная 2В • Культовый клуб в центре Санкт-Петербурга • Здесь всегда атмосферно";
pub const DEFAULT_IMAGE: &str = "https://vnvnc.ru/og-image.jpg";

const JSON_LD_FALLBACK_DESCRIPTION: &str = "Мероприятие в VNVNC Concert Hall";
const SOCIAL_LINKS: [&str; 3] = [
    "https://www.instagram.com/vnvnc_spb",
    "https://t.me/vnvnc_spb",
    "https://vk.com/vnvnc_spb",
];

const BODY_LIMIT: usize = 180;
const DESCRIPTION_LIMIT: usize = 200;

static BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</p>").expect("valid break regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharePreview {
    pub title: String,
    pub description: String,
    pub image: String,
    pub url: String,
}

pub fn share_path(slug: &str) -> String {
    format!("/e/{slug}")
}

pub fn strip_html(value: &str) -> String {
    let spaced = BREAK_RE.replace_all(value, " ");
    let untagged = TAG_RE.replace_all(&spaced, " ");
    SPACE_RE.replace_all(&untagged, " ").trim().to_string()
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn truncate_chars(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}

fn describe(event: &Event) -> String {
    let body = strip_html(&event.description);
    let body = if body.is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        body
    };
    let body = truncate_chars(&body, BODY_LIMIT);

    let Some(msk) = moscow::to_moscow(event.raw_date.as_ref()) else {
        return body;
    };
    let mut when = format!("{:02}.{:02}.{}", msk.day(), msk.month(), msk.year());
    if event.has_specific_time && !msk.is_midnight() {
        when.push_str(&format!(" • {:02}:{:02}", msk.hour(), msk.minute()));
    }
    truncate_chars(&format!("{when} • {body}"), DESCRIPTION_LIMIT)
}

fn poster(event: &Event) -> String {
    [
        event.poster_original.as_deref(),
        Some(event.image.as_str()).filter(|url| *url != DEFAULT_POSTER),
        event.poster_small.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|url| !url.trim().is_empty())
    .unwrap_or(DEFAULT_IMAGE)
    .to_string()
}

pub fn preview_for(event: Option<&Event>, slug: &str) -> SharePreview {
    let url = format!("{SITE_ORIGIN}{}", share_path(slug));
    match event {
        Some(event) => SharePreview {
            title: if event.title.trim().is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                event.title.clone()
            },
            description: describe(event),
            image: poster(event),
            url,
        },
        None => SharePreview {
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            url,
        },
    }
}

fn venue() -> Value {
    json!({
        "@type": "MusicVenue",
        "name": DEFAULT_TITLE,
        "address": {
            "@type": "PostalAddress",
            "streetAddress": "Конюшенная площадь, 2В",
            "addressLocality": "Санкт-Петербург",
            "addressRegion": "Санкт-Петербург",
            "postalCode": "191186",
            "addressCountry": "RU",
        },
        "sameAs": SOCIAL_LINKS,
        "url": SITE_ORIGIN,
        "telephone": "+7 921 410-44-40",
    })
}

/// schema.org `Event` for an event page. `startDate` and `offers` are left out
/// when the event has no timestamp or no ticket tiers.
pub fn json_ld(event: &Event, canonical_url: &str) -> Value {
    let description = strip_html(&event.description);
    let image = [
        event.poster_original.as_deref(),
        event.poster_small.as_deref(),
        Some(event.image.as_str()),
    ]
    .into_iter()
    .flatten()
    .find(|url| !url.trim().is_empty())
    .unwrap_or(DEFAULT_IMAGE);

    let mut doc = Map::new();
    doc.insert("@context".into(), json!("https://schema.org"));
    doc.insert("@type".into(), json!("Event"));
    doc.insert("name".into(), json!(event.title));
    doc.insert(
        "description".into(),
        json!(if description.is_empty() {
            JSON_LD_FALLBACK_DESCRIPTION.to_string()
        } else {
            description
        }),
    );
    if let Some(start) = event.raw_date {
        doc.insert(
            "startDate".into(),
            json!(start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );
    }
    doc.insert(
        "eventAttendanceMode".into(),
        json!("https://schema.org/OfflineEventAttendanceMode"),
    );
    doc.insert("eventStatus".into(), json!("https://schema.org/EventScheduled"));
    doc.insert("url".into(), json!(canonical_url));
    doc.insert("image".into(), json!(image));
    doc.insert("location".into(), venue());
    doc.insert(
        "organizer".into(),
        json!({
            "@type": "Organization",
            "name": DEFAULT_TITLE,
            "url": SITE_ORIGIN,
            "sameAs": &SOCIAL_LINKS[..2],
        }),
    );

    let offers: Vec<Value> = event
        .ticket_types
        .iter()
        .map(|ticket| {
            let mut offer = Map::new();
            offer.insert("@type".into(), json!("Offer"));
            offer.insert("name".into(), json!(ticket.name));
            offer.insert(
                "url".into(),
                json!(event.purchase_url.as_deref().unwrap_or(canonical_url)),
            );
            if let Some(price) = ticket.price {
                offer.insert("price".into(), json!(price));
            }
            offer.insert("priceCurrency".into(), json!("RUB"));
            offer.insert("availability".into(), json!("https://schema.org/InStock"));
            Value::Object(offer)
        })
        .collect();
    if !offers.is_empty() {
        doc.insert("offers".into(), Value::Array(offers));
    }
    Value::Object(doc)
}

impl SharePreview {
    pub fn meta_tags(&self) -> String {
        let title = escape_html(&self.title);
        let description = escape_html(&self.description);
        let image = escape_html(&self.image);
        let url = escape_html(&self.url);
        [
            format!("<title>{title} | VNVNC</title>"),
            format!(r#"<meta name="description" content="{description}" />"#),
            r#"<meta property="og:type" content="event" />"#.to_string(),
            format!(r#"<meta property="og:url" content="{url}" />"#),
            format!(r#"<meta property="og:title" content="{title}" />"#),
            format!(r#"<meta property="og:description" content="{description}" />"#),
            format!(r#"<meta property="og:image" content="{image}" />"#),
            r#"<meta property="og:image:width" content="1200" />"#.to_string(),
            r#"<meta property="og:image:height" content="630" />"#.to_string(),
            format!(r#"<meta property="og:site_name" content="{DEFAULT_TITLE}" />"#),
            format!(r#"<link rel="canonical" href="{url}" />"#),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::TicketType;
    use crate::test_support::event_at;

    #[test]
    fn strips_and_escapes_html() {
        assert_eq!(strip_html("a<br/>b</p><b>c</b>\n\n d"), "a b c d");
        assert_eq!(escape_html(r#"<"Tom" & 'Jerry'>"#), "&lt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&gt;");
    }

    #[test]
    fn prefixes_date_and_time() {
        let mut event = event_at(
            "abc",
            Some(Utc.with_ymd_and_hms(2024, 12, 15, 20, 0, 0).unwrap()),
        );
        event.title = "TECHNO NIGHT".to_string();
        event.description = "Легендарная<br>техно вечеринка".to_string();
        event.poster_small = Some("https://cdn.example/small.jpg".to_string());

        let preview = preview_for(Some(&event), "15-12-24");
        assert_eq!(preview.title, "TECHNO NIGHT");
        assert_eq!(preview.description, "15.12.2024 • 23:00 • Легендарная техно вечеринка");
        assert_eq!(preview.image, "https://cdn.example/small.jpg");
        assert_eq!(preview.url, "https://vnvnc.ru/e/15-12-24");

        event.has_specific_time = false;
        assert!(preview_for(Some(&event), "15-12-24")
            .description
            .starts_with("15.12.2024 • Легендарная"));
    }

    #[test]
    fn caps_description_length() {
        let mut event = event_at("abc", Some(Utc.with_ymd_and_hms(2024, 12, 15, 20, 0, 0).unwrap()));
        event.description = "я".repeat(500);
        let preview = preview_for(Some(&event), "15-12-24");
        assert_eq!(preview.description.chars().count(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn json_ld_lists_offers_per_tier() {
        let mut event = event_at("abc", Some(Utc.with_ymd_and_hms(2024, 12, 15, 20, 0, 0).unwrap()));
        event.title = "TECHNO NIGHT".to_string();
        event.description = "<b>Легендарная</b> вечеринка".to_string();
        event.purchase_url = Some("https://ticketscloud.com/v2/event/abc".to_string());
        event.ticket_types = vec![
            TicketType {
                id: "t1".to_string(),
                name: "Танцпол".to_string(),
                price: Some(1500),
                available: 10,
                total: 100,
            },
            TicketType {
                id: "t2".to_string(),
                name: "Гостевой".to_string(),
                price: None,
                available: 0,
                total: 5,
            },
        ];

        let doc = json_ld(&event, "https://vnvnc.ru/events/15-12-24");
        assert_eq!(doc["@type"], "Event");
        assert_eq!(doc["description"], "Легендарная вечеринка");
        assert_eq!(doc["startDate"], "2024-12-15T20:00:00.000Z");
        assert_eq!(doc["image"], "/default-event.jpg");
        assert_eq!(doc["location"]["address"]["postalCode"], "191186");
        assert_eq!(doc["organizer"]["sameAs"].as_array().map(Vec::len), Some(2));

        let offers = doc["offers"].as_array().expect("offers");
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0]["price"], 1500);
        assert_eq!(offers[0]["url"], "https://ticketscloud.com/v2/event/abc");
        assert!(offers[1].get("price").is_none());
    }

    #[test]
    fn json_ld_omits_missing_fields() {
        let mut event = event_at("abc", None);
        event.image = String::new();
        let doc = json_ld(&event, "https://vnvnc.ru/events/abc");
        assert!(doc.get("startDate").is_none());
        assert!(doc.get("offers").is_none());
        assert_eq!(doc["description"], JSON_LD_FALLBACK_DESCRIPTION);
        assert_eq!(doc["image"], DEFAULT_IMAGE);
    }

    #[test]
    fn unresolved_slug_uses_defaults() {
        let preview = preview_for(None, "01-01-24");
        assert_eq!(preview.title, DEFAULT_TITLE);
        assert_eq!(preview.image, DEFAULT_IMAGE);
        assert!(preview.meta_tags().contains(r#"content="https://vnvnc.ru/e/01-01-24""#));
    }
}
