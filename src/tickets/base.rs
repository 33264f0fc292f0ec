use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::moscow::{self, MoscowTime};

pub const DEFAULT_DESCRIPTION: &str = "Описание не указано";
pub const DEFAULT_IMAGE: &str = "/default-event.jpg";
pub const NO_DATE_LABEL: &str = "Дата не указана";

static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"DTSTART;VALUE=DATE-TIME:(\d{8}T\d{6})Z").expect("valid date-time regex")
});
static DATE_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"DTSTART;VALUE=DATE:(\d{8})").expect("valid date regex"));
static NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n").expect("valid newline regex"));
static DOUBLE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<br>\s*<br>").expect("valid break regex"));
static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<script").expect("valid script regex"));

const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStart {
    pub instant: DateTime<Utc>,
    pub has_specific_time: bool,
}

/// Reads `DTSTART` out of an iCalendar `lifetime` block. A UTC date-time
/// carries a specific time; a bare date means Moscow midnight with no time.
pub fn parse_lifetime(lifetime: &str) -> Option<EventStart> {
    if let Some(caps) = DATE_TIME_RE.captures(lifetime) {
        let naive = NaiveDateTime::parse_from_str(caps.get(1)?.as_str(), "%Y%m%dT%H%M%S").ok()?;
        return Some(EventStart {
            instant: Utc.from_utc_datetime(&naive),
            has_specific_time: true,
        });
    }
    if let Some(caps) = DATE_ONLY_RE.captures(lifetime) {
        let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y%m%d").ok()?;
        return Some(EventStart {
            instant: moscow::moscow_to_utc(date, NaiveTime::MIN)?,
            has_specific_time: false,
        });
    }
    None
}

pub fn sanitize_description(raw: Option<&str>) -> String {
    let raw = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => DEFAULT_DESCRIPTION,
    };
    let with_breaks = NEWLINE_RE.replace_all(raw, "<br>");
    let collapsed = DOUBLE_BREAK_RE.replace_all(&with_breaks, "<br>");
    SCRIPT_RE.replace_all(&collapsed, "&lt;script").into_owned()
}

pub fn ru_long_date(msk: &MoscowTime) -> String {
    let month = MONTHS_GENITIVE
        .get(msk.month().saturating_sub(1) as usize)
        .copied()
        .unwrap_or_default();
    format!("{} {} {} г.", msk.day(), month, msk.year())
}

pub fn display_time(msk: &MoscowTime) -> String {
    format!("{:02}:{:02}", msk.hour(), msk.minute())
}

pub fn price_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

pub fn first_url<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(str::to_string)
}
