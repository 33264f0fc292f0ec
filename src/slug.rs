use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Event;
use crate::moscow::{self, MoscowTime};

pub const BASE_YEAR: i32 = 2000;
pub const ID_FRAGMENT_LEN: usize = 6;
pub const LISTING_PATH: &str = "/events";

static TIME_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid time digits regex"));
static DAY_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}$").expect("valid day/month regex"));
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}$").expect("valid year regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlugOptions {
    pub same_date_count: usize,
    pub force_include_time: Option<bool>,
}

impl Default for SlugOptions {
    fn default() -> Self {
        Self {
            same_date_count: 1,
            force_include_time: None,
        }
    }
}

impl SlugOptions {
    pub fn with_count(same_date_count: usize) -> Self {
        Self {
            same_date_count,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSlug {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub time_digits: Option<String>,
    pub id_fragment: Option<String>,
}

impl ParsedSlug {
    fn matches_date(&self, msk: &MoscowTime) -> bool {
        msk.day() == self.day && msk.month() == self.month && msk.year() == self.year
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugResolution {
    Event(String),
    Redirect(&'static str),
}

pub fn build_slug(event: &Event, options: SlugOptions) -> String {
    let Some(msk) = moscow::to_moscow(event.raw_date.as_ref()) else {
        return String::new();
    };

    let base = format!(
        "{:02}-{:02}-{:02}",
        msk.day(),
        msk.month(),
        msk.year().rem_euclid(100)
    );

    let include_time = options
        .force_include_time
        .unwrap_or(options.same_date_count > 1);
    if !include_time {
        return base;
    }

    if let Some(digits) = explicit_time_digits(event, &msk) {
        return format!("{base}-{digits}");
    }

    let fragment: String = event.id.chars().take(ID_FRAGMENT_LEN).collect();
    if fragment.is_empty() {
        base
    } else {
        format!("{base}-{fragment}")
    }
}

fn explicit_time_digits(event: &Event, msk: &MoscowTime) -> Option<String> {
    if let Some(time) = event.time.as_deref() {
        let sanitized = time.trim().replacen(':', "", 1);
        if TIME_DIGITS_RE.is_match(&sanitized) && sanitized != "0000" {
            return Some(sanitized);
        }
    }
    if event.has_specific_time && !msk.is_midnight() {
        return Some(msk.time_digits());
    }
    None
}

pub fn parse_slug(slug: &str) -> Option<ParsedSlug> {
    let parts: Vec<&str> = slug.trim().split('-').collect();
    if parts.len() < 3 {
        return None;
    }

    let (day_str, month_str, year_str) = (parts[0], parts[1], parts[2]);
    if !DAY_MONTH_RE.is_match(day_str)
        || !DAY_MONTH_RE.is_match(month_str)
        || !YEAR_RE.is_match(year_str)
    {
        return None;
    }

    let day: u32 = day_str.parse().ok()?;
    let month: u32 = month_str.parse().ok()?;
    let year: i32 = year_str.parse().ok()?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }

    let mut parsed = ParsedSlug {
        day,
        month,
        year: year + BASE_YEAR,
        time_digits: None,
        id_fragment: None,
    };

    // Only the fourth segment is meaningful; anything after it is ignored.
    if let Some(suffix) = parts.get(3).filter(|s| !s.is_empty()) {
        if TIME_DIGITS_RE.is_match(suffix) {
            parsed.time_digits = Some(suffix.to_string());
        } else {
            parsed.id_fragment = Some(suffix.to_string());
        }
    }

    Some(parsed)
}

pub fn same_date_counts(events: &[Event]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for event in events {
        if let Some(key) = moscow::date_key(event.raw_date.as_ref()) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

pub fn slug_with_counts(event: &Event, counts: &HashMap<String, usize>) -> String {
    let same_date_count = moscow::date_key(event.raw_date.as_ref())
        .and_then(|key| counts.get(&key).copied())
        .unwrap_or(1);
    build_slug(event, SlugOptions::with_count(same_date_count))
}

/// Narrows events to the slug's Moscow date, then prefers a time match,
/// then an id-prefix match, then the first event that day.
pub fn find_match<'a>(events: &'a [Event], parsed: &ParsedSlug) -> Option<&'a Event> {
    let candidates: Vec<(&Event, MoscowTime)> = events
        .iter()
        .filter_map(|event| {
            moscow::to_moscow(event.raw_date.as_ref())
                .filter(|msk| parsed.matches_date(msk))
                .map(|msk| (event, msk))
        })
        .collect();

    if let Some(digits) = parsed.time_digits.as_deref() {
        let by_time = candidates.iter().find(|(event, msk)| {
            msk.time_digits() == digits
                || explicit_time_digits(event, msk).as_deref() == Some(digits)
        });
        if let Some((event, _)) = by_time {
            return Some(*event);
        }
    }

    if let Some(fragment) = parsed.id_fragment.as_deref() {
        if let Some((event, _)) = candidates
            .iter()
            .find(|(event, _)| event.id.starts_with(fragment))
        {
            return Some(*event);
        }
    }

    candidates.first().map(|(event, _)| *event)
}

pub fn resolve_slug(slug: &str, events: &[Event]) -> SlugResolution {
    let slug = slug.trim();
    if slug.is_empty() {
        return SlugResolution::Redirect(LISTING_PATH);
    }

    let counts = same_date_counts(events);
    if let Some(event) = events
        .iter()
        .find(|event| slug_with_counts(event, &counts) == slug)
    {
        return SlugResolution::Event(event.id.clone());
    }

    if let Some(parsed) = parse_slug(slug) {
        if let Some(event) = find_match(events, &parsed) {
            return SlugResolution::Event(event.id.clone());
        }
        // Stale date, but the id fragment may still name the event.
        if let Some(fragment) = parsed.id_fragment.as_deref() {
            if let Some(event) = events.iter().find(|event| event.id.starts_with(fragment)) {
                return SlugResolution::Event(event.id.clone());
            }
        }
    }

    let direct = events
        .iter()
        .find(|event| event.id == slug)
        .or_else(|| events.iter().find(|event| event.id.starts_with(slug)));
    match direct {
        Some(event) => SlugResolution::Event(event.id.clone()),
        None => SlugResolution::Redirect(LISTING_PATH),
    }
}
