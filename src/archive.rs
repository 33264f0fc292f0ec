use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::models::Event;
use crate::moscow::{self, MoscowTime};

pub const CUTOFF_HOUR: u32 = 6;

fn cutoff_time() -> NaiveTime {
    NaiveTime::from_hms_opt(CUTOFF_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Moscow calendar day whose 06:00 boundary `now` most recently passed.
/// Before 06:00 this is yesterday, so last night's events stay current.
pub fn rolling_cutoff_date(now: &DateTime<Utc>) -> NaiveDate {
    let msk = MoscowTime::from_instant(now);
    let today = msk.date();
    if msk.hour() < CUTOFF_HOUR {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    }
}

/// Instant at which an event starting at `raw_date` becomes archived:
/// 06:00 Moscow on the day after its Moscow-local date.
pub fn archive_cutoff(raw_date: Option<&DateTime<Utc>>) -> Option<DateTime<Utc>> {
    let msk = moscow::to_moscow(raw_date)?;
    let next_day = msk.date().succ_opt()?;
    moscow::moscow_to_utc(next_day, cutoff_time())
}

pub fn is_archived(raw_date: Option<&DateTime<Utc>>, now: &DateTime<Utc>) -> bool {
    match moscow::to_moscow(raw_date) {
        Some(msk) => msk.date() < rolling_cutoff_date(now),
        None => false,
    }
}

#[derive(Debug, Default)]
pub struct Listing<'a> {
    pub current: Vec<&'a Event>,
    pub archive: Vec<&'a Event>,
}

pub fn partition<'a>(events: &'a [Event], now: &DateTime<Utc>) -> Listing<'a> {
    let mut listing = Listing::default();
    for event in events {
        let Some(raw) = event.raw_date.as_ref() else {
            continue;
        };
        if is_archived(Some(raw), now) {
            listing.archive.push(event);
        } else {
            listing.current.push(event);
        }
    }
    listing.current.sort_by_key(|e| e.raw_date);
    listing.archive.sort_by(|a, b| b.raw_date.cmp(&a.raw_date));
    listing
}

pub fn parse_month_filter(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.len() != 2 {
        return None;
    }
    value.parse().ok().filter(|m| (1..=12).contains(m))
}

pub fn in_month(event: &Event, month: Option<u32>) -> bool {
    match month {
        None => true,
        Some(m) => moscow::to_moscow(event.raw_date.as_ref()).is_some_and(|msk| msk.month() == m),
    }
}

pub fn filter_by_month<'a>(archive: &[&'a Event], month: Option<u32>) -> Vec<&'a Event> {
    archive
        .iter()
        .copied()
        .filter(|event| in_month(event, month))
        .collect()
}
