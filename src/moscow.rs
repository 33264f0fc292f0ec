use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
    Weekday,
};
use chrono_tz::Tz;

pub const MOSCOW: Tz = chrono_tz::Europe::Moscow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoscowTime {
    local: DateTime<Tz>,
}

impl MoscowTime {
    pub fn from_instant(instant: &DateTime<Utc>) -> Self {
        Self {
            local: instant.with_timezone(&MOSCOW),
        }
    }

    pub fn day(&self) -> u32 {
        self.local.day()
    }

    pub fn month(&self) -> u32 {
        self.local.month()
    }

    pub fn year(&self) -> i32 {
        self.local.year()
    }

    pub fn hour(&self) -> u32 {
        self.local.hour()
    }

    pub fn minute(&self) -> u32 {
        self.local.minute()
    }

    pub fn weekday(&self) -> Weekday {
        self.local.weekday()
    }

    pub fn date(&self) -> NaiveDate {
        self.local.date_naive()
    }

    pub fn time_digits(&self) -> String {
        format!("{:02}{:02}", self.hour(), self.minute())
    }

    pub fn is_midnight(&self) -> bool {
        self.hour() == 0 && self.minute() == 0
    }
}

pub fn to_moscow(instant: Option<&DateTime<Utc>>) -> Option<MoscowTime> {
    instant.map(MoscowTime::from_instant)
}

pub fn is_moscow_sunday(instant: Option<&DateTime<Utc>>) -> bool {
    to_moscow(instant).is_some_and(|msk| msk.weekday() == Weekday::Sun)
}

pub fn date_key(instant: Option<&DateTime<Utc>>) -> Option<String> {
    to_moscow(instant).map(|msk| msk.date().format("%Y-%m-%d").to_string())
}

/// Resolves a Moscow wall-clock reading to an instant. Ambiguous readings take
/// the earlier instant; readings skipped by a transition yield `None`.
pub fn moscow_to_utc(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::new(date, time);
    match MOSCOW.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Accepts RFC 3339 instants and offset-less `YYYY-MM-DDTHH:MM[:SS]` readings,
/// the latter taken as Moscow wall-clock time. Anything else is `None`.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return moscow_to_utc(naive.date(), naive.time());
        }
    }
    None
}
