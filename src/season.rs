use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::moscow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub const fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }
}

/// Inclusive calendar range, checked against the Moscow-local date of each
/// input in that input's own year. A start later than the end wraps over New Year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalWindow {
    pub start: MonthDay,
    pub end: MonthDay,
}

impl SeasonalWindow {
    pub const HALLOWEEN: SeasonalWindow = SeasonalWindow {
        start: MonthDay::new(10, 31),
        end: MonthDay::new(11, 3),
    };

    pub fn contains(&self, instant: Option<&DateTime<Utc>>) -> bool {
        let Some(msk) = moscow::to_moscow(instant) else {
            return false;
        };
        let today = MonthDay::new(msk.month(), msk.day());
        if self.start <= self.end {
            self.start <= today && today <= self.end
        } else {
            today >= self.start || today <= self.end
        }
    }
}

impl Default for SeasonalWindow {
    fn default() -> Self {
        Self::HALLOWEEN
    }
}
