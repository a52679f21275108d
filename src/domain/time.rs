//! Wall-clock helpers for comparing `"HH:mm"` strings against "now".
//!
//! Every timestamp here is a naive local date-time in the viewer's zone. Times
//! are anchored to the current day; nothing rolls over midnight.

use crate::domain::models::{Classification, split_time_range};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    System,
    Named(Tz),
}

impl Zone {
    pub fn parse(name: &str) -> Result<Self, String> {
        name.trim()
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|error| format!("invalid timezone '{name}': {error}"))
    }
}

#[derive(Clone)]
pub struct Clock {
    zone: Zone,
    now_provider: NowProvider,
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock").field("zone", &self.zone).finish_non_exhaustive()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(Zone::System)
    }
}

impl Clock {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    /// Current local wall-clock time.
    pub fn now(&self) -> NaiveDateTime {
        self.to_local(self.now_utc())
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self.zone {
            Zone::System => instant.with_timezone(&Local).naive_local(),
            Zone::Named(tz) => instant.with_timezone(&tz).naive_local(),
        }
    }

    /// Attaches the zone offset to a local wall-clock time. `None` inside a DST gap.
    pub fn localize(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self.zone {
            Zone::System => Local
                .from_local_datetime(&local)
                .earliest()
                .map(|value| value.with_timezone(&value.offset().fix())),
            Zone::Named(tz) => tz
                .from_local_datetime(&local)
                .earliest()
                .map(|value| value.with_timezone(&value.offset().fix())),
        }
    }
}

pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// `"HH:mm"` on the clock's current day.
pub fn parse_time(value: &str, clock: &Clock) -> Option<NaiveDateTime> {
    parse_hhmm(value).map(|time| clock.today().and_time(time))
}

/// Buckets a `"HH:mm - HH:mm"` range against `now`.
///
/// An unparseable bound leaves both flags false, so the item reads as upcoming.
pub fn classify(time_range: &str, now: NaiveDateTime) -> Classification {
    let (start, end) = split_time_range(time_range);
    let anchor = now.date();
    let start = parse_hhmm(start).map(|time| anchor.and_time(time));
    let end = end.and_then(parse_hhmm).map(|time| anchor.and_time(time));

    match (start, end) {
        (Some(start), Some(end)) => Classification {
            is_past: now > end,
            is_current: start <= now && now <= end,
        },
        (None, Some(end)) => Classification {
            is_past: now > end,
            is_current: false,
        },
        _ => Classification::default(),
    }
}
