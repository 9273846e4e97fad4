use chrono::{DateTime, NaiveDate, TimeZone};
use thiserror::Error;

use crate::config::COUNTDOWN_HOUR;

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CountdownError {
    #[error("countdown target `{0}` is not in YYYY-M-D form")]
    Malformed(String),
    #[error("countdown target `{0}` is not a calendar date")]
    NoSuchDate(String),
    #[error("countdown target `{0}` does not exist at 17:00 local time")]
    NoSuchLocalTime(String),
}

/// Value of the container's `data-target` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetDate(NaiveDate);

impl TargetDate {
    pub fn parse(raw: &str) -> Result<Self, CountdownError> {
        let malformed = || CountdownError::Malformed(raw.to_string());

        let parts: Vec<&str> = raw.trim().split('-').map(str::trim).collect();
        let [year, month, day] = parts.as_slice() else {
            return Err(malformed());
        };

        let year: i32 = year.parse().map_err(|_| malformed())?;
        let month: u32 = month.parse().map_err(|_| malformed())?;
        let day: u32 = day.parse().map_err(|_| malformed())?;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| CountdownError::NoSuchDate(raw.to_string()))
    }

    /// The event start, 17:00:00 wall-clock time in `tz`. A time that falls
    /// in a DST gap is an error; an ambiguous one resolves to the earlier instant.
    pub fn instant_in<Tz: TimeZone>(&self, tz: &Tz) -> Result<DateTime<Tz>, CountdownError> {
        self.0
            .and_hms_opt(COUNTDOWN_HOUR, 0, 0)
            .and_then(|naive| tz.from_local_datetime(&naive).earliest())
            .ok_or_else(|| CountdownError::NoSuchLocalTime(self.0.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::Days, Unit::Hours, Unit::Minutes, Unit::Seconds];

    /// Value of the matching `data-unit` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Hours => "hours",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Days => 0,
            Self::Hours => 1,
            Self::Minutes => 2,
            Self::Seconds => 3,
        }
    }
}

/// Whole seconds until `target_ms`, never negative.
pub fn remaining_seconds(target_ms: i64, now_ms: i64) -> u64 {
    let diff = target_ms.saturating_sub(now_ms).div_euclid(1_000);
    u64::try_from(diff).unwrap_or(0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Remaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Remaining {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / SECONDS_PER_DAY,
            hours: total % SECONDS_PER_DAY / SECONDS_PER_HOUR,
            minutes: total % SECONDS_PER_HOUR / SECONDS_PER_MINUTE,
            seconds: total % SECONDS_PER_MINUTE,
        }
    }

    /// Days are unpadded; the other units always have two digits.
    pub fn rendered(&self) -> [String; 4] {
        [
            self.days.to_string(),
            format!("{:02}", self.hours),
            format!("{:02}", self.minutes),
            format!("{:02}", self.seconds),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Counting,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Units whose text changed since the previous tick.
    Update(Vec<(Unit, String)>),
    /// Target reached on this tick; show the done label and stop ticking.
    Finished,
    /// Already done; nothing to do.
    Idle,
}

#[derive(Clone, Debug)]
pub struct Countdown {
    target_ms: i64,
    last: Option<[String; 4]>,
    phase: Phase,
}

impl Countdown {
    pub fn new(target_ms: i64) -> Self {
        Self {
            target_ms,
            last: None,
            phase: Phase::Counting,
        }
    }

    pub fn tick(&mut self, now_ms: i64) -> Tick {
        if self.phase == Phase::Done {
            return Tick::Idle;
        }

        let remaining = remaining_seconds(self.target_ms, now_ms);
        if remaining == 0 {
            self.phase = Phase::Done;
            self.last = None;
            return Tick::Finished;
        }

        let values = Remaining::from_seconds(remaining).rendered();
        let changed = Unit::ALL
            .into_iter()
            .filter(|unit| {
                self.last
                    .as_ref()
                    .map_or(true, |last| last[unit.index()] != values[unit.index()])
            })
            .map(|unit| (unit, values[unit.index()].clone()))
            .collect();

        self.last = Some(values);
        Tick::Update(changed)
    }
}
