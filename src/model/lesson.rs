// File: ./src/model/lesson.rs
use chrono::{Duration, NaiveTime, Timelike};
use std::fmt;

/// One scheduled lesson, as recovered from a header line and its subject line.
///
/// Records are treated as values: operations that change a time return a new
/// record, so a copy stored as history is never affected by later edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRecord {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub subject: String,
}

impl LessonRecord {
    pub fn new(
        start_time: NaiveTime,
        end_time: NaiveTime,
        location: Option<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            start_time,
            end_time,
            location,
            subject: subject.into(),
        }
    }

    /// Placeholder seeding the history before any real lesson was seen.
    /// The empty subject never compares equal to a parsed lesson.
    pub fn sentinel(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
            location: None,
            subject: String::new(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.subject.is_empty()
    }

    pub fn start_minutes(&self) -> u32 {
        minutes_past_midnight(self.start_time)
    }

    pub fn end_minutes(&self) -> u32 {
        minutes_past_midnight(self.end_time)
    }

    pub fn duration_minutes(&self) -> i64 {
        i64::from(self.end_minutes()) - i64::from(self.start_minutes())
    }

    /// True when `self` ends together with `other` and carries the same subject,
    /// i.e. it describes a block already folded into `other`.
    pub fn is_continuation_of(&self, other: &LessonRecord) -> bool {
        self.end_minutes() == other.end_minutes() && self.subject == other.subject
    }

    pub fn with_end(&self, end_time: NaiveTime) -> LessonRecord {
        LessonRecord {
            end_time,
            ..self.clone()
        }
    }

    /// Moves the end `minutes` later. The result stays on the same day: an
    /// end that would pass midnight is clamped to 23:59.
    pub fn extended_by(&self, minutes: u32) -> LessonRecord {
        let (end, overflow) = self
            .end_time
            .overflowing_add_signed(Duration::minutes(i64::from(minutes)));
        if overflow != 0 {
            log::warn!(
                "Extending '{}' by {} minutes passes midnight, clamping to 23:59",
                self.subject,
                minutes
            );
            return self.with_end(last_minute_of_day());
        }
        self.with_end(end)
    }
}

impl fmt::Display for LessonRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.subject,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )?;
        if let Some(loc) = &self.location {
            write!(f, " @ {}", loc)?;
        }
        Ok(())
    }
}

pub fn minutes_past_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn last_minute_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default()
}
