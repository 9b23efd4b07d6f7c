// File: ./src/reconstruct.rs
//! Single-pass reconstruction of lessons from classified text lines.
//!
//! The pass keeps a small window of history (the previous lesson and the one
//! before it) and, for every accepted header, decides whether the block is a
//! leftover of an already merged lesson, whether it must be merged with the
//! block that follows, whether its printed end was truncated, and whether it
//! deserves a reminder.
use crate::model::{LessonRecord, parser};
use crate::source::{DaySlice, TimetableInput};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

fn default_extension() -> u32 {
    45
}
fn default_cutoff() -> u32 {
    90
}
fn default_min_lines() -> usize {
    5
}

/// Shape of the extracted text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Layout {
    /// One text column per weekday, dated by position.
    #[default]
    Columns,
    /// One continuous text stream; days are found by rollover.
    Stream,
}

/// Constants of the "truncated last lesson" correction. They describe one
/// school's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heuristics {
    #[serde(default = "default_extension")]
    pub short_lesson_extension_minutes: u32,
    #[serde(default = "default_cutoff")]
    pub short_lesson_cutoff_minutes: u32,
    /// Below this many lines left from the cursor, lookahead is not trusted.
    #[serde(default = "default_min_lines")]
    pub lookahead_min_lines: usize,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            short_lesson_extension_minutes: default_extension(),
            short_lesson_cutoff_minutes: default_cutoff(),
            lookahead_min_lines: default_min_lines(),
        }
    }
}

/// A finalized lesson ready for the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledLesson {
    pub record: LessonRecord,
    pub date: NaiveDate,
    pub with_alarm: bool,
}

/// History carried across the pass. Owned by one [`Reconstructor`].
#[derive(Debug, Clone)]
pub struct ReconstructionState {
    pub previous_event: LessonRecord,
    pub previous_previous_event: LessonRecord,
    pub current_date: NaiveDate,
    seen_first: bool,
}

impl ReconstructionState {
    pub fn new(first_day: NaiveDate) -> Self {
        Self {
            previous_event: LessonRecord::sentinel(NaiveTime::MIN, last_minute()),
            previous_previous_event: zeroed_sentinel(),
            current_date: first_day,
            seen_first: false,
        }
    }

    /// Rebinds the history window; `latest` becomes the previous event.
    fn shift_history(&mut self, latest: LessonRecord) {
        let older = std::mem::replace(&mut self.previous_event, latest);
        self.previous_previous_event = if self.seen_first {
            older
        } else {
            zeroed_sentinel()
        };
        self.seen_first = true;
    }

    /// Lesson whose start/end decide whether a new lesson abuts the last one.
    fn alarm_reference(&self, layout: Layout) -> &LessonRecord {
        match layout {
            Layout::Columns => &self.previous_event,
            // previous_event already holds the current lesson at this point
            Layout::Stream => &self.previous_previous_event,
        }
    }
}

fn zeroed_sentinel() -> LessonRecord {
    LessonRecord::sentinel(NaiveTime::MIN, NaiveTime::MIN)
}

fn last_minute() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default()
}

pub struct Reconstructor {
    heuristics: Heuristics,
}

impl Reconstructor {
    pub fn new(heuristics: Heuristics) -> Self {
        Self { heuristics }
    }

    /// Runs the whole pass over either input shape.
    pub fn reconstruct(&self, input: &TimetableInput) -> Vec<ScheduledLesson> {
        let mut out = Vec::new();
        match input {
            TimetableInput::Columns(days) => {
                let Some(first) = days.first() else {
                    return out;
                };
                let mut state = ReconstructionState::new(first.date);
                for day in days {
                    state.current_date = day.date;
                    self.walk(day, Layout::Columns, &mut state, &mut out);
                }
            }
            TimetableInput::Stream(day) => {
                let mut state = ReconstructionState::new(day.date);
                self.walk(day, Layout::Stream, &mut state, &mut out);
            }
        }
        log::info!("Reconstructed {} lessons", out.len());
        out
    }

    fn walk(
        &self,
        day: &DaySlice,
        layout: Layout,
        state: &mut ReconstructionState,
        out: &mut Vec<ScheduledLesson>,
    ) {
        let lines = &day.lines;
        let mut cursor = 0;
        while cursor + 1 < lines.len() {
            cursor = self.step(lines, cursor, layout, state, out);
        }
    }

    /// Handles the line at `cursor` and returns the next cursor position.
    fn step(
        &self,
        lines: &[String],
        cursor: usize,
        layout: Layout,
        state: &mut ReconstructionState,
        out: &mut Vec<ScheduledLesson>,
    ) -> usize {
        let mut current = match parser::extract(lines, cursor) {
            Ok(record) => record,
            Err(_) => return cursor + 1,
        };

        if current.is_continuation_of(&state.previous_event) {
            log::debug!("Skipping repeated block {}", current);
            return cursor + 1;
        }

        let next = parser::find_next_header(lines, cursor + 2)
            .map(|found| found.record)
            .unwrap_or_else(|| {
                LessonRecord::sentinel(
                    state.previous_event.start_time,
                    state.previous_event.end_time,
                )
            });

        if layout == Layout::Stream {
            if current.start_minutes() < state.previous_event.start_minutes() {
                match state.current_date.succ_opt() {
                    Some(date) => {
                        log::info!("Day rollover at {}, now {}", current, date);
                        state.current_date = date;
                    }
                    None => log::warn!("Cannot advance past {}", state.current_date),
                }
            }
            state.shift_history(current.clone());
        }

        if current.end_time == next.start_time && current.subject == next.subject {
            current = current.with_end(next.end_time);
        }
        // skip-ahead compares the merged end, not the rounded one
        let unrounded_end = current.end_time;

        let h = &self.heuristics;
        // counts the header line itself
        let lines_left = lines.len() - cursor;
        let ends_day = next.start_time < current.start_time
            && current.duration_minutes() < i64::from(h.short_lesson_cutoff_minutes);
        if lines_left < h.lookahead_min_lines || ends_day {
            current = current.extended_by(h.short_lesson_extension_minutes);
        }

        let reference = state.alarm_reference(layout);
        let with_alarm =
            current.start_time != reference.start_time && current.start_time != reference.end_time;

        log::debug!(
            "{} {}{}",
            state.current_date,
            current,
            if with_alarm { " (reminder)" } else { "" }
        );
        out.push(ScheduledLesson {
            record: current.clone(),
            date: state.current_date,
            with_alarm,
        });

        let skip_merged = next.end_time == unrounded_end && next.subject == current.subject;
        match layout {
            Layout::Columns => state.shift_history(current),
            Layout::Stream => state.previous_event = current,
        }

        if skip_merged { cursor + 4 } else { cursor + 1 }
    }
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new(Heuristics::default())
    }
}
