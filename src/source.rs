// File: ./src/source.rs
//! Turns the text handed over by the PDF extraction step into dated line
//! sequences for the reconstructor.
//!
//! Two shapes are accepted:
//! - columns: a page header ending in `- DD.MM.YYYY`, followed by one text
//!   column per weekday, columns separated by form feeds;
//! - stream: one continuous text whose last dated line (`DD.MM.YYYY`) gives
//!   the day the stream starts on.
use crate::reconstruct::Layout;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, Duration, NaiveDate};
use std::fs;
use std::path::Path;

pub const DATE_FORMAT: &str = "%d.%m.%Y";
pub const COLUMN_SEPARATOR: char = '\u{0C}';
pub const DAYS_PER_PAGE: usize = 5;

/// An ordered run of extracted lines starting on `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySlice {
    pub date: NaiveDate,
    pub lines: Vec<String>,
}

impl DaySlice {
    pub fn new<S: Into<String>>(date: NaiveDate, lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            date,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimetableInput {
    Columns(Vec<DaySlice>),
    Stream(DaySlice),
}

impl TimetableInput {
    pub fn layout(&self) -> Layout {
        match self {
            TimetableInput::Columns(_) => Layout::Columns,
            TimetableInput::Stream(_) => Layout::Stream,
        }
    }

    pub fn line_count(&self) -> usize {
        match self {
            TimetableInput::Columns(days) => days.iter().map(|d| d.lines.len()).sum(),
            TimetableInput::Stream(day) => day.lines.len(),
        }
    }
}

/// Reads an extracted text file. Failing here is fatal for the run.
pub fn load(path: &Path, layout: Layout) -> Result<TimetableInput> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read timetable text '{}'", path.display()))?;
    parse(&text, layout).with_context(|| format!("Unusable timetable text '{}'", path.display()))
}

pub fn parse(text: &str, layout: Layout) -> Result<TimetableInput> {
    if text.trim().is_empty() {
        bail!("No text was extracted from the timetable");
    }
    match layout {
        Layout::Columns => parse_columns(text),
        Layout::Stream => parse_stream(text),
    }
}

/// Splits a columns export. Column `i` falls on the `i % 5`th weekday of the
/// `i / 5`th week after the header's week.
pub fn parse_columns(text: &str) -> Result<TimetableInput> {
    let (header, body) = match text.trim_start().split_once('\n') {
        Some((header, body)) => (header, body),
        None => (text.trim_start(), ""),
    };
    let monday = week_start(parse_header_date(header)?);

    let days = body
        .split(COLUMN_SEPARATOR)
        .enumerate()
        .map(|(i, column)| {
            let offset = 7 * (i / DAYS_PER_PAGE) + i % DAYS_PER_PAGE;
            DaySlice::new(monday + Duration::days(offset as i64), column.lines())
        })
        .collect();
    Ok(TimetableInput::Columns(days))
}

/// Reads the date from a header like `"Timeplan 3A - 01.09.2025"`.
pub fn parse_header_date(header: &str) -> Result<NaiveDate> {
    let tail = header.rsplit(" - ").next().unwrap_or(header).trim();
    NaiveDate::parse_from_str(tail, DATE_FORMAT)
        .map_err(|e| anyhow!("Header '{}' does not end in a DD.MM.YYYY date: {}", header, e))
}

pub fn parse_stream(text: &str) -> Result<TimetableInput> {
    let lines: Vec<&str> = text.lines().collect();
    let date = lines
        .iter()
        .rev()
        .find_map(|line| find_date(line))
        .ok_or_else(|| anyhow!("No DD.MM.YYYY date found in the timetable text"))?;
    Ok(TimetableInput::Stream(DaySlice::new(date, lines)))
}

fn find_date(line: &str) -> Option<NaiveDate> {
    line.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .map(|token| token.trim_matches('.'))
        .filter(|token| token.len() == 10)
        .find_map(|token| NaiveDate::parse_from_str(token, DATE_FORMAT).ok())
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_header_date() {
        assert_eq!(
            parse_header_date("Timeplan for 2STA - 03.09.2025").unwrap(),
            d(2025, 9, 3)
        );
        assert_eq!(
            parse_header_date("Uke 36 - 01.09.2025 - 05.09.2025").unwrap(),
            d(2025, 9, 5)
        );
        assert!(parse_header_date("Timeplan").is_err());
        assert!(parse_header_date("Timeplan - 2025-09-01").is_err());
    }

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start(d(2025, 9, 3)), d(2025, 9, 1));
        assert_eq!(week_start(d(2025, 9, 1)), d(2025, 9, 1));
        assert_eq!(week_start(d(2025, 9, 7)), d(2025, 9, 1));
    }

    #[test]
    fn test_columns_are_dated_by_position() {
        let mut text = String::from("Timeplan - 03.09.2025\n");
        for i in 0..7 {
            if i > 0 {
                text.push(COLUMN_SEPARATOR);
            }
            text.push_str(&format!("08:00-08:45\nDay{}\n", i));
        }
        let TimetableInput::Columns(days) = parse_columns(&text).unwrap() else {
            panic!("expected columns");
        };
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, d(2025, 9, 1));
        assert_eq!(days[4].date, d(2025, 9, 5));
        // second page continues with the next week
        assert_eq!(days[5].date, d(2025, 9, 8));
        assert_eq!(days[6].date, d(2025, 9, 9));
        assert_eq!(days[2].lines, vec!["08:00-08:45", "Day2"]);
    }

    #[test]
    fn test_stream_uses_last_dated_line() {
        let text = "08:00-08:45\nMath\n09:00-09:45\nArt\nLastet ned 02.09.2025 kl. 12:00\n";
        let input = parse_stream(text).unwrap();
        assert_eq!(input.layout(), Layout::Stream);
        let TimetableInput::Stream(day) = input else {
            panic!("expected stream");
        };
        assert_eq!(day.date, d(2025, 9, 2));
        assert_eq!(day.lines.len(), 5);
    }

    #[test]
    fn test_stream_without_date_fails() {
        assert!(parse_stream("08:00-08:45\nMath\n").is_err());
    }

    #[test]
    fn test_empty_text_fails() {
        assert!(parse("  \n\n", Layout::Columns).is_err());
        assert!(parse("", Layout::Stream).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/timetable.txt"), Layout::Columns).unwrap_err();
        assert!(err.to_string().contains("Failed to read timetable text"));
    }
}
