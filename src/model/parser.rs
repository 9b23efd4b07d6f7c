// File: src/model/parser.rs
//! Recognises lesson header lines (`HH:MM-HH:MM[|location]`) in extracted text
//! and turns a header plus its subject line into a [`LessonRecord`].
use crate::model::LessonRecord;
use chrono::NaiveTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Header(HeaderMatch),
    NotHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    /// The line at the index is not a (well-formed) header.
    NotHeader,
    /// There is no line after the header to read the subject from.
    Incomplete,
    /// The subject line is blank.
    EmptySubject,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::NotHeader => write!(f, "not a lesson header"),
            ExtractError::Incomplete => write!(f, "header has no subject line"),
            ExtractError::EmptySubject => write!(f, "subject line is blank"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// A lesson found by looking ahead, plus the index of its subject line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookahead {
    pub record: LessonRecord,
    pub index: usize,
}

/// Classifies a single extracted line.
///
/// The first gate is positional only: characters 0, 1, 3 and 4 must be digits
/// and character 2 a colon. Anything after that is tolerated until the
/// stricter split below, and any failure there also yields `NotHeader`.
pub fn classify(line: &str) -> LineClass {
    if !has_clock_prefix(line) {
        return LineClass::NotHeader;
    }
    match parse_header(line) {
        Some(header) => LineClass::Header(header),
        None => {
            log::debug!("Malformed header skipped: {:?}", line);
            LineClass::NotHeader
        }
    }
}

fn has_clock_prefix(line: &str) -> bool {
    let prefix: Vec<char> = line.chars().take(5).collect();
    prefix.len() == 5
        && prefix[2] == ':'
        && [0, 1, 3, 4].iter().all(|&i| prefix[i].is_ascii_digit())
}

fn parse_header(line: &str) -> Option<HeaderMatch> {
    let (range, location) = match line.split_once('|') {
        Some((range, rest)) => {
            if rest.contains('|') {
                return None;
            }
            (range, Some(rest.trim()))
        }
        None => (line, None),
    };

    let (start, end) = range.split_once('-')?;
    if end.contains('-') {
        return None;
    }
    let start_time = parse_clock(start.trim())?;
    let end_time = parse_clock(end.trim())?;
    if end_time <= start_time {
        return None;
    }

    Some(HeaderMatch {
        start_time,
        end_time,
        location: location.filter(|l| !l.is_empty()).map(str::to_string),
    })
}

fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Builds the lesson whose header sits at `index`; the subject is the next line.
pub fn extract<S: AsRef<str>>(lines: &[S], index: usize) -> Result<LessonRecord, ExtractError> {
    let header_line = lines.get(index).ok_or(ExtractError::Incomplete)?;
    let header = match classify(header_line.as_ref()) {
        LineClass::Header(h) => h,
        LineClass::NotHeader => return Err(ExtractError::NotHeader),
    };
    let subject = lines
        .get(index + 1)
        .ok_or(ExtractError::Incomplete)?
        .as_ref()
        .trim();
    if subject.is_empty() {
        return Err(ExtractError::EmptySubject);
    }
    Ok(LessonRecord::new(
        header.start_time,
        header.end_time,
        header.location,
        subject,
    ))
}

/// Peeks at the next lesson starting from `from_index` without touching the
/// caller's cursor. Only headers that still have a line after them count.
pub fn find_next_header<S: AsRef<str>>(lines: &[S], from_index: usize) -> Option<Lookahead> {
    let mut b = from_index;
    while b + 1 < lines.len() {
        if let Ok(record) = extract(lines, b) {
            return Some(Lookahead {
                record,
                index: b + 1,
            });
        }
        b += 1;
    }
    None
}
