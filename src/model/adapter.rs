// File: src/model/adapter.rs
//! iCalendar output for reconstructed lessons, plus reading a generated file
//! back into plain summaries.
use crate::model::LessonRecord;
use crate::reconstruct::ScheduledLesson;
use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use icalendar::{Calendar, CalendarComponent, Component};
use std::collections::HashSet;
use uuid::Uuid;

pub const ICS_VERSION: &str = "2.0";
const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const MAX_LINE_OCTETS: usize = 75;

/// Run-wide values every event shares.
#[derive(Debug, Clone)]
pub struct EmitSettings {
    pub timezone: String,
    pub product_id: String,
    pub uid_prefix: String,
    pub reminder_minutes: u32,
    pub dtstamp: DateTime<Utc>,
}

/// One rendered VEVENT, kept as unfolded content lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    pub uid: String,
    lines: Vec<String>,
}

impl EventBlock {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn has_alarm(&self) -> bool {
        self.lines.iter().any(|l| l == "BEGIN:VALARM")
    }
}

pub fn emit(
    record: &LessonRecord,
    date: NaiveDate,
    settings: &EmitSettings,
    with_alarm: bool,
) -> EventBlock {
    let uid = format!("{}_{}", settings.uid_prefix, Uuid::new_v4());
    let start = date.and_time(record.start_time);
    let end = date.and_time(record.end_time);

    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("SUMMARY:{}", escape_text(&record.subject)),
        format!("DTSTART;TZID={}:{}", settings.timezone, format_local(start)),
        format!("DTEND;TZID={}:{}", settings.timezone, format_local(end)),
    ];
    if let Some(loc) = &record.location {
        lines.push(format!("LOCATION:{}", escape_text(loc)));
    }
    lines.push(format!("UID:{}", uid));
    lines.push(format!("DTSTAMP:{}", settings.dtstamp.format(UTC_FORMAT)));
    if with_alarm {
        lines.push("BEGIN:VALARM".to_string());
        lines.push(format!("TRIGGER:-PT{}M", settings.reminder_minutes));
        lines.push("ACTION:DISPLAY".to_string());
        lines.push("DESCRIPTION:Reminder".to_string());
        lines.push("END:VALARM".to_string());
    }
    lines.push("END:VEVENT".to_string());

    EventBlock { uid, lines }
}

pub fn format_local(dt: NaiveDateTime) -> String {
    dt.format(LOCAL_FORMAT).to_string()
}

/// Escapes a TEXT value (RFC 5545 3.3.11).
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Folds a content line at 75 octets without splitting a UTF-8 sequence.
fn fold_line(line: &str, out: &mut String) {
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if used + len > budget {
            out.push_str("\r\n ");
            used = 0;
            // the leading space counts towards the continuation line
            budget = MAX_LINE_OCTETS - 1;
        }
        out.push(c);
        used += len;
    }
    out.push_str("\r\n");
}

/// The generated document. Built once per run and then written out as text.
#[derive(Debug, Clone)]
pub struct CalendarDocument {
    pub product_id: String,
    pub generated_at: DateTime<Utc>,
    events: Vec<EventBlock>,
}

impl CalendarDocument {
    pub fn new(product_id: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            product_id: product_id.into(),
            generated_at,
            events: Vec::new(),
        }
    }

    pub fn from_lessons(lessons: &[ScheduledLesson], settings: &EmitSettings) -> Self {
        let mut doc = Self::new(settings.product_id.clone(), settings.dtstamp);
        for lesson in lessons {
            doc.push(emit(&lesson.record, lesson.date, settings, lesson.with_alarm));
        }
        doc
    }

    pub fn push(&mut self, event: EventBlock) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[EventBlock] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_ics(&self) -> String {
        let mut ics = String::with_capacity(128 + self.events.len() * 320);
        fold_line("BEGIN:VCALENDAR", &mut ics);
        fold_line(&format!("PRODID:-//{}//EN", self.product_id), &mut ics);
        fold_line(&format!("VERSION:{}", ICS_VERSION), &mut ics);
        for event in &self.events {
            for line in event.lines() {
                fold_line(line, &mut ics);
            }
        }
        fold_line("END:VCALENDAR", &mut ics);
        ics
    }
}

/// What `inspect` shows for each event of a generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    pub uid: String,
    pub summary: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub has_alarm: bool,
}

/// UIDs of the events that carry a VALARM, found by scanning the raw lines.
fn uids_with_alarm(raw_ics: &str) -> HashSet<String> {
    let unfolded = raw_ics.replace("\r\n ", "").replace("\n ", "");
    let mut found = HashSet::new();
    let mut uid: Option<&str> = None;
    let mut alarm = false;
    for line in unfolded.lines() {
        let trim = line.trim_end();
        if trim == "BEGIN:VEVENT" {
            uid = None;
            alarm = false;
        } else if trim == "BEGIN:VALARM" {
            alarm = true;
        } else if let Some(value) = trim.strip_prefix("UID:") {
            uid = Some(value);
        } else if trim == "END:VEVENT"
            && alarm
            && let Some(uid) = uid
        {
            found.insert(uid.to_string());
        }
    }
    found
}

pub fn read_events(raw_ics: &str) -> Result<Vec<EventSummary>> {
    let calendar: Calendar = raw_ics.parse().map_err(|e| anyhow!("Parse: {}", e))?;

    let parse_local = |val: &str| NaiveDateTime::parse_from_str(val, LOCAL_FORMAT).ok();
    let alarmed = uids_with_alarm(raw_ics);

    let mut summaries = Vec::new();
    for component in &calendar.components {
        let CalendarComponent::Event(event) = component else {
            continue;
        };
        let props = event.properties();
        let dtstart = props.get("DTSTART");
        let uid = event.get_uid().unwrap_or_default().to_string();
        summaries.push(EventSummary {
            has_alarm: alarmed.contains(&uid),
            uid,
            summary: unescape_text(event.get_summary().unwrap_or_default()),
            start: dtstart.and_then(|p| parse_local(p.value())),
            end: props.get("DTEND").and_then(|p| parse_local(p.value())),
            timezone: dtstart
                .and_then(|p| p.params().get("TZID"))
                .map(|p| p.value().to_string()),
            location: props.get("LOCATION").map(|p| unescape_text(p.value())),
        });
    }
    summaries.sort_by_key(|s| s.start);
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn settings() -> EmitSettings {
        EmitSettings {
            timezone: "Europe/Oslo".to_string(),
            product_id: "Test timetable".to_string(),
            uid_prefix: "fromvisma".to_string(),
            reminder_minutes: 15,
            dtstamp: Utc.with_ymd_and_hms(2025, 8, 30, 10, 0, 0).unwrap(),
        }
    }

    fn lesson(location: Option<&str>) -> LessonRecord {
        LessonRecord::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            location.map(str::to_string),
            "Math",
        )
    }

    #[test]
    fn test_event_field_order_with_alarm() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let block = emit(&lesson(Some("Room1")), date, &settings(), true);
        let lines = block.lines();
        assert_eq!(lines[0], "BEGIN:VEVENT");
        assert_eq!(lines[1], "SUMMARY:Math");
        assert_eq!(lines[2], "DTSTART;TZID=Europe/Oslo:20250901T090000");
        assert_eq!(lines[3], "DTEND;TZID=Europe/Oslo:20250901T103000");
        assert_eq!(lines[4], "LOCATION:Room1");
        assert!(lines[5].starts_with("UID:fromvisma_"));
        assert_eq!(lines[6], "DTSTAMP:20250830T100000Z");
        assert_eq!(
            &lines[7..],
            &[
                "BEGIN:VALARM",
                "TRIGGER:-PT15M",
                "ACTION:DISPLAY",
                "DESCRIPTION:Reminder",
                "END:VALARM",
                "END:VEVENT"
            ]
        );
        assert!(block.has_alarm());
    }

    #[test]
    fn test_event_without_location_or_alarm() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let block = emit(&lesson(None), date, &settings(), false);
        assert!(!block.lines().iter().any(|l| l.starts_with("LOCATION")));
        assert!(!block.has_alarm());
        assert_eq!(block.lines().len(), 7);
    }

    #[test]
    fn test_uids_are_unique() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let a = emit(&lesson(None), date, &settings(), false);
        let b = emit(&lesson(None), date, &settings(), false);
        assert_ne!(a.uid, b.uid);
    }

    #[test]
    fn test_document_uses_crlf() {
        let mut doc = CalendarDocument::new("Test timetable", settings().dtstamp);
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        doc.push(emit(&lesson(None), date, &settings(), false));
        let ics = doc.to_ics();
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nPRODID:-//Test timetable//EN\r\nVERSION:2.0\r\n"));
        assert!(ics.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
        assert!(!ics.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(escape_text("Math, advanced; part\\2"), "Math\\, advanced\\; part\\\\2");
        assert_eq!(unescape_text("Math\\, advanced\\; part\\\\2"), "Math, advanced; part\\2");
    }

    #[test]
    fn test_long_lines_are_folded() {
        let mut out = String::new();
        let long = format!("SUMMARY:{}", "ø".repeat(60));
        fold_line(&long, &mut out);
        for physical in out.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(physical.len() <= MAX_LINE_OCTETS, "{}", physical.len());
        }
        let unfolded = out.replace("\r\n ", "");
        assert_eq!(unfolded.trim_end(), long);
    }
}
