// File: src/controller.rs
//! Runs one conversion: acquire the extracted text, reconstruct the lessons,
//! emit the calendar, hand it to the sink. Front ends only build a
//! [`ConvertRequest`] and call into here.
use crate::config::Config;
use crate::model::{CalendarDocument, EmitSettings, EventSummary, adapter};
use crate::reconstruct::{Layout, Reconstructor};
use crate::source::{self, TimetableInput};
use crate::storage::LocalStorage;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub layout: Option<Layout>,
    pub timezone: Option<String>,
    pub output: OutputSink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    pub events: usize,
    pub reminders: usize,
    pub timezone: String,
    pub layout: Layout,
}

/// Builds a calendar from already acquired input. Pure apart from UID generation.
pub fn build_calendar(
    input: &TimetableInput,
    config: &Config,
    timezone: &str,
    generated_at: DateTime<Utc>,
) -> CalendarDocument {
    let lessons = Reconstructor::new(config.heuristics).reconstruct(input);
    let settings = EmitSettings {
        timezone: timezone.to_string(),
        product_id: config.product_id.clone(),
        uid_prefix: config.uid_prefix.clone(),
        reminder_minutes: config.reminder_minutes,
        dtstamp: generated_at,
    };
    CalendarDocument::from_lessons(&lessons, &settings)
}

/// Full run. Any acquisition failure aborts before anything is written.
/// Returns the report and, for [`OutputSink::Stdout`], the calendar text.
pub fn convert(request: &ConvertRequest, config: &Config) -> Result<(ConvertReport, Option<String>)> {
    let layout = request.layout.unwrap_or(config.layout);
    let timezone = config.resolve_timezone(request.timezone.as_deref())?;
    let input = source::load(&request.input, layout)?;
    log::info!(
        "Read {} lines ({} layout), timezone {}",
        input.line_count(),
        layout,
        timezone
    );

    let doc = build_calendar(&input, config, &timezone, Utc::now());
    let report = ConvertReport {
        events: doc.len(),
        reminders: doc.events().iter().filter(|e| e.has_alarm()).count(),
        timezone,
        layout,
    };
    if doc.is_empty() {
        log::warn!("No lessons found in '{}'", request.input.display());
    }

    match &request.output {
        OutputSink::Stdout => Ok((report, Some(doc.to_ics()))),
        OutputSink::File(path) => {
            LocalStorage::save_calendar(path, &doc)?;
            Ok((report, None))
        }
    }
}

pub fn inspect(path: &std::path::Path) -> Result<Vec<EventSummary>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read calendar '{}'", path.display()))?;
    adapter::read_events(&raw).with_context(|| format!("Invalid calendar '{}'", path.display()))
}
