// View models for the history list and its filter controls

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::query::HistoryFilter;
use crate::database::{CaptureSource, ScanRecord};
use crate::tags::tag_line;

const CAPTION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One emission of the record subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub filter: HistoryFilter,
    pub records: Vec<ScanRecord>,
}

impl HistoryPage {
    pub fn new(filter: HistoryFilter, records: Vec<ScanRecord>) -> Self {
        Self { filter, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Cards in display order, captions in local time
    pub fn cards(&self) -> Vec<RecordCard> {
        self.records.iter().map(|r| RecordCard::from_record(r, &Local)).collect()
    }

    /// Placeholder text when nothing matches
    pub fn empty_message(&self) -> Option<String> {
        if self.is_empty() {
            Some(empty_message(&self.filter))
        } else {
            None
        }
    }
}

/// What a single history entry shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCard {
    pub id: i64,
    pub image_ref: String,
    /// `"With: a, b"`, absent when the record has no tags
    pub tag_line: Option<String>,
    /// `"<source> - YYYY-MM-DD HH:MM"`
    pub caption: String,
}

impl RecordCard {
    pub fn from_record<Tz>(record: &ScanRecord, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            id: record.id,
            image_ref: record.image_ref.clone(),
            tag_line: tag_line(&record.tags),
            caption: caption(record, tz),
        }
    }
}

fn caption<Tz>(record: &ScanRecord, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let when = Utc.timestamp_millis_opt(record.captured_at)
        .single()
        .map(|utc| utc.with_timezone(tz).format(CAPTION_TIME_FORMAT).to_string())
        .unwrap_or_else(|| "unknown date".to_string());

    format!("{} - {}", record.source().label(), when)
}

/// A selectable filter control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChip {
    pub label: String,
    pub filter: HistoryFilter,
    pub selected: bool,
}

/// "All" first, then one chip per indexed tag; the chip for `current` is selected
pub fn filter_chips(index: &[String], current: &HistoryFilter) -> Vec<FilterChip> {
    let mut chips = Vec::with_capacity(index.len() + 1);

    chips.push(FilterChip {
        label: "All".to_string(),
        filter: HistoryFilter::All,
        selected: *current == HistoryFilter::All,
    });

    for tag in index {
        let filter = HistoryFilter::Tag(tag.clone());
        chips.push(FilterChip {
            label: tag.clone(),
            selected: *current == filter,
            filter,
        });
    }

    chips
}

pub fn empty_message(filter: &HistoryFilter) -> String {
    match filter {
        HistoryFilter::All => "No saved scans yet.".to_string(),
        HistoryFilter::Tag(tag) => format!("No scans tagged '{}'.", tag),
    }
}

/// Confirmation shown once a save has been committed
pub fn saved_message(source: CaptureSource) -> &'static str {
    match source {
        CaptureSource::Camera => "Scan saved to history.",
        CaptureSource::Gallery => "Gallery image saved to history.",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Error,
}

/// Transient message for the user (toast, status line)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Info, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, text: text.into() }
    }
}
