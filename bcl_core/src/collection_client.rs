//! This client fetches the waste collection calendar and picks the next
//! collection out of it.

use std::{
    fs,
    io::{BufReader, Cursor},
    path::Path,
};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ical::{parser::ical::component::IcalEvent, IcalParser};
use tracing::debug;

use crate::profile::classify;

/// An iCalendar start or end, which may carry a time of day or be date-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl EventTime {
    /// The calendar date, discarding any time of day.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(date_time) => date_time.date(),
        }
    }

    /// Ordering key: date-only values sort as midnight.
    fn sort_key(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN),
            Self::DateTime(date_time) => *date_time,
        }
    }
}

/// A single calendar entry, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEvent {
    pub summary: String,
    pub start: EventTime,
    pub end: Option<EventTime>,
}

/// The next collection: every relevant event on the earliest relevant date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingCollection {
    /// Summaries of all collections on the selected date, joined with ", ".
    pub combined_summary: String,
    pub start: EventTime,
    pub end: Option<EventTime>,
}

/// Get the upcoming collection from the configured calendar source.
///
/// The feed is fetched from `url` when one is given, otherwise read from the
/// local `calendar_file`.
pub async fn get(url: Option<&str>, calendar_file: &Path) -> Result<Option<UpcomingCollection>> {
    let ics = match url {
        Some(url) => fetch_remote(url).await?,
        None => read_local(calendar_file)?,
    };
    let events = parse(&ics)?;
    Ok(next_collection(events))
}

/// Fetch the calendar feed over HTTP.
async fn fetch_remote(url: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let response = client.get(url).send().await?;
    Ok(response.text().await?)
}

/// Read the calendar feed from the local fallback file.
fn read_local(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read calendar file {}", path.display()))
}

trait GetIcalProperty {
    fn get_ical_property_value(&self, name: &str) -> Option<&String>;
}

impl GetIcalProperty for IcalEvent {
    fn get_ical_property_value(&self, name: &str) -> Option<&String> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .and_then(|property| property.value.as_ref())
    }
}

/// Parse the iCalendar text into collection events.
///
/// Entries without a SUMMARY or with an unparsable DTSTART are skipped.
pub fn parse(ics: &str) -> Result<Vec<CollectionEvent>> {
    let parser = IcalParser::new(BufReader::new(Cursor::new(ics)));
    let mut events = vec![];
    for ical_calendar_result in parser {
        let ical_calendar = ical_calendar_result?;
        for ical_event in ical_calendar.events {
            let summary_option = ical_event.get_ical_property_value("SUMMARY");
            let start_option = ical_event
                .get_ical_property_value("DTSTART")
                .and_then(|dt_start| parse_ical_time(dt_start));
            let (Some(summary), Some(start)) = (summary_option, start_option) else {
                continue;
            };
            let end = ical_event
                .get_ical_property_value("DTEND")
                .and_then(|dt_end| parse_ical_time(dt_end));
            events.push(CollectionEvent {
                summary: summary.clone(),
                start,
                end,
            });
        }
    }
    debug!(count = events.len(), "parsed calendar entries");
    Ok(events)
}

/// Parse an iCalendar date (`YYYYMMDD`) or date-time (`YYYYMMDDTHHMMSS[Z]`).
fn parse_ical_time(value: &str) -> Option<EventTime> {
    let date = NaiveDate::from_ymd_opt(
        value.get(0..4)?.parse().ok()?,
        value.get(4..6)?.parse().ok()?,
        value.get(6..8)?.parse().ok()?,
    )?;
    if value.get(8..9) != Some("T") {
        return Some(EventTime::Date(date));
    }
    let time_part = value.get(9..15)?;
    let time = NaiveTime::from_hms_opt(
        time_part.get(0..2)?.parse().ok()?,
        time_part.get(2..4)?.parse().ok()?,
        time_part.get(4..6)?.parse().ok()?,
    )?;
    Some(EventTime::DateTime(date.and_time(time)))
}

/// Select the next collection from the parsed entries.
///
/// Relevant entries are sorted ascending by start, keeping feed order for
/// equal starts. The earliest entry fixes the collection date and every
/// relevant entry on that date contributes its summary.
pub fn next_collection(events: Vec<CollectionEvent>) -> Option<UpcomingCollection> {
    let mut relevant: Vec<CollectionEvent> = events
        .into_iter()
        .filter(|event| !classify(&event.summary).is_none())
        .collect();
    relevant.sort_by_key(|event| event.start.sort_key());
    let first = relevant.first()?;
    let collection_date = first.start.date();
    let summaries: Vec<&str> = relevant
        .iter()
        .filter(|event| event.start.date() == collection_date)
        .map(|event| event.summary.as_str())
        .collect();
    Some(UpcomingCollection {
        combined_summary: summaries.join(", "),
        start: first.start,
        end: first.end,
    })
}
