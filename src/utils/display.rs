use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::models::lead::{Lead, USER_CREATE_TIME};

const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const HOUR_FORMAT: &str = "%Y-%m-%d %H:00";

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%b %d %Y"];

// Zone names that only restate UTC on otherwise naive values.
const UTC_SUFFIXES: &[&str] = &["GMT", "UTC"];

/// Display-ready copy of a leads collection.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadsPage {
    /// First record's timestamp at second granularity.
    pub task_update_time: String,
    /// Records in upstream order with `user_create_time` truncated to the hour.
    pub results: Vec<Lead>,
}

pub struct DisplayFormatter;

impl DisplayFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Parses the timestamp forms the upstream emits. Offsets are kept as
    /// written; the wall-clock time is what gets displayed.
    pub fn parse_timestamp(&self, raw: &str) -> Result<NaiveDateTime> {
        let text = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.naive_local());
        }
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(text, format) {
                return Ok(dt.naive_local());
            }
        }
        // HTTP-date style, e.g. "Tue, 02 Jan 2024 03:04:05 GMT"
        if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
            return Ok(dt.naive_local());
        }

        let naive = UTC_SUFFIXES
            .iter()
            .find_map(|zone| text.strip_suffix(zone))
            .map(str::trim_end)
            .unwrap_or(text);
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
                return Ok(dt);
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(naive, format) {
                return Ok(date.and_time(NaiveTime::MIN));
            }
        }

        Err(GatewayError::InvalidTimestamp(raw.to_string()))
    }

    fn create_time(&self, lead: &Lead) -> Result<NaiveDateTime> {
        let raw = lead
            .get(USER_CREATE_TIME)
            .and_then(Value::as_str)
            .ok_or(GatewayError::MissingField(USER_CREATE_TIME))?;
        self.parse_timestamp(raw)
    }

    pub fn format_update_time(&self, dt: &NaiveDateTime) -> String {
        dt.format(UPDATE_TIME_FORMAT).to_string()
    }

    pub fn format_hour(&self, dt: &NaiveDateTime) -> String {
        dt.format(HOUR_FORMAT).to_string()
    }

    /// Builds the page model without touching `leads`.
    ///
    /// Fails when the collection is empty or any record lacks a parseable
    /// `user_create_time`.
    pub fn leads_page(&self, leads: &[Lead]) -> Result<LeadsPage> {
        let first = leads.first().ok_or(GatewayError::EmptyLeads)?;
        let task_update_time = self.format_update_time(&self.create_time(first)?);

        let results = leads
            .iter()
            .map(|lead| -> Result<Lead> {
                let hour = self.format_hour(&self.create_time(lead)?);
                let mut display = lead.clone();
                display.insert(USER_CREATE_TIME.to_string(), Value::String(hour));
                Ok(display)
            })
            .collect::<Result<Vec<Lead>>>()?;

        Ok(LeadsPage {
            task_update_time,
            results,
        })
    }

    /// Union of record keys in first-seen order.
    pub fn columns(&self, leads: &[Lead]) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for key in leads.iter().flat_map(|lead| lead.keys()) {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        columns
    }

    /// Strings render verbatim, other values as JSON text, missing fields empty.
    pub fn format_cell(&self, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl Default for DisplayFormatter {
    fn default() -> Self {
        Self::new()
    }
}
