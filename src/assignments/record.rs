use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::id::Id;

/// A pending collection assignment as issued by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub assignment_id: Id,
    pub cluster_id: Id,
    pub date: String,
    pub time: String,
}

impl AssignmentRecord {
    /// Date and time combined, when both parse.
    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()?;
        let time = ["%H:%M:%S", "%H:%M", "%I:%M %p"]
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(self.time.trim(), format).ok())?;
        Some(date.and_time(time))
    }

    /// Human readable schedule, falling back to the raw strings.
    pub fn schedule_label(&self) -> String {
        match self.scheduled_at() {
            Some(at) => at.format("%a, %b %-d %Y at %-I:%M %p").to_string(),
            None => format!("{} {}", self.date, self.time).trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Confirmed,
    Declined,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Confirmed => "confirmed",
            ResponseStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "confirmed" | "confirm" | "accept" => Ok(ResponseStatus::Confirmed),
            "declined" | "decline" => Ok(ResponseStatus::Declined),
            other => Err(Error::Invalid(format!("Invalid response status: {other}"))),
        }
    }
}
