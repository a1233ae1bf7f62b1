use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dedup::EventKind;

/// Who recorded an event and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recorded {
    #[serde(with = "date_only")]
    pub date: Option<NaiveDate>,
    pub employee_id: String,
}

/// A behaviour incident recorded against a learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behaviour {
    pub id: String,
    pub activity_id: String,
    pub bullying_type_id: String,
    pub comments: String,
    #[serde(with = "date_only")]
    pub date: Option<NaiveDate>,
    pub involved_employee_ids: Vec<String>,
    pub location_id: String,
    pub lesson_information: String,
    pub points: i32,
    pub source: String,
    pub status_id: String,
    pub time_id: String,
    pub type_ids: Vec<String>,
    pub recorded: Recorded,
}

/// An achievement awarded to a learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Achievement {
    pub id: String,
    pub activity_id: String,
    #[serde(with = "date_only")]
    pub date: Option<NaiveDate>,
    pub comments: String,
    pub involved_employee_ids: Vec<String>,
    pub lesson_information: String,
    pub points: i32,
    pub source: String,
    pub type_ids: Vec<String>,
    pub recorded: Recorded,
}

/// Shared view over behaviour and achievement records.
pub trait Event {
    /// Which dedup set this event is tracked in.
    const KIND: EventKind;

    fn id(&self) -> &str;
    fn date(&self) -> Option<NaiveDate>;
    fn points(&self) -> i32;
    fn comments(&self) -> &str;
    fn type_ids(&self) -> &[String];
    fn involved_employee_ids(&self) -> &[String];
}

impl Event for Behaviour {
    const KIND: EventKind = EventKind::Behaviour;

    fn id(&self) -> &str {
        &self.id
    }
    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
    fn points(&self) -> i32 {
        self.points
    }
    fn comments(&self) -> &str {
        &self.comments
    }
    fn type_ids(&self) -> &[String] {
        &self.type_ids
    }
    fn involved_employee_ids(&self) -> &[String] {
        &self.involved_employee_ids
    }
}

impl Event for Achievement {
    const KIND: EventKind = EventKind::Achievement;

    fn id(&self) -> &str {
        &self.id
    }
    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
    fn points(&self) -> i32 {
        self.points
    }
    fn comments(&self) -> &str {
        &self.comments
    }
    fn type_ids(&self) -> &[String] {
        &self.type_ids
    }
    fn involved_employee_ids(&self) -> &[String] {
        &self.involved_employee_ids
    }
}

/// `YYYY-MM-DD` dates where the API sends `""` or `null` for "no date".
mod date_only {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format(FORMAT).to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") | Some("null") => Ok(None),
            // Some endpoints append a time; only the date part matters
            Some(value) => NaiveDate::parse_from_str(value.get(..10).unwrap_or(value), FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
