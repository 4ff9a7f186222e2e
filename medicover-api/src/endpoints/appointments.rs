use super::{serialize_joined, NamedEntity};
use crate::dates::serialize_json_date;
use crate::macros::setter;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub const SEARCH_PATH: &str = "/appointments/api/search-appointments/slots";

const PAGE_SIZE: u32 = 5000;
const VISIT_TYPE_CENTER: &str = "Center";

// Common

/// Search criteria supplied once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub region: u64,
    pub specialty: BTreeSet<u64>,
    pub clinic: Option<u64>,
    pub start_date: NaiveDate,
    /// No upper bound when absent
    pub end_date: Option<NaiveDate>,
    pub language: Option<u64>,
    pub doctor: Option<u64>,
}

/// One free slot as returned by the search endpoint.
///
/// Every field is optional: the API is not consistent about what it fills in,
/// and anything not modelled here is kept in `extra`.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic: Option<NamedEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<NamedEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<NamedEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_languages: Option<Vec<NamedEntity>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Appointment {
    /// Local timestamp of the slot, if present and parseable
    pub fn appointment_datetime(&self) -> Option<NaiveDateTime> {
        let raw = self.appointment_date.as_deref()?;

        raw.parse::<NaiveDateTime>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
            .or_else(|| {
                raw.parse::<NaiveDate>()
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }

    pub fn appointment_day(&self) -> Option<NaiveDate> {
        self.appointment_datetime().map(|dt| dt.date())
    }

    pub fn clinic_name(&self) -> Option<&str> {
        self.clinic.as_ref().and_then(|c| c.name.as_deref())
    }

    pub fn doctor_name(&self) -> Option<&str> {
        self.doctor.as_ref().and_then(|d| d.name.as_deref())
    }

    pub fn specialty_name(&self) -> Option<&str> {
        self.specialty.as_ref().and_then(|s| s.name.as_deref())
    }

    /// Language names in the order the API lists them
    pub fn language_names(&self) -> Vec<&str> {
        self.doctor_languages
            .iter()
            .flatten()
            .filter_map(|language| language.name.as_deref())
            .collect()
    }
}

/// Keep records whose day falls within `[start, end]`, preserving order.
///
/// The search endpoint only understands a lower bound, so the upper bound is
/// applied here. Records without a readable date cannot be placed in the
/// window and are dropped.
pub fn filter_by_date_range(
    appointments: Vec<Appointment>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Appointment> {
    appointments
        .into_iter()
        .filter(|appointment| match appointment.appointment_day() {
            Some(day) => start <= day && day <= end,
            None => {
                tracing::debug!(
                    date = ?appointment.appointment_date,
                    "Dropping appointment without a readable date"
                );
                false
            }
        })
        .collect()
}

// Requests

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchAppointments {
    region_ids: u64,
    #[serde(
        serialize_with = "serialize_joined",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    specialty_ids: BTreeSet<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clinic_ids: Option<u64>,
    #[serde(serialize_with = "serialize_json_date")]
    start_time: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    doctor_language_ids: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doctor_ids: Option<u64>,
    page: u32,
    page_size: u32,
    slot_search_type: u8,
    visit_type: String,
}

impl SearchAppointments {
    pub fn new(region: u64, start_date: NaiveDate) -> Self {
        Self {
            region_ids: region,
            specialty_ids: BTreeSet::new(),
            clinic_ids: None,
            start_time: start_date,
            doctor_language_ids: None,
            doctor_ids: None,
            page: 1,
            page_size: PAGE_SIZE,
            slot_search_type: 0,
            visit_type: VISIT_TYPE_CENTER.to_string(),
        }
    }

    setter!(each specialty_ids: u64);
    setter!(opt clinic_ids: u64);
    setter!(opt doctor_language_ids: u64);
    setter!(opt doctor_ids: u64);
}

impl From<&FilterCriteria> for SearchAppointments {
    fn from(criteria: &FilterCriteria) -> Self {
        SearchAppointments::new(criteria.region, criteria.start_date)
            .specialty_ids(criteria.specialty.iter().copied())
            .clinic_ids(criteria.clinic)
            .doctor_language_ids(criteria.language)
            .doctor_ids(criteria.doctor)
    }
}

// Responses

/// Decode the `items` array of a search response, skipping records that do
/// not look like appointments. A missing array means no results.
pub fn parse_items(body: &Value) -> Vec<Appointment> {
    let Some(items) = body.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Appointment>(item.clone()) {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                tracing::warn!("Skipping malformed appointment record: {}", e);
                None
            }
        })
        .collect()
}
