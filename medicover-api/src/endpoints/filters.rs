use crate::macros::setter;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

pub const FILTERS_PATH: &str = "/appointments/api/search-appointments/filters";

// Common

/// Which list of the filter-metadata response to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Regions,
    Specialties,
    Clinics,
    Doctors,
    Languages,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        FilterKind::Regions,
        FilterKind::Specialties,
        FilterKind::Clinics,
        FilterKind::Doctors,
        FilterKind::Languages,
    ];

    /// Key of the list in the response body
    pub fn key(&self) -> &'static str {
        match self {
            Self::Regions => "regions",
            Self::Specialties => "specialties",
            Self::Clinics => "clinics",
            Self::Doctors => "doctors",
            Self::Languages => "languages",
        }
    }
}

impl Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown filter kind '{}': expected one of regions, specialties, clinics, doctors, languages",
                    s
                )
            })
    }
}

/// One selectable entry of a filter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub id: String,
    pub value: String,
}

impl Display for FilterOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.id, self.value)
    }
}

/// Pull the entries of one filter list out of a raw filter-metadata body.
/// Entries carry their label in `value`; `name` is accepted as a fallback.
pub fn filter_options(metadata: &Value, kind: FilterKind) -> Vec<FilterOption> {
    let Some(entries) = metadata.get(kind.key()).and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = match entry.get("id")? {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            };
            let value = entry
                .get("value")
                .or_else(|| entry.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("N/A")
                .to_string();
            Some(FilterOption { id, value })
        })
        .collect()
}

// Requests

#[derive(Default, Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    region_ids: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    specialty_ids: Option<u64>,
    slot_search_type: u8,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(opt region_ids: u64);
    setter!(opt specialty_ids: u64);
}
