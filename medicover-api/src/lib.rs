mod dates;
pub mod endpoints;
mod macros;

pub use crate::dates::{json_date, SerializationError, DATETIME_FORMAT, DATE_FORMAT};
use endpoints::appointments::{self, Appointment, FilterCriteria, SearchAppointments};
use endpoints::filters::{self, SearchFilters};
use medichaser_auth::Session;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const BASE_URL: &str = "https://api-gateway-online24.medicover.pl";

/// `[api]` section of the application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    BASE_URL.to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ApiSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("api.base_url is required".to_string());
        }
        if !self.base_url.starts_with("http") {
            return Err("api.base_url must be a valid HTTP(S) URL".to_string());
        }
        Ok(())
    }
}

/// Queries the appointment search and filter-metadata endpoints.
///
/// Holds a clone of the authenticator's [`Session`], so requests always carry
/// whatever bearer token was installed most recently.
#[derive(Debug, Clone)]
pub struct AppointmentFinder {
    session: Session,
    base_url: String,
}

impl AppointmentFinder {
    pub fn new(session: Session, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Authenticated GET returning the JSON body.
    ///
    /// Never fails: any non-200 answer, transport error or undecodable body is
    /// logged and comes back as an empty object, which callers read as "no
    /// data this cycle".
    pub async fn http_get<Q>(&self, url: &str, params: &Q) -> Value
    where
        Q: Serialize + ?Sized,
    {
        let response = match self
            .session
            .client()
            .get(url)
            .headers(self.session.headers())
            .query(params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Request to {} failed: {}", url, e);
                return empty_body();
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Error {}: {}", status.as_u16(), body);
            return empty_body();
        }

        match response.json::<Value>().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Invalid JSON from {}: {}", url, e);
                empty_body()
            }
        }
    }

    /// Search for free slots matching `criteria`, in the order the API
    /// returns them.
    pub async fn find_appointments(&self, criteria: &FilterCriteria) -> Vec<Appointment> {
        let url = format!("{}{}", self.base_url, appointments::SEARCH_PATH);
        let request = SearchAppointments::from(criteria);

        let body = self.http_get(&url, &request).await;
        let found = appointments::parse_items(&body);
        tracing::debug!(count = found.len(), "Search returned appointments");

        match criteria.end_date {
            Some(end_date) => {
                appointments::filter_by_date_range(found, criteria.start_date, end_date)
            }
            None => found,
        }
    }

    /// Raw filter metadata (regions, specialties, clinics, ...) for
    /// interactive discovery
    pub async fn find_filters(&self, region: Option<u64>, specialty: Option<u64>) -> Value {
        let url = format!("{}{}", self.base_url, filters::FILTERS_PATH);

        let request = SearchFilters::new()
            .region_ids(region)
            .specialty_ids(specialty);

        self.http_get(&url, &request).await
    }
}

fn empty_body() -> Value {
    Value::Object(Map::new())
}
