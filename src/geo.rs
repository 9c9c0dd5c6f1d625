use crate::error::{AgentError, Result};
use crate::structs::Coordinates;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};

/// Narrow seam over the geocoding provider so the map-pick flow does not care
/// which service answers.
#[async_trait]
pub trait Geocoder {
    /// Free-text address query to coordinates.
    async fn locate(&self, query: &str) -> Result<Coordinates>;
    /// Coordinates back to a human-readable address.
    async fn reverse_locate(&self, coords: Coordinates) -> Result<String>;
}

pub struct LocationIq {
    http: reqwest::Client,
    token: String,
}

impl LocationIq {
    pub fn new(token: String) -> Self {
        LocationIq {
            http: reqwest::Client::new(),
            token,
        }
    }

    // Query parameters go through the builder so free-text addresses with
    // `&` or `#` stay intact.
    pub(crate) fn search_request(&self, query: &str) -> reqwest::RequestBuilder {
        self.http.get("https://eu1.locationiq.com/v1/search").query(&[
            ("key", self.token.clone()),
            ("q", query.to_string()),
            ("format", "json".to_string()),
        ])
    }

    pub(crate) fn reverse_request(&self, coords: Coordinates) -> reqwest::RequestBuilder {
        self.http.get("https://eu1.locationiq.com/v1/reverse").query(&[
            ("key", self.token.clone()),
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("format", "json".to_string()),
        ])
    }

    async fn get_json(&self, builder: reqwest::RequestBuilder) -> Result<serde_json::Value> {
        let resp = builder
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "menager-agent/0.1")
            .send()
            .await?
            .text()
            .await?;
        Ok(serde_json::from_str(&resp)?)
    }
}

#[async_trait]
impl Geocoder for LocationIq {
    async fn locate(&self, query: &str) -> Result<Coordinates> {
        let json = self.get_json(self.search_request(query)).await?;

        let lat = json[0]["lat"].as_str().and_then(|s| s.parse::<f64>().ok());
        let lon = json[0]["lon"].as_str().and_then(|s| s.parse::<f64>().ok());
        match (lat, lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates { lat, lon }),
            _ => Err(AgentError::NoGeocodeResult(query.to_string())),
        }
    }

    async fn reverse_locate(&self, coords: Coordinates) -> Result<String> {
        let json = self.get_json(self.reverse_request(coords)).await?;

        let address = &json["address"];
        let street = address["road"].as_str().ok_or_else(|| {
            AgentError::NoGeocodeResult(format!("{}, {}", coords.lat, coords.lon))
        })?;

        let mut res = street.to_string();
        if let Some(house_number) = address["house_number"].as_str() {
            res = format!("{} {}", res, house_number);
        }
        if let Some(city) = address["city"].as_str() {
            res = format!("{}, {}", res, city);
        }
        Ok(res)
    }
}
