// SPDX-License-Identifier: MPL-2.0

//! Free-text location search for post location labels (Nominatim).

use crate::config::USER_AGENT;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_LIMIT: u32 = 5;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid geocoder url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("geocoder returned HTTP {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub display_name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Raw search hit; Nominatim encodes coordinates as strings.
#[derive(Deserialize)]
struct SearchHit {
    display_name: String,
    lat: String,
    lon: String,
}

pub struct NominatimClient {
    http: reqwest::Client,
    base: Url,
    limit: u32,
}

impl NominatimClient {
    pub fn new(base_url: &str, limit: u32) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base: Url::parse(base_url)?,
            limit,
        })
    }

    pub fn search_url(&self, query: &str) -> Result<Url, GeocodeError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty().push("search");
        }
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", &self.limit.to_string());
        Ok(url)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodeError> {
        let url = self.search_url(query)?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        parse_places(&body)
    }
}

/// Parse a search response, dropping hits whose coordinates are not numbers.
pub fn parse_places(body: &str) -> Result<Vec<Place>, GeocodeError> {
    let hits: Vec<SearchHit> = serde_json::from_str(body)?;
    Ok(hits
        .into_iter()
        .filter_map(|hit| {
            let lat = hit.lat.parse().ok()?;
            let lon = hit.lon.parse().ok()?;
            Some(Place {
                display_name: hit.display_name,
                lat,
                lon,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_has_query_and_limit() {
        let client = NominatimClient::new("https://nominatim.example.org", 5).unwrap();
        let url = client.search_url("Tel Aviv").unwrap();
        assert_eq!(
            url.as_str(),
            "https://nominatim.example.org/search?q=Tel+Aviv&format=json&limit=5"
        );
    }

    #[test]
    fn search_url_appends_to_base_path() {
        let client = NominatimClient::new("https://example.org/nominatim/", 3).unwrap();
        let url = client.search_url("x").unwrap();
        assert_eq!(url.path(), "/nominatim/search");
    }

    #[test]
    fn parses_string_coordinates_and_skips_bad_hits() {
        let body = r#"[
            {"place_id": 1, "display_name": "Haifa, Israel", "lat": "32.8191", "lon": "34.9983"},
            {"place_id": 2, "display_name": "Broken", "lat": "north", "lon": "1.0"}
        ]"#;
        let places = parse_places(body).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].display_name, "Haifa, Israel");
        assert!((places[0].lat - 32.8191).abs() < 1e-9);
    }

    #[test]
    fn non_array_response_is_invalid() {
        assert!(matches!(
            parse_places(r#"{"error": "bad"}"#),
            Err(GeocodeError::InvalidResponse(_))
        ));
    }
}
