//! Nominatim adapter (geocoding).
//!
//! Uses the OpenStreetMap Nominatim `search` endpoint. Every failure collapses
//! to `None`; the distinction between "no match" and "provider unavailable"
//! only shows up in the logs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use mapbot_core::{domain::Coordinates, errors::Error, geocode::Geocoder, Result};

#[derive(Clone, Debug)]
pub struct NominatimGeocoder {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Why a lookup produced no coordinates.
#[derive(Debug)]
enum Miss {
    NoMatch,
    Unavailable(String),
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::External(format!("nominatim client build error: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn lookup(
        &self,
        name: &str,
        timeout: Duration,
    ) -> std::result::Result<Coordinates, Miss> {
        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", name), ("format", "json"), ("limit", "1")])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Miss::Unavailable(format!("request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Miss::Unavailable(format!("status {status}")));
        }

        let places: Vec<Place> = resp
            .json()
            .await
            .map_err(|e| Miss::Unavailable(format!("json error: {e}")))?;

        let place = places.into_iter().next().ok_or(Miss::NoMatch)?;
        parse_place(&place).ok_or_else(|| {
            Miss::Unavailable(format!("unparseable coordinates {}/{}", place.lat, place.lon))
        })
    }
}

fn parse_place(place: &Place) -> Option<Coordinates> {
    let lat = place.lat.trim().parse::<f64>().ok()?;
    let lon = place.lon.trim().parse::<f64>().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some(Coordinates::new(lat, lon))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, name: &str, timeout: Duration) -> Option<Coordinates> {
        match self.lookup(name, timeout).await {
            Ok(c) => Some(c),
            Err(Miss::NoMatch) => {
                debug!(query = name, "nominatim: no match");
                None
            }
            Err(Miss::Unavailable(reason)) => {
                warn!(query = name, "nominatim unavailable: {reason}");
                None
            }
        }
    }
}
