//! Where the widget gets its coordinates from.
//!
//! A terminal host has no built-in geolocation prompt, so the capability is
//! modelled as a trait with three hosts: fixed coordinates, an IP lookup
//! gated on recorded consent, and a host with no capability at all.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};
use tracing::debug;

use crate::{
    config::{LocationConfig, LocationSource},
    error::LocateError,
    model::Coordinates,
};

pub const DEFAULT_LOOKUP_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait LocationResolver: Send + Sync + Debug {
    /// Ask the host for its current position once.
    async fn current_position(&self) -> Result<Coordinates, LocateError>;
}

/// Coordinates handed in up front.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationResolver for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocateError> {
        Ok(self.0)
    }
}

/// Host without any location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationResolver for NoLocation {
    async fn current_position(&self) -> Result<Coordinates, LocateError> {
        Err(LocateError::CapabilityUnavailable)
    }
}

/// Approximate position from the public IP address.
#[derive(Debug, Clone)]
pub struct IpLocation {
    http: Client,
    endpoint: String,
    consent: bool,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpLocation {
    pub fn new(endpoint: impl Into<String>, consent: bool) -> Self {
        // Builder only fails when the TLS backend cannot initialise.
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { http, endpoint: endpoint.into(), consent }
    }
}

#[async_trait]
impl LocationResolver for IpLocation {
    async fn current_position(&self) -> Result<Coordinates, LocateError> {
        if !self.consent {
            debug!("IP location lookup not permitted");
            return Err(LocateError::PermissionDenied);
        }

        let res = self.http.get(&self.endpoint).send().await.map_err(|e| {
            debug!("IP location lookup failed: {e}");
            LocateError::CapabilityUnavailable
        })?;

        if !res.status().is_success() {
            debug!(status = %res.status(), "IP location lookup rejected");
            return Err(LocateError::CapabilityUnavailable);
        }

        let parsed: IpApiResponse = res.json().await.map_err(|e| {
            debug!("IP location response unreadable: {e}");
            LocateError::CapabilityUnavailable
        })?;

        match parsed {
            IpApiResponse { status, lat: Some(lat), lon: Some(lon), .. } if status == "success" => {
                debug!(lat, lon, "resolved position from IP");
                Ok(Coordinates::new(lat, lon))
            }
            IpApiResponse { status, message, .. } => {
                debug!(%status, message = message.as_deref().unwrap_or(""), "IP location unknown");
                Err(LocateError::CapabilityUnavailable)
            }
        }
    }
}

/// Pick the resolver the `[location]` section asks for.
pub fn resolver_from_config(config: &LocationConfig) -> Box<dyn LocationResolver> {
    match config.source {
        LocationSource::Fixed => match (config.latitude, config.longitude) {
            (Some(lat), Some(lon)) => Box::new(FixedLocation(Coordinates::new(lat, lon))),
            _ => Box::new(NoLocation),
        },
        LocationSource::Ip => Box::new(IpLocation::new(
            config.lookup_url.clone(),
            config.consent.unwrap_or(false),
        )),
        LocationSource::None => Box::new(NoLocation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_location_always_succeeds() {
        let at = Coordinates::new(48.85, 2.35);
        assert_eq!(FixedLocation(at).current_position().await, Ok(at));
    }

    #[tokio::test]
    async fn no_location_is_unavailable() {
        assert_eq!(NoLocation.current_position().await, Err(LocateError::CapabilityUnavailable));
    }

    #[tokio::test]
    async fn ip_lookup_without_consent_is_denied() {
        // Unroutable endpoint: the request must never be attempted.
        let resolver = IpLocation::new("http://127.0.0.1:9/", false);
        assert_eq!(resolver.current_position().await, Err(LocateError::PermissionDenied));
    }

    #[tokio::test]
    async fn unset_consent_from_config_is_denied() {
        let resolver = resolver_from_config(&LocationConfig::default());
        assert_eq!(resolver.current_position().await, Err(LocateError::PermissionDenied));
    }

    #[tokio::test]
    async fn fixed_source_without_coordinates_is_unavailable() {
        let cfg = LocationConfig {
            source: LocationSource::Fixed,
            latitude: Some(1.0),
            ..LocationConfig::default()
        };
        let resolver = resolver_from_config(&cfg);
        assert_eq!(resolver.current_position().await, Err(LocateError::CapabilityUnavailable));
    }

    #[tokio::test]
    async fn fixed_source_uses_configured_coordinates() {
        let cfg = LocationConfig {
            source: LocationSource::Fixed,
            latitude: Some(-33.87),
            longitude: Some(151.21),
            ..LocationConfig::default()
        };
        let resolver = resolver_from_config(&cfg);
        assert_eq!(resolver.current_position().await, Ok(Coordinates::new(-33.87, 151.21)));
    }
}
