//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which adapter produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    Geoapify,
    Nominatim,
    Builtin,
    /// Synthesised from free text the user typed without picking a suggestion.
    Typed,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geoapify => write!(f, "Geoapify"),
            Self::Nominatim => write!(f, "Nominatim"),
            Self::Builtin => write!(f, "Built-in"),
            Self::Typed => write!(f, "Typed"),
        }
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}

/// A normalised geocoding result, whatever provider it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub city: String,
    #[serde(default)]
    pub street: Option<String>,
    /// Absent only for candidates synthesised from typed text.
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    /// Canonical display form; the input shows exactly this text once resolved.
    pub display_name: String,
    pub provider: Provider,
}

impl LocationCandidate {
    /// Candidate carrying nothing but the city name the user typed.
    pub fn typed(city: &str) -> Self {
        let city = city.trim().to_string();
        Self {
            display_name: city.clone(),
            city,
            street: None,
            coordinates: None,
            provider: Provider::Typed,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }

    pub fn display_line(&self) -> String {
        match &self.coordinates {
            Some(p) => format!("{} [{}] ({})", self.display_name, p, self.provider),
            None => format!("{} ({})", self.display_name, self.provider),
        }
    }
}

/// Provider-level failures. These stay inside the geocoding client:
/// the public search/reverse calls log them and degrade to empty results.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
    #[error("Location not found: '{0}'")]
    NotFound(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Query too short")]
    EmptyQuery,
}

/// One-shot device/IP position failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    Denied,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
    #[error("Location request timed out")]
    Timeout,
}
