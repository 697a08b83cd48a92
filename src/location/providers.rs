//! Location providers: Geoapify autocomplete, Nominatim, IP geolocation,
//! and the built-in Nigerian city dataset.
//!
//! Each HTTP provider is an adapter that turns its own JSON shape into
//! [`LocationCandidate`]s. Adapters return `Result`; the resolver decides
//! what a failure means for the caller.

use super::types::{GeoPoint, GeolocationError, LocationCandidate, LocationError, Provider};
use crate::distance;
use crate::fuzzy::{FuzzyMatcher, Key};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ─── HTTP seam ──────────────────────────────────────────────────

/// Minimal GET-a-body interface so adapters can be fed canned responses.
pub trait HttpFetch: Send + Sync {
    fn get(&self, url: &str) -> Result<String, LocationError>;
}

impl<T: HttpFetch + ?Sized> HttpFetch for Arc<T> {
    fn get(&self, url: &str) -> Result<String, LocationError> {
        (**self).get(url)
    }
}

/// Blocking HTTP client backed by a shared `ureq` agent.
pub struct UreqFetch {
    agent: ureq::Agent,
    user_agent: String,
}

impl UreqFetch {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            user_agent: user_agent.to_string(),
        }
    }
}

impl HttpFetch for UreqFetch {
    fn get(&self, url: &str) -> Result<String, LocationError> {
        let response = self
            .agent
            .get(url)
            .set("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => LocationError::Network(format!("HTTP {}", code)),
                ureq::Error::Transport(t) => {
                    let timed_out = std::error::Error::source(&t)
                        .and_then(|s| s.downcast_ref::<std::io::Error>())
                        .map(|io| {
                            matches!(
                                io.kind(),
                                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                            )
                        })
                        .unwrap_or(false);
                    if timed_out {
                        LocationError::Timeout
                    } else {
                        LocationError::Network(t.to_string())
                    }
                }
            })?;

        response
            .into_string()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))
    }
}

// ─── Adapter traits ─────────────────────────────────────────────

/// Forward search: free text to ordered candidates.
pub trait SearchProvider: Send + Sync {
    fn provider(&self) -> Provider;
    fn search(&self, query: &str, limit: usize) -> Result<Vec<LocationCandidate>, LocationError>;
}

/// Reverse geocoding: coordinates to a single candidate.
pub trait ReverseProvider: Send + Sync {
    fn provider(&self) -> Provider;
    fn reverse(&self, point: GeoPoint) -> Result<LocationCandidate, LocationError>;
}

/// One-shot "where am I" lookup.
pub trait Geolocator: Send + Sync {
    fn current_position(&self) -> Result<GeoPoint, GeolocationError>;
}

// ─── Shared address normalisation ───────────────────────────────

/// Address components as both providers name them.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AddressParts {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub state_district: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub road: Option<String>,
}

impl AddressParts {
    /// City name, falling back through smaller settlements to the state.
    pub fn city(&self) -> Option<String> {
        [
            &self.city,
            &self.town,
            &self.village,
            &self.state_district,
            &self.state,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
    }

    pub fn street(&self) -> Option<String> {
        self.street
            .as_deref()
            .or(self.road.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

fn point_from(lat: f64, lon: f64) -> Option<GeoPoint> {
    distance::validate(GeoPoint::new(lat, lon)).ok()
}

fn parse_point(lat: &str, lon: &str) -> Option<GeoPoint> {
    point_from(lat.trim().parse().ok()?, lon.trim().parse().ok()?)
}

// ─── Geoapify (keyed autocomplete) ──────────────────────────────

#[derive(Deserialize, Debug)]
struct GeoapifyResponse {
    #[serde(default)]
    results: Vec<GeoapifyResult>,
}

#[derive(Deserialize, Debug)]
struct GeoapifyResult {
    #[serde(flatten)]
    address: AddressParts,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    formatted: Option<String>,
}

impl GeoapifyResult {
    fn into_candidate(self) -> Option<LocationCandidate> {
        let city = self.address.city()?;
        let coordinates = point_from(self.lat?, self.lon?)?;
        let street = self.address.street();
        let display_name = self
            .formatted
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| match &street {
                Some(st) => format!("{}, {}", st, city),
                None => city.clone(),
            });
        Some(LocationCandidate {
            city,
            street,
            coordinates: Some(coordinates),
            display_name,
            provider: Provider::Geoapify,
        })
    }
}

/// Structured city/street autocomplete. Needs an API key.
pub struct GeoapifyProvider<F> {
    fetch: F,
    base_url: String,
    api_key: String,
    country: String,
}

impl<F: HttpFetch> GeoapifyProvider<F> {
    pub fn new(fetch: F, base_url: &str, api_key: &str, country: &str) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            country: country.to_lowercase(),
        }
    }

    fn parse(body: &str) -> Result<Vec<LocationCandidate>, LocationError> {
        let response: GeoapifyResponse =
            serde_json::from_str(body).map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
        Ok(response
            .results
            .into_iter()
            .filter_map(GeoapifyResult::into_candidate)
            .collect())
    }
}

impl<F: HttpFetch> SearchProvider for GeoapifyProvider<F> {
    fn provider(&self) -> Provider {
        Provider::Geoapify
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<LocationCandidate>, LocationError> {
        let url = format!(
            "{}/v1/geocode/autocomplete?text={}&filter=countrycode:{}&limit={}&format=json&apiKey={}",
            self.base_url,
            urlencode(query),
            urlencode(&self.country),
            limit.clamp(1, 20),
            urlencode(&self.api_key),
        );
        Self::parse(&self.fetch.get(&url)?)
    }
}

// ─── Nominatim (free-text search + reverse) ─────────────────────

#[derive(Deserialize, Debug, Clone)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
    #[serde(default)]
    pub address: AddressParts,
}

impl NominatimPlace {
    fn into_candidate(self) -> Option<LocationCandidate> {
        let coordinates = parse_point(&self.lat, &self.lon)?;
        // Free-text results may carry no address block; the first
        // display component is the best remaining guess at a city.
        let city = self.address.city().or_else(|| {
            self.display_name
                .split(',')
                .map(str::trim)
                .find(|s| !s.is_empty())
                .map(str::to_string)
        })?;
        Some(LocationCandidate {
            city,
            street: self.address.street(),
            coordinates: Some(coordinates),
            display_name: self.display_name,
            provider: Provider::Nominatim,
        })
    }
}

/// OpenStreetMap Nominatim. Free, no key.
pub struct NominatimProvider<F> {
    fetch: F,
    base_url: String,
    country: String,
}

impl<F: HttpFetch> NominatimProvider<F> {
    pub fn new(fetch: F, base_url: &str, country: &str) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/').to_string(),
            country: country.to_lowercase(),
        }
    }

    fn parse_search(body: &str) -> Result<Vec<LocationCandidate>, LocationError> {
        let places: Vec<NominatimPlace> =
            serde_json::from_str(body).map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
        Ok(places.into_iter().filter_map(NominatimPlace::into_candidate).collect())
    }

    fn parse_reverse(body: &str, point: GeoPoint) -> Result<LocationCandidate, LocationError> {
        let val: serde_json::Value =
            serde_json::from_str(body).map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
        if let Some(msg) = val.get("error").and_then(|v| v.as_str()) {
            return Err(LocationError::NotFound(format!("{} ({})", point, msg)));
        }
        let place: NominatimPlace =
            serde_json::from_value(val).map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
        place
            .into_candidate()
            .ok_or_else(|| LocationError::InvalidResponse("no usable city or coordinates".into()))
    }
}

impl<F: HttpFetch> SearchProvider for NominatimProvider<F> {
    fn provider(&self) -> Provider {
        Provider::Nominatim
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<LocationCandidate>, LocationError> {
        let url = format!(
            "{}/search?q={}&format=json&addressdetails=1&countrycodes={}&limit={}",
            self.base_url,
            urlencode(query),
            urlencode(&self.country),
            limit.clamp(1, 20),
        );
        Self::parse_search(&self.fetch.get(&url)?)
    }
}

impl<F: HttpFetch> ReverseProvider for NominatimProvider<F> {
    fn provider(&self) -> Provider {
        Provider::Nominatim
    }

    fn reverse(&self, point: GeoPoint) -> Result<LocationCandidate, LocationError> {
        let url = format!(
            "{}/reverse?format=json&lat={}&lon={}&zoom=18&addressdetails=1",
            self.base_url, point.lat, point.lon,
        );
        Self::parse_reverse(&self.fetch.get(&url)?, point)
    }
}

// ─── IP-based geolocation ───────────────────────────────────────

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
}

/// Approximate position from the caller's public IP.
pub struct IpApiLocator<F> {
    fetch: F,
    url: String,
}

impl<F: HttpFetch> IpApiLocator<F> {
    pub fn new(fetch: F, url: &str) -> Self {
        Self { fetch, url: url.to_string() }
    }
}

impl<F: HttpFetch> Geolocator for IpApiLocator<F> {
    fn current_position(&self) -> Result<GeoPoint, GeolocationError> {
        let body = self.fetch.get(&self.url).map_err(|e| match e {
            LocationError::Timeout => GeolocationError::Timeout,
            other => GeolocationError::Unavailable(other.to_string()),
        })?;
        let r: IpApiResult = serde_json::from_str(&body)
            .map_err(|e| GeolocationError::Unavailable(e.to_string()))?;
        if r.error.unwrap_or(false) {
            let reason = r.reason.unwrap_or_else(|| "lookup refused".into());
            return Err(GeolocationError::Unavailable(reason));
        }
        match (r.latitude, r.longitude) {
            (Some(lat), Some(lon)) => point_from(lat, lon)
                .ok_or_else(|| GeolocationError::Unavailable("coordinates out of range".into())),
            _ => Err(GeolocationError::Unavailable("no coordinates".into())),
        }
    }
}

/// A position supplied up front (e.g. from the command line).
pub struct FixedLocator(pub GeoPoint);

impl Geolocator for FixedLocator {
    fn current_position(&self) -> Result<GeoPoint, GeolocationError> {
        point_from(self.0.lat, self.0.lon)
            .ok_or_else(|| GeolocationError::Unavailable("coordinates out of range".into()))
    }
}

// ─── Built-in dataset ───────────────────────────────────────────

struct BuiltinCity {
    name: &'static str,
    state: &'static str,
    lat: f64,
    lon: f64,
}

const BUILTIN_CITIES: &[BuiltinCity] = &[
    BuiltinCity { name: "Lagos", state: "Lagos", lat: 6.5244, lon: 3.3792 },
    BuiltinCity { name: "Abuja", state: "Federal Capital Territory", lat: 9.0765, lon: 7.3986 },
    BuiltinCity { name: "Kano", state: "Kano", lat: 12.0022, lon: 8.5920 },
    BuiltinCity { name: "Ibadan", state: "Oyo", lat: 7.3775, lon: 3.9470 },
    BuiltinCity { name: "Port Harcourt", state: "Rivers", lat: 4.8156, lon: 7.0498 },
    BuiltinCity { name: "Benin City", state: "Edo", lat: 6.3350, lon: 5.6037 },
    BuiltinCity { name: "Kaduna", state: "Kaduna", lat: 10.5105, lon: 7.4165 },
    BuiltinCity { name: "Enugu", state: "Enugu", lat: 6.4584, lon: 7.5464 },
    BuiltinCity { name: "Aba", state: "Abia", lat: 5.1066, lon: 7.3667 },
    BuiltinCity { name: "Onitsha", state: "Anambra", lat: 6.1498, lon: 6.7857 },
    BuiltinCity { name: "Jos", state: "Plateau", lat: 9.8965, lon: 8.8583 },
    BuiltinCity { name: "Ilorin", state: "Kwara", lat: 8.4966, lon: 4.5426 },
    BuiltinCity { name: "Owerri", state: "Imo", lat: 5.4840, lon: 7.0351 },
    BuiltinCity { name: "Calabar", state: "Cross River", lat: 4.9757, lon: 8.3417 },
    BuiltinCity { name: "Warri", state: "Delta", lat: 5.5167, lon: 5.7500 },
    BuiltinCity { name: "Abeokuta", state: "Ogun", lat: 7.1475, lon: 3.3619 },
    BuiltinCity { name: "Akure", state: "Ondo", lat: 7.2571, lon: 5.2058 },
    BuiltinCity { name: "Uyo", state: "Akwa Ibom", lat: 5.0377, lon: 7.9128 },
    BuiltinCity { name: "Maiduguri", state: "Borno", lat: 11.8311, lon: 13.1510 },
    BuiltinCity { name: "Sokoto", state: "Sokoto", lat: 13.0059, lon: 5.2476 },
    BuiltinCity { name: "Zaria", state: "Kaduna", lat: 11.0855, lon: 7.7199 },
    BuiltinCity { name: "Osogbo", state: "Osun", lat: 7.7827, lon: 4.5418 },
    BuiltinCity { name: "Asaba", state: "Delta", lat: 6.1985, lon: 6.7319 },
    BuiltinCity { name: "Makurdi", state: "Benue", lat: 7.7337, lon: 8.5214 },
    BuiltinCity { name: "Yola", state: "Adamawa", lat: 9.2035, lon: 12.4954 },
];

/// Reverse lookups farther than this from every built-in city fail.
const BUILTIN_REVERSE_RADIUS_KM: f64 = 60.0;

/// A city entry for the public city list API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityInfo {
    pub name: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
}

impl CityInfo {
    pub fn to_candidate(&self) -> LocationCandidate {
        LocationCandidate {
            city: self.name.clone(),
            street: None,
            coordinates: Some(GeoPoint::new(self.lat, self.lon)),
            display_name: format!("{}, {}, Nigeria", self.name, self.state),
            provider: Provider::Builtin,
        }
    }
}

/// Return the full built-in city list (for autocomplete / API).
pub fn builtin_city_list() -> Vec<CityInfo> {
    BUILTIN_CITIES
        .iter()
        .map(|c| CityInfo {
            name: c.name.to_string(),
            state: c.state.to_string(),
            lat: c.lat,
            lon: c.lon,
        })
        .collect()
}

fn city_name(c: &CityInfo) -> &str {
    &c.name
}

fn city_state(c: &CityInfo) -> &str {
    &c.state
}

/// Destination-city suggestions: fuzzy on the city name only.
pub fn destination_cities(query: &str) -> Vec<CityInfo> {
    let cities = builtin_city_list();
    FuzzyMatcher::new(vec![city_name as Key<CityInfo>])
        .matches(query, &cities)
        .into_iter()
        .cloned()
        .collect()
}

/// Offline provider over the built-in dataset. Always the last link of
/// the resolver chain.
#[derive(Default)]
pub struct BuiltinProvider {
    cities: Vec<CityInfo>,
}

impl BuiltinProvider {
    pub fn new() -> Self {
        Self { cities: builtin_city_list() }
    }
}

impl SearchProvider for BuiltinProvider {
    fn provider(&self) -> Provider {
        Provider::Builtin
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<LocationCandidate>, LocationError> {
        if query.trim().is_empty() {
            return Err(LocationError::EmptyQuery);
        }
        let found: Vec<LocationCandidate> = FuzzyMatcher::new(vec![city_name as Key<CityInfo>, city_state])
            .matches(query, &self.cities)
            .into_iter()
            .take(limit)
            .map(CityInfo::to_candidate)
            .collect();
        if found.is_empty() {
            return Err(LocationError::NotFound(query.to_string()));
        }
        Ok(found)
    }
}

impl ReverseProvider for BuiltinProvider {
    fn provider(&self) -> Provider {
        Provider::Builtin
    }

    fn reverse(&self, point: GeoPoint) -> Result<LocationCandidate, LocationError> {
        let mut best: Option<(&CityInfo, f64)> = None;
        for city in &self.cities {
            let d = distance::distance(point, GeoPoint::new(city.lat, city.lon))
                .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((city, d));
            }
        }
        match best {
            Some((city, d)) if d <= BUILTIN_REVERSE_RADIUS_KM => Ok(city.to_candidate()),
            _ => Err(LocationError::NotFound(point.to_string())),
        }
    }
}

// ─── URL encoding (minimal, no extra dep) ───────────────────────

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b' ' => out.push_str("%20"),
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
