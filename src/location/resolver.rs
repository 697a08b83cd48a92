//! Location search: orchestrates the provider fallback chain.
//!
//! Search flow:  Geoapify (if keyed) → Nominatim → built-in dataset → simplified-query retry → []
//! Reverse flow: Nominatim → nearest built-in city → None
//!
//! Provider failures never reach the caller; they are logged and the
//! next link of the chain is tried.

use super::providers::{
    BuiltinProvider, GeoapifyProvider, NominatimProvider, ReverseProvider, SearchProvider,
    UreqFetch,
};
use super::types::{GeoPoint, LocationCandidate, Provider};
use crate::config::Settings;
use std::sync::Arc;
use tracing::{debug, warn};

/// Queries shorter than this never reach a provider.
pub const MIN_QUERY_CHARS: usize = 2;

/// The geocoding client contract used by the booking session.
pub trait Geocoder: Send + Sync {
    /// Suggestions for `query`, in provider relevance order. Empty on
    /// short queries and on any provider failure.
    fn search(&self, query: &str) -> Vec<LocationCandidate>;

    /// Best place for `point`, or `None` if nothing could resolve it.
    fn reverse_geocode(&self, point: GeoPoint) -> Option<LocationCandidate>;
}

/// The geocoding client with its fallback pipeline.
pub struct LocationSearch {
    search_chain: Vec<Box<dyn SearchProvider>>,
    reverse_chain: Vec<Box<dyn ReverseProvider>>,
    limit: usize,
    offline: bool,
}

impl LocationSearch {
    /// An empty pipeline; add links with `with_search` / `with_reverse`.
    pub fn new(limit: usize) -> Self {
        Self {
            search_chain: Vec::new(),
            reverse_chain: Vec::new(),
            limit: limit.max(1),
            offline: false,
        }
    }

    pub fn with_search(mut self, provider: impl SearchProvider + 'static) -> Self {
        self.search_chain.push(Box::new(provider));
        self
    }

    pub fn with_reverse(mut self, provider: impl ReverseProvider + 'static) -> Self {
        self.reverse_chain.push(Box::new(provider));
        self
    }

    /// The standard chain for the configured providers.
    pub fn from_settings(settings: &Settings) -> Self {
        let fetch = Arc::new(UreqFetch::new(&settings.user_agent, settings.http_timeout()));
        let mut search = Self::new(settings.suggestion_limit);

        match settings.geoapify_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                search = search.with_search(GeoapifyProvider::new(
                    fetch.clone(),
                    &settings.geoapify_url,
                    key,
                    &settings.country,
                ));
            }
            _ => debug!("No Geoapify key configured; autocomplete starts at Nominatim"),
        }

        let mut search = search
            .with_search(NominatimProvider::new(fetch.clone(), &settings.nominatim_url, &settings.country))
            .with_search(BuiltinProvider::new())
            .with_reverse(NominatimProvider::new(fetch, &settings.nominatim_url, &settings.country))
            .with_reverse(BuiltinProvider::new());
        search.set_offline(settings.offline);
        search
    }

    /// Offline mode: only the built-in dataset is consulted.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn allowed(&self, provider: Provider) -> bool {
        !self.offline || provider == Provider::Builtin
    }

    fn run_chain(&self, query: &str) -> Vec<LocationCandidate> {
        for link in &self.search_chain {
            let provider = link.provider();
            if !self.allowed(provider) {
                continue;
            }
            match link.search(query, self.limit) {
                Ok(found) if !found.is_empty() => {
                    debug!(%provider, query, count = found.len(), "search hit");
                    return dedupe(found, self.limit);
                }
                Ok(_) => debug!(%provider, query, "search returned nothing"),
                Err(e) => warn!(%provider, query, error = %e, "search failed, trying next provider"),
            }
        }
        Vec::new()
    }
}

impl Geocoder for LocationSearch {
    fn search(&self, query: &str) -> Vec<LocationCandidate> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        let found = self.run_chain(query);
        if !found.is_empty() {
            return found;
        }

        // Retry once with diacritics stripped ("Ọ̀yọ́" → "oyo").
        let simplified = simplify_query(query);
        if simplified != query.to_lowercase() && simplified.chars().count() >= MIN_QUERY_CHARS {
            debug!(query, simplified = %simplified, "retrying with simplified query");
            return self.run_chain(&simplified);
        }
        Vec::new()
    }

    fn reverse_geocode(&self, point: GeoPoint) -> Option<LocationCandidate> {
        for link in &self.reverse_chain {
            let provider = link.provider();
            if !self.allowed(provider) {
                continue;
            }
            match link.reverse(point) {
                Ok(candidate) => return Some(candidate),
                Err(e) => warn!(%provider, %point, error = %e, "reverse geocode failed"),
            }
        }
        None
    }
}

/// Drop repeated display names, keep the first, cap at `limit`.
fn dedupe(found: Vec<LocationCandidate>, limit: usize) -> Vec<LocationCandidate> {
    let mut seen = std::collections::HashSet::new();
    found
        .into_iter()
        .filter(|c| seen.insert(c.display_name.to_lowercase()))
        .take(limit)
        .collect()
}

/// Simplify a query for retry: lowercase, strip diacritics, collapse spaces.
fn simplify_query(q: &str) -> String {
    q.to_lowercase()
        .chars()
        .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
            'é' | 'è' | 'ê' | 'ë' | 'ẹ' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ọ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ṣ' => 's',
            'ñ' | 'ń' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
