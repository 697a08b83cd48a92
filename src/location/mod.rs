//! Geocoding subsystem.
//!
//! Resolution order for suggestions:
//! 1. Geoapify autocomplete (only with an API key)
//! 2. Nominatim free-text search
//! 3. Built-in Nigerian city dataset (offline fallback)
//!
//! Reverse geocoding goes Nominatim first, then the nearest built-in city.

pub mod providers;
pub mod resolver;
pub mod types;

pub use providers::{
    builtin_city_list, destination_cities, CityInfo, FixedLocator, Geolocator, HttpFetch,
    IpApiLocator, UreqFetch,
};
pub use resolver::{Geocoder, LocationSearch};
pub use types::{GeoPoint, GeolocationError, LocationCandidate, LocationError, Provider};
