//! Take-off parks: the static terminal reference set.

use crate::fuzzy::{FuzzyMatcher, Key};
use crate::location::GeoPoint;
use serde::{Deserialize, Serialize};

struct BuiltinPark {
    name: &'static str,
    city: &'static str,
    address: &'static str,
    lat: f64,
    lon: f64,
}

const BUILTIN_PARKS: &[BuiltinPark] = &[
    BuiltinPark {
        name: "Ajah Motor Park", city: "Lagos",
        address: "No 1. Tinubu Avenue, Ajah Bustop",
        lat: 6.4682, lon: 3.5852,
    },
    BuiltinPark {
        name: "Ikeja Bus Terminal", city: "Lagos",
        address: "Obafemi Awolowo Way, Ikeja",
        lat: 6.6018, lon: 3.3515,
    },
    BuiltinPark {
        name: "Yaba Bus Terminal", city: "Lagos",
        address: "Murtala Muhammed Way, Yaba",
        lat: 6.5095, lon: 3.3715,
    },
    BuiltinPark {
        name: "Berger Motor Park", city: "Lagos",
        address: "Lagos-Ibadan Expressway, Berger",
        lat: 6.5833, lon: 3.3667,
    },
    BuiltinPark {
        name: "Mile 2 Motor Park", city: "Lagos",
        address: "Oshodi-Apapa Expressway, Mile 2",
        lat: 6.4833, lon: 3.3167,
    },
    BuiltinPark {
        name: "Kano Central Motor Park", city: "Kano",
        address: "Katsina Road, Kano",
        lat: 12.0022, lon: 8.5919,
    },
    BuiltinPark {
        name: "Abuja Motor Park", city: "Abuja",
        address: "Nyanya, Abuja",
        lat: 9.0765, lon: 7.4165,
    },
    BuiltinPark {
        name: "Port Harcourt Motor Park", city: "Port Harcourt",
        address: "Mile 3 Diobu, Port Harcourt",
        lat: 4.8156, lon: 7.0498,
    },
    BuiltinPark {
        name: "Ibadan Central Motor Park", city: "Ibadan",
        address: "Challenge, Ibadan",
        lat: 7.3775, lon: 3.947,
    },
    BuiltinPark {
        name: "Kaduna Motor Park", city: "Kaduna",
        address: "Kawo, Kaduna",
        lat: 10.5105, lon: 7.4165,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Park {
    pub name: String,
    pub city: String,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

impl Park {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// A park with its distance from the current reference location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPark {
    #[serde(flatten)]
    pub park: Park,
    pub distance_km: f64,
}

/// The full park list, in reference order.
pub fn builtin_parks() -> Vec<Park> {
    BUILTIN_PARKS
        .iter()
        .map(|p| Park {
            name: p.name.to_string(),
            city: p.city.to_string(),
            address: p.address.to_string(),
            lat: p.lat,
            lon: p.lon,
        })
        .collect()
}

/// Case-insensitive lookup by park name.
pub fn find_park<'a>(parks: &'a [Park], name: &str) -> Option<&'a Park> {
    let name = name.trim();
    parks.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

fn park_name(p: &Park) -> &str {
    &p.name
}

fn park_address(p: &Park) -> &str {
    &p.address
}

fn park_city(p: &Park) -> &str {
    &p.city
}

/// Fuzzy matcher over park name, address and city.
pub fn park_matcher() -> FuzzyMatcher<Park> {
    FuzzyMatcher::new(vec![park_name as Key<Park>, park_address, park_city])
}

/// Search parks for the "change park" picker.
pub fn search_parks<'a>(query: &str, parks: &'a [Park]) -> Vec<&'a Park> {
    park_matcher().matches(query, parks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_set() {
        let parks = builtin_parks();
        assert_eq!(parks.len(), 10);
        assert!(parks.iter().all(|p| (-90.0..=90.0).contains(&p.lat)));
        assert!(parks.iter().all(|p| (-180.0..=180.0).contains(&p.lon)));
    }

    #[test]
    fn test_empty_query_returns_first_ten_unranked() {
        let parks = builtin_parks();
        let found = search_parks("", &parks);
        assert_eq!(found.len(), 10);
        for (found, expected) in found.iter().zip(parks.iter()) {
            assert_eq!(found.name, expected.name);
        }
    }

    #[test]
    fn test_search_by_city() {
        let parks = builtin_parks();
        let found = search_parks("ibadan", &parks);
        assert_eq!(found[0].name, "Ibadan Central Motor Park");
    }

    #[test]
    fn test_search_by_address_with_typo() {
        let parks = builtin_parks();
        let found = search_parks("Nyanyaa", &parks);
        assert_eq!(found[0].name, "Abuja Motor Park");
    }

    #[test]
    fn test_find_park_case_insensitive() {
        let parks = builtin_parks();
        assert!(find_park(&parks, "yaba bus terminal").is_some());
        assert!(find_park(&parks, "Nowhere Park").is_none());
    }

    #[test]
    fn test_ranked_park_serializes_flat() {
        let park = builtin_parks().remove(0);
        let ranked = RankedPark { park, distance_km: 1.5 };
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json["name"], "Ajah Motor Park");
        assert_eq!(json["distance_km"], 1.5);
    }
}
