//! Great-circle distance and nearest-park ranking.

use crate::location::GeoPoint;
use crate::parks::{Park, RankedPark};
use thiserror::Error;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Which coordinate failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coord {
    Lat1,
    Lon1,
    Lat2,
    Lon2,
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Lat1 => "lat1",
            Self::Lon1 => "lon1",
            Self::Lat2 => "lat2",
            Self::Lon2 => "lon2",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistanceError {
    #[error("Invalid coordinates: {0} must be a finite number")]
    NonFinite(Coord),
    #[error("Invalid coordinates: {coord} = {value} is out of range")]
    OutOfRange { coord: Coord, value: f64 },
}

fn check(value: f64, limit: f64, coord: Coord) -> Result<(), DistanceError> {
    if !value.is_finite() {
        return Err(DistanceError::NonFinite(coord));
    }
    if !(-limit..=limit).contains(&value) {
        return Err(DistanceError::OutOfRange { coord, value });
    }
    Ok(())
}

/// Validate a point as the origin of a distance query.
pub fn validate(point: GeoPoint) -> Result<GeoPoint, DistanceError> {
    check(point.lat, 90.0, Coord::Lat1)?;
    check(point.lon, 180.0, Coord::Lon1)?;
    Ok(point)
}

/// Haversine distance in kilometres, rounded to 2 decimal places.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64, DistanceError> {
    check(lat1, 90.0, Coord::Lat1)?;
    check(lon1, 180.0, Coord::Lon1)?;
    check(lat2, 90.0, Coord::Lat2)?;
    check(lon2, 180.0, Coord::Lon2)?;

    if lat1 == lat2 && lon1 == lon2 {
        return Ok(0.0);
    }

    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    Ok(round2(EARTH_RADIUS_KM * c))
}

/// Distance between two points.
pub fn distance(a: GeoPoint, b: GeoPoint) -> Result<f64, DistanceError> {
    haversine_km(a.lat, a.lon, b.lat, b.lon)
}

/// Rank parks by distance from `origin`, nearest first.
///
/// Equal distances keep the order of `parks`.
pub fn rank_by_distance(origin: GeoPoint, parks: &[Park]) -> Result<Vec<RankedPark>, DistanceError> {
    let origin = validate(origin)?;
    let mut ranked = parks
        .iter()
        .map(|park| {
            distance(origin, park.location()).map(|distance_km| RankedPark {
                park: park.clone(),
                distance_km,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(ranked)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
