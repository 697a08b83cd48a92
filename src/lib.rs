//! Movaa booking core.
//!
//! Finds the take-off park nearest to where a traveller is, through a
//! geocoding pipeline with debounced autocomplete, fuzzy matching over
//! static city/park lists and haversine ranking, and turns the result
//! into a persisted booking draft.

pub mod booking;
pub mod config;
pub mod debounce;
pub mod distance;
pub mod fuzzy;
pub mod location;
pub mod parks;
pub mod selection;
pub mod server;
pub mod session;
pub mod store;
