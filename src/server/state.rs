use crate::location::Geocoder;
use crate::parks::Park;
use std::sync::Arc;

pub struct AppState {
    pub geocoder: Arc<dyn Geocoder>,
    pub parks: Vec<Park>,
}
