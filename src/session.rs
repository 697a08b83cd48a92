//! One booking form on screen: the event loop around the location
//! machine.
//!
//! The session owns the debouncer, the geocoder, the optional geolocator
//! and the store, and carries out the effects the machine asks for.
//! Time is passed in by the caller so the loop can be driven from a
//! real clock or from tests.

use crate::booking::{assemble, BookingDraft, TripForm, ValidationError};
use crate::debounce::{Debouncer, Fired, Ticket};
use crate::location::{destination_cities, CityInfo, Geocoder, GeolocationError, Geolocator, LocationCandidate};
use crate::parks::{builtin_parks, Park};
use crate::selection::{Effect, LocationSelection};
use crate::store::Storage;
use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Inputs whose searches are debounced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    From,
    Destination,
}

/// Results of one debounced search.
#[derive(Debug, Clone)]
pub enum SearchResults {
    From(Vec<LocationCandidate>),
    Destination(Vec<CityInfo>),
}

pub struct BookingSession {
    selection: LocationSelection,
    form: TripForm,
    debouncer: Debouncer<SearchField, String>,
    delay: Duration,
    geocoder: Arc<dyn Geocoder>,
    geolocator: Option<Box<dyn Geolocator>>,
    storage: Storage,
    pending_detect: Option<u64>,
    hint: Option<GeolocationError>,
    destination_suggestions: Vec<CityInfo>,
}

impl BookingSession {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        geolocator: Option<Box<dyn Geolocator>>,
        storage: Storage,
        delay: Duration,
    ) -> Self {
        Self {
            selection: LocationSelection::new(builtin_parks()),
            form: TripForm::new(),
            debouncer: Debouncer::new(),
            delay,
            geocoder,
            geolocator,
            storage,
            pending_detect: None,
            hint: None,
            destination_suggestions: Vec::new(),
        }
    }

    pub fn selection(&self) -> &LocationSelection {
        &self.selection
    }

    pub fn form(&self) -> &TripForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut TripForm {
        &mut self.form
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Hint left by a failed auto-detection, for the UI to show.
    pub fn hint(&self) -> Option<&GeolocationError> {
        self.hint.as_ref()
    }

    pub fn destination_suggestions(&self) -> &[CityInfo] {
        &self.destination_suggestions
    }

    /// When the next debounced search is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    pub fn auto_detect_pending(&self) -> bool {
        self.pending_detect.is_some()
    }

    fn apply(&mut self, effects: Vec<Effect>, now: Instant) {
        for effect in effects {
            match effect {
                Effect::RequestGeolocation(request) => self.pending_detect = Some(request),
                Effect::ScheduleSearch(query) => {
                    self.debouncer.schedule(SearchField::From, query, self.delay, now);
                }
                Effect::CancelSearch => self.debouncer.cancel(&SearchField::From),
                Effect::ManualEntryHint(e) => {
                    info!(reason = %e, "location not detected, please enter it manually");
                    self.hint = Some(e);
                }
                Effect::Resolved(location) => {
                    self.hint = None;
                    self.storage.save_last_location(&location, Utc::now());
                }
                Effect::ParkSelected(park) => self.storage.save_last_park(&park.name, Utc::now()),
                Effect::ParksRanked => debug!(
                    nearest = ?self.selection.nearest_parks().first().map(|p| &p.park.name),
                    "parks re-ranked"
                ),
                Effect::Forget => self.storage.forget_location(),
            }
        }
    }

    // ─── "From" field ──────────────────────────────────────────

    /// Form mounted: restore what was remembered, or start auto-detection.
    pub fn mount(&mut self, now: Instant) {
        let today = Utc::now();
        let remembered = self.storage.last_location(today);
        let remembered_park = self.storage.last_park(today);
        let effects = self.selection.mount(
            self.geolocator.is_some(),
            remembered,
            remembered_park.as_deref(),
        );
        self.apply(effects, now);
    }

    /// Run the outstanding auto-detect lookup, if any. Blocks for at most
    /// the geolocator's timeout plus one reverse geocode.
    pub fn run_auto_detect(&mut self, now: Instant) {
        let (Some(request), Some(locator)) = (self.pending_detect.take(), self.geolocator.as_ref())
        else {
            return;
        };
        let outcome = locator.current_position().and_then(|point| {
            self.geocoder
                .reverse_geocode(point)
                .ok_or_else(|| GeolocationError::Unavailable("Could not determine city from location".into()))
        });
        let effects = self.selection.auto_detect_finished(request, outcome);
        self.apply(effects, now);
    }

    pub fn type_from(&mut self, text: &str, now: Instant) {
        let effects = self.selection.edit_text(text);
        self.apply(effects, now);
    }

    pub fn pick_suggestion(&mut self, index: usize, now: Instant) -> bool {
        let effects = self.selection.pick_suggestion(index);
        let picked = !effects.is_empty();
        self.apply(effects, now);
        picked
    }

    pub fn leave_from_field(&mut self, now: Instant) {
        let effects = self.selection.leave_field();
        self.apply(effects, now);
    }

    pub fn clear_from(&mut self, now: Instant) {
        self.pending_detect = None;
        let effects = self.selection.clear();
        self.apply(effects, now);
    }

    // ─── Destination field ─────────────────────────────────────

    pub fn type_destination(&mut self, text: &str, now: Instant) {
        self.form.set_destination(text);
        self.debouncer
            .schedule(SearchField::Destination, text.trim().to_string(), self.delay, now);
    }

    // ─── Debounced searches ────────────────────────────────────

    /// Searches whose quiet period has elapsed. Each must be answered
    /// through [`apply_search`](Self::apply_search).
    pub fn due_searches(&mut self, now: Instant) -> Vec<Fired<SearchField, String>> {
        self.debouncer.poll(now)
    }

    /// Run one due search against the geocoder or the city list.
    pub fn run_search(&self, field: SearchField, query: &str) -> SearchResults {
        match field {
            SearchField::From => SearchResults::From(self.geocoder.search(query)),
            SearchField::Destination => SearchResults::Destination(destination_cities(query)),
        }
    }

    /// Apply results unless a newer search or a cancel superseded them.
    pub fn apply_search(&mut self, field: SearchField, query: &str, ticket: Ticket, results: SearchResults) -> bool {
        if !self.debouncer.is_current(&field, ticket) {
            debug!(?field, query, "dropping stale search response");
            return false;
        }
        match results {
            SearchResults::From(found) => self.selection.suggestions_arrived(query, found),
            SearchResults::Destination(found) => {
                self.destination_suggestions = found;
                true
            }
        }
    }

    /// Run everything that is due, in order.
    pub fn tick(&mut self, now: Instant) {
        for fired in self.due_searches(now) {
            let results = self.run_search(fired.key, &fired.args);
            self.apply_search(fired.key, &fired.args, fired.ticket, results);
        }
    }

    // ─── Park ──────────────────────────────────────────────────

    pub fn open_park_search(&mut self) {
        self.selection.open_park_search();
    }

    pub fn park_search(&self, query: &str) -> Vec<&Park> {
        self.selection.park_search(query)
    }

    pub fn choose_park(&mut self, name: &str, now: Instant) -> bool {
        let effects = self.selection.choose_park(name);
        let chosen = !effects.is_empty();
        self.apply(effects, now);
        chosen
    }

    pub fn cancel_park_search(&mut self) {
        self.selection.cancel_park_search();
    }

    // ─── Submit / teardown ─────────────────────────────────────

    /// Validate and persist the booking.
    pub fn submit(&mut self, today: NaiveDate) -> Result<BookingDraft, ValidationError> {
        debug!(selection = ?self.selection.snapshot(), "submitting booking");
        let draft = assemble(&self.form, &self.selection, today)?;
        self.storage.save_booking(&draft);
        info!(from = %draft.from, to = %draft.destination, total = draft.total_price, "booking saved");
        Ok(draft)
    }

    /// Form closed: nothing pending may touch the state afterwards.
    pub fn teardown(&mut self) {
        self.debouncer.cancel_all();
        self.pending_detect = None;
    }
}

/// Issue the ticket for the stored booking: ensure its code, mark it
/// paid and store it back.
pub fn issue_ticket<R: Rng>(storage: &mut Storage, rng: &mut R) -> Option<BookingDraft> {
    let mut draft = storage.load_booking()?;
    draft.ensure_ticket_code(rng);
    draft.mark_paid();
    storage.save_booking(&draft);
    Some(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::FormField;
    use crate::location::{FixedLocator, GeoPoint, Provider};
    use crate::selection::{ParkMode, Phase, Source};
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    const DELAY: Duration = Duration::from_millis(300);

    #[derive(Default)]
    struct FakeGeocoder {
        queries: Mutex<Vec<String>>,
    }

    impl FakeGeocoder {
        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    fn place(name: &str, lat: f64, lon: f64) -> LocationCandidate {
        LocationCandidate {
            city: name.to_string(),
            street: None,
            coordinates: Some(GeoPoint::new(lat, lon)),
            display_name: format!("{}, Nigeria", name),
            provider: Provider::Nominatim,
        }
    }

    impl Geocoder for FakeGeocoder {
        fn search(&self, query: &str) -> Vec<LocationCandidate> {
            self.queries.lock().unwrap().push(query.to_string());
            if query.to_lowercase().starts_with("ab") {
                vec![place("Abuja", 9.0765, 7.3986)]
            } else {
                Vec::new()
            }
        }

        fn reverse_geocode(&self, point: GeoPoint) -> Option<LocationCandidate> {
            (point.lat > 6.0 && point.lat < 7.0).then(|| place("Lagos", point.lat, point.lon))
        }
    }

    struct DeniedLocator;

    impl Geolocator for DeniedLocator {
        fn current_position(&self) -> Result<GeoPoint, GeolocationError> {
            Err(GeolocationError::Denied)
        }
    }

    fn session_with(
        geocoder: Arc<FakeGeocoder>,
        locator: Option<Box<dyn Geolocator>>,
        storage: Storage,
    ) -> BookingSession {
        BookingSession::new(geocoder, locator, storage, DELAY)
    }

    fn lagos_locator() -> Option<Box<dyn Geolocator>> {
        Some(Box::new(FixedLocator(GeoPoint::new(6.5244, 3.3792))))
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn test_auto_detect_end_to_end() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), lagos_locator(), Storage::in_memory());
        s.mount(t0);
        assert!(s.auto_detect_pending());
        assert_eq!(s.selection().phase(), Phase::AutoDetecting);

        s.run_auto_detect(t0);
        assert_eq!(s.selection().phase(), Phase::AutoResolved);
        assert_eq!(s.selection().selected_park().unwrap().name, "Yaba Bus Terminal");
        assert!(s.storage().last_location(Utc::now()).is_some());
        assert_eq!(s.storage().last_park(Utc::now()).as_deref(), Some("Yaba Bus Terminal"));
    }

    #[test]
    fn test_denied_geolocation_leaves_hint() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), Some(Box::new(DeniedLocator)), Storage::in_memory());
        s.mount(t0);
        s.run_auto_detect(t0);
        assert_eq!(s.selection().phase(), Phase::Empty);
        assert_eq!(s.hint(), Some(&GeolocationError::Denied));
    }

    #[test]
    fn test_unresolvable_position_fails_gracefully() {
        let t0 = Instant::now();
        let kano = Some(Box::new(FixedLocator(GeoPoint::new(12.0, 8.5))) as Box<dyn Geolocator>);
        let mut s = session_with(Arc::default(), kano, Storage::in_memory());
        s.mount(t0);
        s.run_auto_detect(t0);
        assert_eq!(s.selection().phase(), Phase::Empty);
        assert!(matches!(s.hint(), Some(GeolocationError::Unavailable(_))));
    }

    #[test]
    fn test_typing_is_debounced_to_one_search() {
        let t0 = Instant::now();
        let geocoder = Arc::new(FakeGeocoder::default());
        let mut s = session_with(geocoder.clone(), None, Storage::in_memory());
        s.mount(t0);

        let mut now = t0;
        for text in ["A", "Ab", "Abu", "Abuj", "Abuja"] {
            s.type_from(text, now);
            now += Duration::from_millis(50);
            s.tick(now);
        }
        assert!(geocoder.queries().is_empty());

        s.tick(now + DELAY);
        assert_eq!(geocoder.queries(), vec!["Abuja".to_string()]);
        assert_eq!(s.selection().suggestions().len(), 1);

        assert!(s.pick_suggestion(0, now + DELAY));
        assert_eq!(s.selection().source(), Source::UserSelected);
        assert_eq!(s.selection().selected_park().unwrap().name, "Abuja Motor Park");
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), None, Storage::in_memory());
        s.type_from("Ab", t0);
        let fired = s.due_searches(t0 + DELAY).remove(0);
        let results = s.run_search(fired.key, &fired.args);

        // The user kept typing before the response landed.
        s.type_from("Abu", t0 + DELAY);
        assert!(!s.apply_search(fired.key, &fired.args, fired.ticket, results));
        assert!(s.selection().suggestions().is_empty());
    }

    #[test]
    fn test_teardown_blocks_late_results() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), lagos_locator(), Storage::in_memory());
        s.mount(t0);
        s.type_from("Abuja", t0);
        let fired = s.due_searches(t0 + DELAY).remove(0);
        let results = s.run_search(fired.key, &fired.args);
        s.teardown();
        assert!(!s.apply_search(fired.key, &fired.args, fired.ticket, results));
        assert!(!s.auto_detect_pending());
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_clear_then_type_never_auto_detects() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), lagos_locator(), Storage::in_memory());
        s.mount(t0);
        s.clear_from(t0);
        s.run_auto_detect(t0);
        assert_eq!(s.selection().phase(), Phase::Cleared);

        s.type_from("Ibadan", t0);
        s.mount(t0);
        assert!(!s.auto_detect_pending());
        assert_eq!(s.selection().phase(), Phase::UserTyping);
    }

    #[test]
    fn test_remembered_location_restored_on_next_visit() {
        let t0 = Instant::now();
        let mut backend = Storage::in_memory();
        backend.save_last_location(&place("Abuja", 9.0765, 7.3986), Utc::now());
        backend.save_last_park("Kaduna Motor Park", Utc::now());

        let mut s = session_with(Arc::default(), lagos_locator(), backend);
        s.mount(t0);
        assert!(!s.auto_detect_pending());
        assert_eq!(s.selection().phase(), Phase::UserResolved);
        assert_eq!(s.selection().selected_park().unwrap().name, "Kaduna Motor Park");
    }

    #[test]
    fn test_blank_destination_browses_cities() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), None, Storage::in_memory());
        s.type_destination("", t0);
        s.tick(t0 + DELAY);
        assert_eq!(s.destination_suggestions().len(), 10);
    }

    #[test]
    fn test_destination_search_is_independent() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), None, Storage::in_memory());
        s.type_destination("Kan", t0);
        s.type_from("Ab", t0 + Duration::from_millis(100));
        s.tick(t0 + DELAY);
        assert_eq!(s.destination_suggestions()[0].name, "Kano");
        assert!(s.selection().suggestions().is_empty());
        s.tick(t0 + DELAY + Duration::from_millis(100));
        assert_eq!(s.selection().suggestions().len(), 1);
    }

    #[test]
    fn test_submit_persists_and_reports_field() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), lagos_locator(), Storage::in_memory());
        s.mount(t0);
        s.run_auto_detect(t0);

        let err = s.submit(today()).unwrap_err();
        assert_eq!(err.field, FormField::Destination);

        s.type_destination("Aba", t0);
        s.form_mut().set_date(Some(today()));
        s.form_mut().set_time(Some("6:00pm"));
        s.form_mut().set_ticket_count(2).unwrap();
        s.open_park_search();
        assert!(s.choose_park("Ajah Motor Park", t0));
        s.cancel_park_search();
        assert_eq!(s.selection().park_mode(), ParkMode::ManualSelection);

        let draft = s.submit(today()).unwrap();
        assert_eq!(draft.selected_park.as_ref().unwrap().name, "Ajah Motor Park");
        assert_eq!(draft.total_price, 80_000);
        assert_eq!(s.storage().load_booking(), Some(draft));
    }

    #[test]
    fn test_store_outage_does_not_block_submit() {
        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), lagos_locator(), Storage::new(MemoryStore::unavailable()));
        s.mount(t0);
        s.run_auto_detect(t0);
        s.type_destination("Aba", t0);
        s.form_mut().set_date(Some(today()));
        s.form_mut().set_time(Some("9:00am"));
        assert!(s.submit(today()).is_ok());
        assert!(s.storage().load_booking().is_none());
    }

    #[test]
    fn test_issue_ticket() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut storage = Storage::in_memory();
        assert!(issue_ticket(&mut storage, &mut rng).is_none());

        let t0 = Instant::now();
        let mut s = session_with(Arc::default(), lagos_locator(), storage);
        s.mount(t0);
        s.run_auto_detect(t0);
        s.type_destination("Aba", t0);
        s.form_mut().set_date(Some(today()));
        s.form_mut().set_time(Some("9:00am"));
        s.submit(today()).unwrap();

        let mut storage = std::mem::replace(&mut s.storage, Storage::in_memory());
        let first = issue_ticket(&mut storage, &mut rng).unwrap();
        let second = issue_ticket(&mut storage, &mut rng).unwrap();
        assert_eq!(first.ticket_code, second.ticket_code);
        assert_eq!(storage.load_booking().unwrap().payment_status, crate::booking::PaymentStatus::Paid);
    }
}
