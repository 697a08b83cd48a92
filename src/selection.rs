//! Reconciles auto-detected, remembered and typed locations into the
//! single "from" value of the booking form, plus the park picked for it.
//!
//! The machine is pure: it never performs I/O. Each event returns the
//! [`Effect`]s the owner must carry out (start a search, request the
//! device position, remember the location...). Every mutation leaves the
//! state consistent on return:
//!
//! * `resolved` is `Some` only in [`Phase::AutoResolved`] and
//!   [`Phase::UserResolved`], and then `raw_text` is its display name.
//! * Once cleared, auto-detection never runs again for this machine.
//! * The selected park only changes on its own after a fresh resolution
//!   with coordinates, or by an explicit choice.

use crate::distance::rank_by_distance;
use crate::location::{GeolocationError, LocationCandidate, Provider};
use crate::parks::{find_park, search_parks, Park, RankedPark};
use serde::Serialize;
use tracing::{debug, warn};

/// Queries shorter than this cancel the search instead of scheduling one.
pub const MIN_SEARCH_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Empty,
    AutoDetecting,
    AutoResolved,
    UserTyping,
    UserResolved,
    Cleared,
}

/// Where the current "from" value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    None,
    AutoDetected,
    UserSelected,
    UserTypedFreeform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkMode {
    /// Nearest park follows the location.
    Auto,
    /// The user opened the park picker; their choice sticks.
    ManualSelection,
}

/// Work requested by the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start the one-shot position lookup; report back with this request id.
    RequestGeolocation(u64),
    /// Debounce a geocoding search for this text.
    ScheduleSearch(String),
    /// Drop any pending or in-flight search.
    CancelSearch,
    /// Auto-detection failed; nudge the user towards typing a location.
    ManualEntryHint(GeolocationError),
    /// A new location was resolved and is worth remembering.
    Resolved(LocationCandidate),
    /// The park list was re-ranked against a new origin.
    ParksRanked,
    ParkSelected(Park),
    /// Forget remembered location and park.
    Forget,
}

/// Read-only view of the machine for rendering or serialization.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionSnapshot {
    pub phase: Phase,
    pub source: Source,
    pub raw_text: String,
    pub resolved: Option<LocationCandidate>,
    pub suggestions: Vec<LocationCandidate>,
    pub park_mode: ParkMode,
    pub nearest_parks: Vec<RankedPark>,
    pub selected_park: Option<Park>,
}

pub struct LocationSelection {
    phase: Phase,
    raw_text: String,
    resolved: Option<LocationCandidate>,
    suggestions: Vec<LocationCandidate>,
    auto_detect_suppressed: bool,
    detect_request: Option<u64>,
    next_request: u64,

    parks: Vec<Park>,
    park_mode: ParkMode,
    ranked: Vec<RankedPark>,
    selected_park: Option<Park>,
    /// Last resolution that ranked the parks; re-resolving to the same
    /// place is not a fresh resolution.
    ranked_for: Option<LocationCandidate>,
}

impl LocationSelection {
    pub fn new(parks: Vec<Park>) -> Self {
        Self {
            phase: Phase::Empty,
            raw_text: String::new(),
            resolved: None,
            suggestions: Vec::new(),
            auto_detect_suppressed: false,
            detect_request: None,
            next_request: 0,
            parks,
            park_mode: ParkMode::Auto,
            ranked: Vec::new(),
            selected_park: None,
            ranked_for: None,
        }
    }

    // ─── Accessors ─────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn resolved(&self) -> Option<&LocationCandidate> {
        self.resolved.as_ref()
    }

    pub fn suggestions(&self) -> &[LocationCandidate] {
        &self.suggestions
    }

    pub fn park_mode(&self) -> ParkMode {
        self.park_mode
    }

    pub fn nearest_parks(&self) -> &[RankedPark] {
        &self.ranked
    }

    pub fn selected_park(&self) -> Option<&Park> {
        self.selected_park.as_ref()
    }

    pub fn parks(&self) -> &[Park] {
        &self.parks
    }

    pub fn auto_detect_suppressed(&self) -> bool {
        self.auto_detect_suppressed
    }

    pub fn source(&self) -> Source {
        match (self.phase, &self.resolved) {
            (Phase::AutoResolved, Some(_)) => Source::AutoDetected,
            (Phase::UserResolved, Some(c)) if c.provider == Provider::Typed => Source::UserTypedFreeform,
            (Phase::UserResolved, Some(_)) => Source::UserSelected,
            (Phase::UserTyping, _) if !self.raw_text.trim().is_empty() => Source::UserTypedFreeform,
            _ => Source::None,
        }
    }

    /// City text usable for a booking when nothing was resolved yet.
    pub fn typed_city(&self) -> Option<&str> {
        let text = self.raw_text.trim();
        (self.phase == Phase::UserTyping && text.chars().count() >= MIN_SEARCH_CHARS).then_some(text)
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            phase: self.phase,
            source: self.source(),
            raw_text: self.raw_text.clone(),
            resolved: self.resolved.clone(),
            suggestions: self.suggestions.clone(),
            park_mode: self.park_mode,
            nearest_parks: self.ranked.clone(),
            selected_park: self.selected_park.clone(),
        }
    }

    // ─── Location events ───────────────────────────────────────

    /// Form mounted. A remembered location wins over auto-detection.
    pub fn mount(
        &mut self,
        geolocation_available: bool,
        remembered: Option<LocationCandidate>,
        remembered_park: Option<&str>,
    ) -> Vec<Effect> {
        if self.phase != Phase::Empty {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if let Some(location) = remembered {
            debug!(location = %location.display_name, "restoring remembered location");
            effects = self.resolve(location, Phase::UserResolved);
            // Restoring is not news: nothing to remember again.
            effects.retain(|e| matches!(e, Effect::ParksRanked));
        } else if geolocation_available && !self.auto_detect_suppressed {
            self.next_request += 1;
            self.detect_request = Some(self.next_request);
            self.phase = Phase::AutoDetecting;
            effects.push(Effect::RequestGeolocation(self.next_request));
        }

        if let Some(name) = remembered_park {
            match find_park(&self.parks, name) {
                Some(park) => self.selected_park = Some(park.clone()),
                None => debug!(park = name, "remembered park no longer exists"),
            }
        }
        effects
    }

    /// Result of the auto-detect lookup started by [`Effect::RequestGeolocation`].
    pub fn auto_detect_finished(
        &mut self,
        request: u64,
        outcome: Result<LocationCandidate, GeolocationError>,
    ) -> Vec<Effect> {
        if self.phase != Phase::AutoDetecting || self.detect_request != Some(request) {
            debug!(request, phase = ?self.phase, "discarding stale auto-detect result");
            return Vec::new();
        }
        self.detect_request = None;
        match outcome {
            Ok(location) => self.resolve(location, Phase::AutoResolved),
            Err(e) => {
                warn!(error = %e, "auto-detect failed, falling back to manual entry");
                self.phase = Phase::Empty;
                self.auto_detect_suppressed = true;
                vec![Effect::ManualEntryHint(e)]
            }
        }
    }

    /// The user changed the input text.
    pub fn edit_text(&mut self, text: &str) -> Vec<Effect> {
        let unchanged = match &self.resolved {
            Some(r) => r.display_name == text,
            None => self.phase == Phase::UserTyping && self.raw_text == text,
        };
        if unchanged {
            return Vec::new();
        }

        self.raw_text = text.to_string();
        self.resolved = None;
        self.detect_request = None;
        self.phase = Phase::UserTyping;

        let query = text.trim();
        if query.chars().count() >= MIN_SEARCH_CHARS {
            vec![Effect::ScheduleSearch(query.to_string())]
        } else {
            self.suggestions.clear();
            vec![Effect::CancelSearch]
        }
    }

    /// Search results for `query`. Ignored unless the user is still
    /// typing that exact text. Returns whether they were applied.
    pub fn suggestions_arrived(&mut self, query: &str, found: Vec<LocationCandidate>) -> bool {
        if self.phase != Phase::UserTyping || self.raw_text.trim() != query {
            debug!(query, "discarding suggestions for outdated text");
            return false;
        }
        self.suggestions = found;
        true
    }

    /// The user picked `index` from the suggestion list.
    pub fn pick_suggestion(&mut self, index: usize) -> Vec<Effect> {
        if self.phase != Phase::UserTyping {
            return Vec::new();
        }
        let Some(choice) = self.suggestions.get(index).cloned() else {
            return Vec::new();
        };
        let mut effects = vec![Effect::CancelSearch];
        effects.extend(self.resolve(choice, Phase::UserResolved));
        effects
    }

    /// The input lost focus. Typed text without a pick becomes a
    /// coordinate-less location.
    pub fn leave_field(&mut self) -> Vec<Effect> {
        if self.phase != Phase::UserTyping {
            return Vec::new();
        }
        let Some(city) = self.typed_city() else {
            return Vec::new();
        };
        let typed = LocationCandidate::typed(city);
        let mut effects = vec![Effect::CancelSearch];
        effects.extend(self.resolve(typed, Phase::UserResolved));
        effects
    }

    /// Explicit clear. Auto-detection stays off for the rest of the session.
    pub fn clear(&mut self) -> Vec<Effect> {
        self.phase = Phase::Cleared;
        self.raw_text.clear();
        self.resolved = None;
        self.suggestions.clear();
        self.auto_detect_suppressed = true;
        self.detect_request = None;
        self.ranked.clear();
        self.ranked_for = None;
        if self.park_mode == ParkMode::Auto {
            self.selected_park = None;
        }
        vec![Effect::CancelSearch, Effect::Forget]
    }

    fn resolve(&mut self, location: LocationCandidate, phase: Phase) -> Vec<Effect> {
        debug!(location = %location.display_name, ?phase, "location resolved");
        self.raw_text = location.display_name.clone();
        self.suggestions.clear();
        self.detect_request = None;
        self.phase = phase;
        self.resolved = Some(location.clone());

        let mut effects = vec![Effect::Resolved(location.clone())];
        effects.extend(self.rerank(location));
        effects
    }

    fn rerank(&mut self, location: LocationCandidate) -> Vec<Effect> {
        let Some(origin) = location.coordinates else {
            debug!("no coordinates, skipping park ranking");
            self.drop_ranking();
            return Vec::new();
        };

        let ranked = match rank_by_distance(origin, &self.parks) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, "cannot rank parks from this location");
                self.drop_ranking();
                return Vec::new();
            }
        };
        self.ranked = ranked;

        let same_place = self.ranked_for.as_ref().is_some_and(|prev| {
            prev.display_name == location.display_name && prev.coordinates == location.coordinates
        });
        self.ranked_for = Some(location);

        let mut effects = vec![Effect::ParksRanked];
        if self.park_mode == ParkMode::ManualSelection && same_place {
            debug!("same location re-resolved, keeping the chosen park");
            return effects;
        }
        self.park_mode = ParkMode::Auto;
        if let Some(nearest) = self.ranked.first() {
            self.selected_park = Some(nearest.park.clone());
            effects.push(Effect::ParkSelected(nearest.park.clone()));
        }
        effects
    }

    /// An automatic park pick belongs to the location it was ranked for.
    fn drop_ranking(&mut self) {
        self.ranked.clear();
        self.ranked_for = None;
        if self.park_mode == ParkMode::Auto {
            self.selected_park = None;
        }
    }

    // ─── Park events ───────────────────────────────────────────

    /// The user opened the "change park" picker.
    pub fn open_park_search(&mut self) {
        self.park_mode = ParkMode::ManualSelection;
    }

    /// Picker results; a blank query lists the parks in reference order.
    pub fn park_search(&self, query: &str) -> Vec<&Park> {
        search_parks(query, &self.parks)
    }

    /// The user chose a park by name. Unknown names change nothing.
    pub fn choose_park(&mut self, name: &str) -> Vec<Effect> {
        let Some(park) = find_park(&self.parks, name).cloned() else {
            warn!(park = name, "unknown park");
            return Vec::new();
        };
        self.park_mode = ParkMode::ManualSelection;
        self.selected_park = Some(park.clone());
        vec![Effect::ParkSelected(park)]
    }

    /// Picker closed without a choice. The mode stays manual.
    pub fn cancel_park_search(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::GeoPoint;
    use crate::parks::builtin_parks;

    fn machine() -> LocationSelection {
        LocationSelection::new(builtin_parks())
    }

    fn candidate(name: &str, lat: f64, lon: f64) -> LocationCandidate {
        LocationCandidate {
            city: name.split(',').next().unwrap_or(name).trim().to_string(),
            street: None,
            coordinates: Some(GeoPoint::new(lat, lon)),
            display_name: name.to_string(),
            provider: Provider::Nominatim,
        }
    }

    fn lagos() -> LocationCandidate {
        candidate("Lagos, Nigeria", 6.5244, 3.3792)
    }

    fn abuja() -> LocationCandidate {
        candidate("Abuja, Nigeria", 9.0765, 7.3986)
    }

    fn assert_consistent(m: &LocationSelection) {
        match m.phase() {
            Phase::AutoResolved | Phase::UserResolved => {
                let r = m.resolved().expect("resolved phase without location");
                assert_eq!(m.raw_text(), r.display_name);
            }
            _ => assert!(m.resolved().is_none(), "{:?} holds a location", m.phase()),
        }
        if matches!(m.source(), Source::AutoDetected | Source::UserSelected) {
            assert_eq!(m.resolved().map(|r| r.display_name.as_str()), Some(m.raw_text()));
        }
    }

    fn auto_resolved() -> LocationSelection {
        let mut m = machine();
        let effects = m.mount(true, None, None);
        assert_eq!(effects, vec![Effect::RequestGeolocation(1)]);
        m.auto_detect_finished(1, Ok(lagos()));
        m
    }

    #[test]
    fn test_mount_starts_auto_detect() {
        let mut m = machine();
        assert_eq!(m.mount(true, None, None), vec![Effect::RequestGeolocation(1)]);
        assert_eq!(m.phase(), Phase::AutoDetecting);
        assert_consistent(&m);
    }

    #[test]
    fn test_mount_without_geolocation_stays_empty() {
        let mut m = machine();
        assert!(m.mount(false, None, None).is_empty());
        assert_eq!(m.phase(), Phase::Empty);
        assert_eq!(m.source(), Source::None);
    }

    #[test]
    fn test_auto_detect_success() {
        let m = auto_resolved();
        assert_eq!(m.phase(), Phase::AutoResolved);
        assert_eq!(m.source(), Source::AutoDetected);
        assert_eq!(m.raw_text(), "Lagos, Nigeria");
        assert_eq!(m.selected_park().unwrap().name, "Yaba Bus Terminal");
        assert_eq!(m.nearest_parks().len(), 10);
        assert_consistent(&m);
    }

    #[test]
    fn test_auto_detect_failure_hints_manual_entry() {
        let mut m = machine();
        m.mount(true, None, None);
        let effects = m.auto_detect_finished(1, Err(GeolocationError::Denied));
        assert_eq!(effects, vec![Effect::ManualEntryHint(GeolocationError::Denied)]);
        assert_eq!(m.phase(), Phase::Empty);
        assert_consistent(&m);
    }

    #[test]
    fn test_timeout_fails_the_same_way() {
        let mut m = machine();
        m.mount(true, None, None);
        m.auto_detect_finished(1, Err(GeolocationError::Timeout));
        assert_eq!(m.phase(), Phase::Empty);
        assert!(m.resolved().is_none());
    }

    #[test]
    fn test_failed_detection_is_not_retried_on_remount() {
        let mut m = machine();
        m.mount(true, None, None);
        m.auto_detect_finished(1, Err(GeolocationError::Denied));
        assert!(m.auto_detect_suppressed());
        assert!(m.mount(true, None, None).is_empty());
        assert_eq!(m.phase(), Phase::Empty);
    }

    #[test]
    fn test_editing_auto_resolved_drops_location_immediately() {
        let mut m = auto_resolved();
        let effects = m.edit_text("Lagos, Nigeri");
        assert_eq!(m.phase(), Phase::UserTyping);
        assert!(m.resolved().is_none());
        assert_eq!(effects, vec![Effect::ScheduleSearch("Lagos, Nigeri".into())]);
        assert_consistent(&m);
    }

    #[test]
    fn test_typing_during_detection_discards_late_result() {
        let mut m = machine();
        m.mount(true, None, None);
        m.edit_text("Ib");
        assert!(m.auto_detect_finished(1, Ok(lagos())).is_empty());
        assert_eq!(m.phase(), Phase::UserTyping);
        assert_eq!(m.raw_text(), "Ib");
        assert_consistent(&m);
    }

    #[test]
    fn test_short_text_cancels_search() {
        let mut m = machine();
        assert_eq!(m.edit_text("L"), vec![Effect::CancelSearch]);
        assert_eq!(m.phase(), Phase::UserTyping);
        assert_eq!(m.edit_text("La"), vec![Effect::ScheduleSearch("La".into())]);
    }

    #[test]
    fn test_same_text_is_not_an_edit() {
        let mut m = auto_resolved();
        assert!(m.edit_text("Lagos, Nigeria").is_empty());
        assert_eq!(m.phase(), Phase::AutoResolved);
        m.edit_text("Lag");
        assert!(m.edit_text("Lag").is_empty());
    }

    #[test]
    fn test_suggestions_only_for_current_text() {
        let mut m = machine();
        m.edit_text("Lag");
        assert!(!m.suggestions_arrived("La", vec![lagos()]));
        assert!(m.suggestions_arrived("Lag", vec![lagos()]));
        assert_eq!(m.suggestions().len(), 1);
        assert_eq!(m.phase(), Phase::UserTyping);
    }

    #[test]
    fn test_pick_suggestion_resolves() {
        let mut m = machine();
        m.edit_text("Abu");
        m.suggestions_arrived("Abu", vec![abuja(), lagos()]);
        let effects = m.pick_suggestion(0);
        assert_eq!(effects[0], Effect::CancelSearch);
        assert!(effects.contains(&Effect::Resolved(abuja())));
        assert_eq!(m.phase(), Phase::UserResolved);
        assert_eq!(m.source(), Source::UserSelected);
        assert_eq!(m.raw_text(), "Abuja, Nigeria");
        assert!(m.suggestions().is_empty());
        assert_eq!(m.selected_park().unwrap().name, "Abuja Motor Park");
        assert_consistent(&m);
    }

    #[test]
    fn test_pick_out_of_range_is_ignored() {
        let mut m = machine();
        m.edit_text("Abu");
        m.suggestions_arrived("Abu", vec![abuja()]);
        assert!(m.pick_suggestion(3).is_empty());
        assert_eq!(m.phase(), Phase::UserTyping);
    }

    #[test]
    fn test_leave_field_synthesizes_typed_city() {
        let mut m = auto_resolved();
        m.edit_text("  Ibadan ");
        let effects = m.leave_field();
        assert_eq!(effects[0], Effect::CancelSearch);
        assert_eq!(m.phase(), Phase::UserResolved);
        assert_eq!(m.source(), Source::UserTypedFreeform);
        let r = m.resolved().unwrap();
        assert_eq!(r.city, "Ibadan");
        assert!(r.coordinates.is_none());
        assert!(m.nearest_parks().is_empty());
        assert!(m.selected_park().is_none());
        assert_consistent(&m);
    }

    #[test]
    fn test_leave_field_with_one_char_does_nothing() {
        let mut m = machine();
        m.edit_text("I");
        assert!(m.leave_field().is_empty());
        assert_eq!(m.phase(), Phase::UserTyping);
    }

    #[test]
    fn test_clear_suppresses_auto_detect_for_good() {
        let mut m = auto_resolved();
        let effects = m.clear();
        assert_eq!(effects, vec![Effect::CancelSearch, Effect::Forget]);
        assert_eq!(m.phase(), Phase::Cleared);
        assert_eq!(m.raw_text(), "");
        assert!(m.auto_detect_suppressed());
        assert_consistent(&m);

        m.edit_text("Ka");
        assert_eq!(m.phase(), Phase::UserTyping);
        assert!(m.mount(true, None, None).is_empty());
        m.edit_text("");
        assert!(m.auto_detect_finished(1, Ok(lagos())).is_empty());
        assert_eq!(m.phase(), Phase::UserTyping);
    }

    #[test]
    fn test_clear_while_detecting_ignores_result() {
        let mut m = machine();
        m.mount(true, None, None);
        m.clear();
        assert!(m.auto_detect_finished(1, Ok(lagos())).is_empty());
        assert_eq!(m.phase(), Phase::Cleared);
    }

    #[test]
    fn test_remembered_location_skips_detection() {
        let mut m = machine();
        let effects = m.mount(true, Some(abuja()), Some("Kaduna Motor Park"));
        assert_eq!(effects, vec![Effect::ParksRanked]);
        assert_eq!(m.phase(), Phase::UserResolved);
        assert_eq!(m.source(), Source::UserSelected);
        assert_eq!(m.selected_park().unwrap().name, "Kaduna Motor Park");
        assert_consistent(&m);
    }

    #[test]
    fn test_remembered_park_must_exist() {
        let mut m = machine();
        m.mount(false, Some(abuja()), Some("Closed Park"));
        assert_eq!(m.selected_park().unwrap().name, "Abuja Motor Park");
    }

    #[test]
    fn test_manual_park_survives_cancel() {
        let mut m = auto_resolved();
        m.open_park_search();
        m.cancel_park_search();
        assert_eq!(m.park_mode(), ParkMode::ManualSelection);
        assert_eq!(m.selected_park().unwrap().name, "Yaba Bus Terminal");
    }

    #[test]
    fn test_manual_park_survives_retyping_same_place() {
        let mut m = auto_resolved();
        m.open_park_search();
        m.choose_park("Ikeja Bus Terminal");

        m.edit_text("Lagos");
        m.suggestions_arrived("Lagos", vec![lagos()]);
        m.pick_suggestion(0);

        assert_eq!(m.park_mode(), ParkMode::ManualSelection);
        assert_eq!(m.selected_park().unwrap().name, "Ikeja Bus Terminal");
    }

    #[test]
    fn test_fresh_location_returns_to_auto() {
        let mut m = auto_resolved();
        m.choose_park("Ikeja Bus Terminal");
        assert_eq!(m.park_mode(), ParkMode::ManualSelection);

        m.edit_text("Abuja");
        m.suggestions_arrived("Abuja", vec![abuja()]);
        let effects = m.pick_suggestion(0);

        assert_eq!(m.park_mode(), ParkMode::Auto);
        assert_eq!(m.selected_park().unwrap().name, "Abuja Motor Park");
        assert!(effects.contains(&Effect::ParkSelected(m.selected_park().unwrap().clone())));
    }

    #[test]
    fn test_typed_location_keeps_manual_park() {
        let mut m = auto_resolved();
        m.choose_park("Berger Motor Park");
        m.edit_text("Somewhere");
        m.leave_field();
        assert_eq!(m.selected_park().unwrap().name, "Berger Motor Park");
    }

    #[test]
    fn test_unknown_park_changes_nothing() {
        let mut m = auto_resolved();
        assert!(m.choose_park("Nowhere").is_empty());
        assert_eq!(m.park_mode(), ParkMode::Auto);
    }

    #[test]
    fn test_invalid_coordinates_skip_ranking() {
        let mut m = machine();
        m.edit_text("Null Island");
        m.suggestions_arrived("Null Island", vec![candidate("Null Island", f64::NAN, 0.0)]);
        m.pick_suggestion(0);
        assert_eq!(m.phase(), Phase::UserResolved);
        assert!(m.nearest_parks().is_empty());
    }

    #[test]
    fn test_invalid_coordinates_drop_the_auto_picked_park() {
        let mut m = auto_resolved();
        assert!(m.selected_park().is_some());
        m.edit_text("Bad place");
        m.suggestions_arrived("Bad place", vec![candidate("Bad place", 95.0, 3.0)]);
        m.pick_suggestion(0);
        assert_eq!(m.phase(), Phase::UserResolved);
        assert!(m.nearest_parks().is_empty());
        assert!(m.selected_park().is_none());
        assert_eq!(m.park_mode(), ParkMode::Auto);
    }

    #[test]
    fn test_invalid_coordinates_keep_a_manual_park() {
        let mut m = auto_resolved();
        m.open_park_search();
        m.choose_park("Berger Motor Park");
        m.edit_text("Bad place");
        m.suggestions_arrived("Bad place", vec![candidate("Bad place", 95.0, 3.0)]);
        m.pick_suggestion(0);
        assert_eq!(m.selected_park().unwrap().name, "Berger Motor Park");
        assert_eq!(m.park_mode(), ParkMode::ManualSelection);
    }

    #[test]
    fn test_park_search_browse() {
        let m = machine();
        assert_eq!(m.park_search("").len(), 10);
        assert_eq!(m.park_search("kano")[0].name, "Kano Central Motor Park");
    }

    #[test]
    fn test_snapshot_serializes_phase_names() {
        let m = auto_resolved();
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["phase"], "AUTO_RESOLVED");
        assert_eq!(json["source"], "AUTO_DETECTED");
        assert_eq!(json["park_mode"], "AUTO");
    }
}
