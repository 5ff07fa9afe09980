use std::f64::consts::TAU;

use serde::Serialize;

use crate::mode::TransportMode;

/// The user-selected parameters that drive every map visual.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub mode: TransportMode,
    /// Always one of `mode.allowed_ranges()`.
    pub range_minutes: u32,
    pub is_3d: bool,
    pub poi_visible: bool,
    /// Marker pulse phase in `[0, 2π)`.
    pub pulse_phase: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            mode: TransportMode::Walk,
            range_minutes: 15,
            is_3d: false,
            poi_visible: true,
            pulse_phase: 0.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ViewState)>;

/// Single source of truth for [`ViewState`].
///
/// Setters never fail: out-of-domain input is clamped. A setter that changes
/// anything synchronously hands the new snapshot to every listener, in
/// subscription order, and returns `true`.
pub struct ViewStateStore {
    state: ViewState,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl std::fmt::Debug for ViewStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStateStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ViewStateStore {
    fn default() -> Self {
        Self::new(ViewState::default())
    }
}

impl ViewStateStore {
    pub fn new(initial: ViewState) -> Self {
        let mut state = initial;
        state.range_minutes = state.mode.clamp_range(state.range_minutes);
        state.pulse_phase = wrap_phase(state.pulse_phase);
        Self {
            state,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn snapshot(&self) -> ViewState {
        self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ViewState) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Switches mode; a range the new mode does not offer resets to the
    /// mode's first range.
    pub fn set_mode(&mut self, mode: TransportMode) -> bool {
        if self.state.mode == mode {
            return false;
        }
        self.state.mode = mode;
        if !mode.allows(self.state.range_minutes) {
            self.state.range_minutes = mode.allowed_ranges()[0];
        }
        self.notify();
        true
    }

    /// Sets the threshold, clamped to the nearest range the mode offers.
    pub fn set_range(&mut self, range_minutes: u32) -> bool {
        let range_minutes = self.state.mode.clamp_range(range_minutes);
        if self.state.range_minutes == range_minutes {
            return false;
        }
        self.state.range_minutes = range_minutes;
        self.notify();
        true
    }

    pub fn set_is_3d(&mut self, is_3d: bool) -> bool {
        if self.state.is_3d == is_3d {
            return false;
        }
        self.state.is_3d = is_3d;
        self.notify();
        true
    }

    pub fn set_poi_visible(&mut self, visible: bool) -> bool {
        if self.state.poi_visible == visible {
            return false;
        }
        self.state.poi_visible = visible;
        self.notify();
        true
    }

    /// Advances the pulse phase and returns the new value.
    ///
    /// Runs every display frame, so listeners are not notified.
    pub fn advance_pulse(&mut self, step: f64) -> f64 {
        self.state.pulse_phase = wrap_phase(self.state.pulse_phase + step);
        self.state.pulse_phase
    }

    fn notify(&mut self) {
        let snapshot = self.state;
        for (_, listener) in &mut self.listeners {
            listener(&snapshot);
        }
    }
}

fn wrap_phase(phase: f64) -> f64 {
    if phase.is_finite() { phase.rem_euclid(TAU) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::{ViewState, ViewStateStore};
    use crate::mode::TransportMode;
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    #[test]
    fn defaults_match_startup_state() {
        let s = ViewStateStore::default().snapshot();
        assert_eq!(s.mode, TransportMode::Walk);
        assert_eq!(s.range_minutes, 15);
        assert!(!s.is_3d);
        assert!(s.poi_visible);
    }

    #[test]
    fn mode_change_resets_unavailable_range() {
        let mut store = ViewStateStore::default();
        store.set_mode(TransportMode::Car);
        store.set_range(30);
        assert_eq!(store.snapshot().range_minutes, 30);

        store.set_mode(TransportMode::Walk);
        assert_eq!(store.snapshot().range_minutes, 10);

        store.set_range(15);
        store.set_mode(TransportMode::Transit);
        assert_eq!(store.snapshot().range_minutes, 15);
    }

    #[test]
    fn listeners_see_each_change_once() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut store = ViewStateStore::default();
        let sink = Rc::clone(&seen);
        store.subscribe(move |s: &ViewState| sink.borrow_mut().push((s.mode, s.range_minutes)));

        assert!(store.set_mode(TransportMode::Car));
        assert!(!store.set_mode(TransportMode::Car));
        assert!(store.set_range(20));
        assert!(!store.set_range(20));

        assert_eq!(
            *seen.borrow(),
            vec![(TransportMode::Car, 15), (TransportMode::Car, 20)]
        );
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let count = Rc::new(RefCell::new(0));
        let mut store = ViewStateStore::default();
        let c = Rc::clone(&count);
        let id = store.subscribe(move |_| *c.borrow_mut() += 1);
        store.set_is_3d(true);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_is_3d(false);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn out_of_domain_range_is_clamped() {
        let mut store = ViewStateStore::default();
        assert!(!store.set_range(45));
        assert_eq!(store.snapshot().range_minutes, 15);
        assert!(store.set_range(0));
        assert_eq!(store.snapshot().range_minutes, 10);
    }

    #[test]
    fn pulse_wraps_and_does_not_notify() {
        let count = Rc::new(RefCell::new(0));
        let mut store = ViewStateStore::default();
        let c = Rc::clone(&count);
        store.subscribe(move |_| *c.borrow_mut() += 1);

        let phase = store.advance_pulse(TAU + 0.5);
        assert!((phase - 0.5).abs() < 1e-12);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn initial_state_is_normalized() {
        let store = ViewStateStore::new(ViewState {
            range_minutes: 30,
            ..ViewState::default()
        });
        assert_eq!(store.snapshot().range_minutes, 15);
    }
}
