//! Property tests for the view-state clamp invariant.
//!
//! 1. After any sequence of setter calls the range is one the mode offers.
//! 2. Switching mode keeps an allowed range and resets any other to the
//!    mode's first range.
//! 3. Setters report a change exactly when the snapshot changes.

use proptest::prelude::*;
use view::mode::TransportMode;
use view::view_state::ViewStateStore;

#[derive(Debug, Clone)]
enum Op {
    Mode(TransportMode),
    Range(u32),
    Is3d(bool),
    Poi(bool),
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn mode_strategy() -> impl Strategy<Value = TransportMode> {
    prop_oneof![
        Just(TransportMode::Walk),
        Just(TransportMode::Car),
        Just(TransportMode::Transit),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        mode_strategy().prop_map(Op::Mode),
        (0u32..=60).prop_map(Op::Range),
        any::<bool>().prop_map(Op::Is3d),
        any::<bool>().prop_map(Op::Poi),
    ]
}

fn apply(store: &mut ViewStateStore, op: &Op) -> bool {
    match *op {
        Op::Mode(m) => store.set_mode(m),
        Op::Range(r) => store.set_range(r),
        Op::Is3d(b) => store.set_is_3d(b),
        Op::Poi(b) => store.set_poi_visible(b),
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Range always allowed
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn range_always_allowed(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let mut store = ViewStateStore::default();
        for op in &ops {
            apply(&mut store, op);
            let s = store.snapshot();
            prop_assert!(s.mode.allows(s.range_minutes), "{:?} after {:?}", s, op);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Mode switch clamp
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mode_switch_clamps_to_first(from in mode_strategy(), to in mode_strategy(), range in 0u32..=60) {
        let mut store = ViewStateStore::default();
        store.set_mode(from);
        store.set_range(range);
        let before = store.snapshot().range_minutes;

        store.set_mode(to);
        let after = store.snapshot().range_minutes;
        if to.allows(before) {
            prop_assert_eq!(after, before);
        } else {
            prop_assert_eq!(after, to.allowed_ranges()[0]);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Change reporting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn setters_report_changes(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let mut store = ViewStateStore::default();
        for op in &ops {
            let before = store.snapshot();
            let changed = apply(&mut store, op);
            prop_assert_eq!(changed, store.snapshot() != before);
        }
    }
}
