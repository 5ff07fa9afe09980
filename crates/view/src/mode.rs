use serde::{Deserialize, Serialize};

/// Travel mode the coverage columns are computed for.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Walk,
    Car,
    Transit,
}

const WALK_RANGES: &[u32] = &[10, 15];
const MOTOR_RANGES: &[u32] = &[10, 15, 20, 30];

impl TransportMode {
    pub const ALL: [TransportMode; 3] = [TransportMode::Walk, TransportMode::Car, TransportMode::Transit];

    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Walk => "walk",
            TransportMode::Car => "car",
            TransportMode::Transit => "transit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }

    /// Time thresholds (minutes) the dataset carries for this mode, ascending.
    pub fn allowed_ranges(self) -> &'static [u32] {
        match self {
            TransportMode::Walk => WALK_RANGES,
            TransportMode::Car | TransportMode::Transit => MOTOR_RANGES,
        }
    }

    pub fn allows(self, range_minutes: u32) -> bool {
        self.allowed_ranges().contains(&range_minutes)
    }

    /// The allowed range closest to `range_minutes`; ties go to the smaller.
    pub fn clamp_range(self, range_minutes: u32) -> u32 {
        let ranges = self.allowed_ranges();
        let mut best = ranges[0];
        for &r in ranges {
            if r.abs_diff(range_minutes) < best.abs_diff(range_minutes) {
                best = r;
            }
        }
        best
    }

    /// Verb phrase used in the coverage headline.
    pub fn phrase(self) -> &'static str {
        match self {
            TransportMode::Walk => "walk",
            TransportMode::Car => "drive",
            TransportMode::Transit => "get to a clinic by public transport",
        }
    }
}
