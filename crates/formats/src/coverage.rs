use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use view::TransportMode;

/// Age bands the coverage dataset is broken down by.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AgeGroup {
    Under5,
    #[default]
    School,
    Adult,
    Senior,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [
        AgeGroup::Under5,
        AgeGroup::School,
        AgeGroup::Adult,
        AgeGroup::Senior,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgeGroup::Under5 => "0-4",
            AgeGroup::School => "5-18",
            AgeGroup::Adult => "19-64",
            AgeGroup::Senior => "65+",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == s)
    }

    /// Plural noun used in sentences.
    pub fn noun(self) -> &'static str {
        match self {
            AgeGroup::Under5 | AgeGroup::School => "children",
            AgeGroup::Adult => "adults",
            AgeGroup::Senior => "seniors",
        }
    }
}

/// Fields stay loose so a single bad entry can be skipped on its own.
#[derive(Debug, Deserialize)]
struct RawEntry {
    percentage: Option<Value>,
    total_population: Option<Value>,
    accessible_population: Option<Value>,
}

impl RawEntry {
    fn to_entry(&self) -> Option<CoverageEntry> {
        Some(CoverageEntry {
            percentage: round_percent(number(self.percentage.as_ref()?)?),
            total: round_count(number(self.total_population.as_ref()?)?),
            accessible: round_count(number(self.accessible_population.as_ref()?)?),
        })
    }
}

/// Coverage figures for one `(mode, range, age group)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CoverageEntry {
    /// Rounded to the nearest whole percent.
    pub percentage: u32,
    pub total: u64,
    pub accessible: u64,
}

#[derive(Debug)]
pub enum DatasetError {
    Parse(String),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Parse(reason) => write!(f, "coverage dataset parse error: {reason}"),
        }
    }
}

impl std::error::Error for DatasetError {}

/// Demographic coverage: `mode -> minutes -> age group -> figures`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageDataset {
    entries: BTreeMap<(TransportMode, u32, AgeGroup), CoverageEntry>,
}

type RawDataset = BTreeMap<String, Value>;

impl CoverageDataset {
    /// Parses the nested JSON mapping. Time keys may be `"15min"` or `"15"`;
    /// modes and age groups the dashboard does not know are ignored.
    ///
    /// Only a payload that is not a JSON object is an error. Malformed
    /// time keys and entries are skipped with a warning.
    pub fn parse(payload: &str) -> Result<Self, DatasetError> {
        let raw: RawDataset =
            serde_json::from_str(payload).map_err(|e| DatasetError::Parse(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_value(value: Value) -> Result<Self, DatasetError> {
        let raw: RawDataset =
            serde_json::from_value(value).map_err(|e| DatasetError::Parse(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawDataset) -> Self {
        let mut entries = BTreeMap::new();
        for (mode_key, ranges) in raw {
            let Some(mode) = TransportMode::parse(&mode_key) else {
                continue;
            };
            let Some(ranges) = ranges.as_object() else {
                warn!("coverage mode {mode_key} is not an object; skipped");
                continue;
            };
            for (time_key, groups) in ranges {
                let Some(minutes) = parse_time_key(time_key) else {
                    warn!("invalid time key {time_key:?} under mode {mode_key}; skipped");
                    continue;
                };
                let Some(groups) = groups.as_object() else {
                    warn!("coverage {mode_key}/{time_key} is not an object; skipped");
                    continue;
                };
                for (age_key, value) in groups {
                    let Some(age) = AgeGroup::parse(age_key) else {
                        continue;
                    };
                    let entry = RawEntry::deserialize(value)
                        .ok()
                        .and_then(|raw| raw.to_entry());
                    match entry {
                        Some(entry) => {
                            entries.insert((mode, minutes, age), entry);
                        }
                        None => {
                            warn!("malformed coverage entry {mode_key}/{time_key}/{age_key}; skipped")
                        }
                    }
                }
            }
        }
        Self { entries }
    }

    pub fn lookup(&self, mode: TransportMode, range_minutes: u32, age: AgeGroup) -> Option<CoverageEntry> {
        self.entries.get(&(mode, range_minutes, age)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_time_key(key: &str) -> Option<u32> {
    key.strip_suffix("min").unwrap_or(key).trim().parse().ok()
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn round_percent(p: f64) -> u32 {
    if p.is_finite() { p.round().clamp(0.0, f64::from(u32::MAX)) as u32 } else { 0 }
}

fn round_count(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 { v.round() as u64 } else { 0 }
}

/// Ready-to-display coverage figures for the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageSummary {
    pub percentage: u32,
    pub accessible: u64,
    pub total: u64,
    pub headline: String,
    pub detail: String,
}

impl CoverageSummary {
    pub fn new(
        entry: CoverageEntry,
        mode: TransportMode,
        range_minutes: u32,
        age: AgeGroup,
        area: &str,
    ) -> Self {
        let noun = age.noun();
        Self {
            percentage: entry.percentage,
            accessible: entry.accessible,
            total: entry.total,
            headline: format!(
                "{}% of {noun} in {area} can {} in {range_minutes}min",
                entry.percentage,
                mode.phrase()
            ),
            detail: format!(
                "This means that {} {noun} in {area} have access, out of {} {noun}",
                group_thousands(entry.accessible),
                group_thousands(entry.total)
            ),
        }
    }
}

/// `6200` -> `"6,200"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
