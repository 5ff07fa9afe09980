use serde_json::{Map, Value};

/// Proportion properties carried by each point of interest.
pub const POI_CATEGORIES: [&str; 8] = [
    "community",
    "education",
    "food",
    "healthcare",
    "recreation",
    "retail",
    "services",
    "transport",
];

const FALLBACK_NAME: &str = "Clinic Information";

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: &'static str,
    pub value: f64,
    /// Share of the category total, rounded.
    pub percentage: u32,
}

/// Popup payload for a clicked point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiDetails {
    pub name: String,
    /// Non-zero categories, largest share first.
    pub categories: Vec<CategoryShare>,
}

impl PoiDetails {
    pub fn from_properties(properties: &Map<String, Value>) -> Self {
        let name = properties
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_NAME)
            .replace('_', " ");

        let values: Vec<(&'static str, f64)> = POI_CATEGORIES
            .iter()
            .map(|&c| (c, numeric(properties.get(c))))
            .collect();
        let total: f64 = values.iter().map(|(_, v)| v).sum();

        let mut categories: Vec<CategoryShare> = values
            .into_iter()
            .filter(|&(_, v)| v > 0.0)
            .map(|(category, value)| CategoryShare {
                category,
                value,
                percentage: if total > 0.0 {
                    (value / total * 100.0).round() as u32
                } else {
                    0
                },
            })
            .collect();
        categories.sort_by(|a, b| b.value.total_cmp(&a.value));

        Self { name, categories }
    }
}

// Numbers or numeric strings; anything else reads as 0.
fn numeric(value: Option<&Value>) -> f64 {
    let v = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}
