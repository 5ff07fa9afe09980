use std::env;
use std::time::Duration;

use foundation::geometry::{LngLat, ScreenSize};

/// Every tunable the dashboard reads at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub style_url: String,
    pub coverage_path: String,
    pub polygons_path: String,
    pub poi_path: String,
    pub icon_path: String,
    /// Area named in the coverage headline.
    pub area_name: String,
    pub debounce: Duration,
    pub settle_delay: Duration,
    pub settle_retries: u32,
    pub bubble_timeout: Duration,
    pub viewport: ScreenSize,
    pub center: LngLat,
    pub zoom: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Self {
            style_url: string("DASHBOARD_STYLE_URL", "mapbox://styles/accessibility/clinics"),
            coverage_path: string(
                "DASHBOARD_COVERAGE_PATH",
                "data/demographics_accessibility.json",
            ),
            polygons_path: string(
                "DASHBOARD_POLYGONS_PATH",
                "data/accessibility_heatmap.geojson",
            ),
            poi_path: string("DASHBOARD_POI_PATH", "data/clinics.geojson"),
            icon_path: string("DASHBOARD_ICON_PATH", "data/clinic-icon.png"),
            area_name: string("DASHBOARD_AREA_NAME", "Be'er-Sheva"),
            debounce: Duration::from_millis(env_var_u64(&lookup, "DASHBOARD_DEBOUNCE_MS", 100)),
            settle_delay: Duration::from_millis(env_var_u64(&lookup, "DASHBOARD_SETTLE_MS", 1000)),
            settle_retries: env_var_u32(&lookup, "DASHBOARD_SETTLE_RETRIES", 3),
            bubble_timeout: Duration::from_millis(env_var_u64(
                &lookup,
                "DASHBOARD_BUBBLE_TIMEOUT_MS",
                3000,
            )),
            viewport: ScreenSize::new(
                env_var_f64(&lookup, "DASHBOARD_VIEWPORT_WIDTH", 1280.0),
                env_var_f64(&lookup, "DASHBOARD_VIEWPORT_HEIGHT", 800.0),
            ),
            center: LngLat::new(34.791462, 31.252973),
            zoom: 13.0,
        }
    }
}

fn env_var_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::DashboardConfig;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let c = DashboardConfig::default();
        assert_eq!(c.debounce, Duration::from_millis(100));
        assert_eq!(c.settle_delay, Duration::from_millis(1000));
        assert_eq!(c.settle_retries, 3);
        assert_eq!(c.bubble_timeout, Duration::from_millis(3000));
        assert_eq!(c.area_name, "Be'er-Sheva");
        assert_eq!((c.viewport.width, c.viewport.height), (1280.0, 800.0));
    }

    #[test]
    fn overrides_and_bad_values() {
        let c = DashboardConfig::from_lookup(|key| match key {
            "DASHBOARD_DEBOUNCE_MS" => Some("250".into()),
            "DASHBOARD_SETTLE_RETRIES" => Some("many".into()),
            "DASHBOARD_AREA_NAME" => Some("Haifa".into()),
            _ => None,
        });
        assert_eq!(c.debounce, Duration::from_millis(250));
        assert_eq!(c.settle_retries, 3);
        assert_eq!(c.area_name, "Haifa");
    }
}
