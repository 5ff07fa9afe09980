//! Fixed ids shared with the base style and the dashboard's own overlays.

/// Point-of-interest layer baked into the base style.
pub const RAW_POI_LAYER: &str = "clalit-poi-200-1898zd";
/// Coverage layer left over from an earlier style revision; removed on load.
pub const STALE_COVERAGE_LAYER: &str = "clalit-accessibility-heatmap-3v21at";

pub const COVERAGE_SOURCE: &str = "clalit-accessibility-heatmap-new";
pub const COVERAGE_LAYER: &str = "clalit-accessibility-heatmap-new";

pub const POI_SOURCE: &str = "clalit-poi-updated";
/// Symbol layer drawing the custom marker icon.
pub const MARKER_LAYER: &str = "clalit-poi-icons";
pub const MARKER_ICON: &str = "clalit-icon";
pub const MARKER_ICON_PIXEL_RATIO: f64 = 2.0;

/// Polygon property holding people per cell.
pub const DENSITY_PROPERTY: &str = "density";

pub fn extrusion_layer_id(base: &str) -> String {
    format!("{base}-3d")
}

/// Layers whose features count as a hit for click handling.
pub fn is_interactive_layer(id: &str) -> bool {
    id == MARKER_LAYER || id == COVERAGE_LAYER || id == STALE_COVERAGE_LAYER
}
