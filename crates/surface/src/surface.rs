use std::time::Duration;

use foundation::geometry::{LngLat, ScreenPoint};
use serde_json::{Map, Value};

use crate::error::SurfaceError;
use crate::expr::Expr;

/// Layer types the dashboard creates or reads back from the style.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Fill,
    Heatmap,
    Circle,
    Extrusion,
    Symbol,
}

impl LayerKind {
    /// Style-spec name of the layer type.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Fill => "fill",
            LayerKind::Heatmap => "heatmap",
            LayerKind::Circle => "circle",
            LayerKind::Extrusion => "fill-extrusion",
            LayerKind::Symbol => "symbol",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fill" => Some(LayerKind::Fill),
            "heatmap" => Some(LayerKind::Heatmap),
            "circle" => Some(LayerKind::Circle),
            "fill-extrusion" => Some(LayerKind::Extrusion),
            "symbol" => Some(LayerKind::Symbol),
            _ => None,
        }
    }
}

/// Layer metadata as reported by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: String,
    pub kind: LayerKind,
    pub source: Option<String>,
}

/// Full description passed to [`RenderingSurface::add_layer`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub kind: LayerKind,
    pub source: String,
    pub filter: Option<Expr>,
    pub layout: Vec<(String, Expr)>,
    pub paint: Vec<(String, Expr)>,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, kind: LayerKind, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
            filter: None,
            layout: Vec::new(),
            paint: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_layout(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.layout.push((name.into(), value));
        self
    }

    pub fn with_paint(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.paint.push((name.into(), value));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// GeoJSON fetched by the engine from `url`.
    GeoJson { url: String },
}

/// Decoded image pixels, RGBA8 row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImageOptions {
    pub pixel_ratio: f64,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { pixel_ratio: 1.0 }
    }
}

/// Pointer events the surface can scope to a layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerEvent {
    Click,
    MouseEnter,
    MouseLeave,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// A feature returned by hit-testing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub layer_id: String,
    pub geometry_type: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

/// Animated camera move. Presentation only; nothing waits on it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraEase {
    pub pitch_deg: f64,
    pub bearing_deg: f64,
    pub duration: Duration,
}

/// Layout value for the `visibility` property.
pub fn visibility_value(visible: bool) -> Expr {
    Expr::lit(if visible { "visible" } else { "none" })
}

pub const VISIBILITY: &str = "visibility";

/// The external vector-map engine.
///
/// Calls that name an id may fail if the id is unknown; implementations must
/// leave their state untouched when they return an error.
pub trait RenderingSurface {
    fn get_layer(&self, id: &str) -> Option<LayerInfo>;
    fn add_layer(&mut self, spec: LayerSpec) -> Result<(), SurfaceError>;
    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError>;
    /// Moves the layer to the top of the draw order.
    fn move_layer_to_top(&mut self, id: &str) -> Result<(), SurfaceError>;
    fn set_filter(&mut self, id: &str, filter: &Expr) -> Result<(), SurfaceError>;
    fn set_paint_property(&mut self, id: &str, name: &str, value: &Expr)
    -> Result<(), SurfaceError>;
    fn set_layout_property(
        &mut self,
        id: &str,
        name: &str,
        value: &Expr,
    ) -> Result<(), SurfaceError>;

    fn has_source(&self, id: &str) -> bool;
    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), SurfaceError>;
    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError>;

    fn has_image(&self, id: &str) -> bool;
    fn add_image(
        &mut self,
        id: &str,
        bitmap: Bitmap,
        options: ImageOptions,
    ) -> Result<(), SurfaceError>;

    fn project(&self, at: LngLat) -> ScreenPoint;
    fn query_rendered_features(&self, point: ScreenPoint) -> Vec<RenderedFeature>;

    fn subscribe(&mut self, event: LayerEvent, layer_id: &str)
    -> Result<SubscriptionId, SurfaceError>;
    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), SurfaceError>;

    /// Shows or hides the map container element.
    fn set_container_visible(&mut self, visible: bool);
    fn set_cursor(&mut self, cursor: Cursor);
    fn ease_camera(&mut self, ease: CameraEase);
}

#[cfg(test)]
mod tests {
    use super::{LayerKind, visibility_value};
    use serde_json::Value;

    #[test]
    fn layer_kind_names_roundtrip() {
        for kind in [
            LayerKind::Fill,
            LayerKind::Heatmap,
            LayerKind::Circle,
            LayerKind::Extrusion,
            LayerKind::Symbol,
        ] {
            assert_eq!(LayerKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(LayerKind::parse("raster"), None);
    }

    #[test]
    fn visibility_uses_style_keywords() {
        assert_eq!(visibility_value(true).to_json(), Value::from("visible"));
        assert_eq!(visibility_value(false).to_json(), Value::from("none"));
    }
}
