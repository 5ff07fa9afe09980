use foundation::color::Rgba;
use surface::{CmpOp, Expr, LayerInfo, LayerKind, LayerSpec, VISIBILITY, visibility_value};
use view::ViewState;

use crate::filter::FilterExpression;
use crate::ids::{COVERAGE_SOURCE, DENSITY_PROPERTY, MARKER_ICON, MARKER_LAYER, POI_SOURCE};
use crate::ramp::{DENSITY_DOMAIN_MAX, density_ramp, temporal_ramp};

pub const BASE_OPACITY: f64 = 0.9;
pub const HEATMAP_RADIUS: f64 = 18.0;
pub const HEATMAP_INTENSITY: f64 = 1.1;
pub const CIRCLE_RADIUS: f64 = 6.0;
pub const CIRCLE_STROKE_3D: f64 = 2.0;
/// Extrusion height in meters at [`DENSITY_DOMAIN_MAX`].
pub const EXTRUSION_MAX_HEIGHT: f64 = 500.0;

/// Ordered paint property set. Insertion order is application order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintProperties {
    entries: Vec<(String, Expr)>,
}

impl PaintProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing an earlier value in place.
    pub fn set(&mut self, name: &str, value: Expr) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn with(mut self, name: &str, value: Expr) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Coverage paint for a layer of `kind`. `None` for kinds that cannot
    /// draw coverage polygons.
    pub fn for_coverage(kind: LayerKind, color: Expr, is_3d: bool) -> Option<Self> {
        let paint = match kind {
            LayerKind::Fill => Self::new()
                .with("fill-color", color)
                .with(
                    "fill-opacity",
                    Expr::number(if is_3d { 0.0 } else { BASE_OPACITY }),
                )
                .with("fill-outline-color", Expr::color(Rgba::TRANSPARENT)),
            LayerKind::Heatmap => Self::new()
                .with("heatmap-color", color)
                .with("heatmap-radius", Expr::number(HEATMAP_RADIUS))
                .with("heatmap-intensity", Expr::number(HEATMAP_INTENSITY))
                .with("heatmap-opacity", Expr::number(BASE_OPACITY)),
            // Circles have no extrusion; 3D outlines them instead.
            LayerKind::Circle => Self::new()
                .with("circle-color", color)
                .with("circle-opacity", Expr::number(BASE_OPACITY))
                .with("circle-radius", Expr::number(CIRCLE_RADIUS))
                .with(
                    "circle-stroke-width",
                    Expr::number(if is_3d { CIRCLE_STROKE_3D } else { 0.0 }),
                )
                .with("circle-stroke-color", Expr::color(Rgba::WHITE)),
            LayerKind::Extrusion | LayerKind::Symbol => return None,
        };
        Some(paint)
    }

    /// Extrusion paint: density drives both height and color.
    pub fn for_extrusion(opacity: f64) -> Self {
        let density = Expr::numeric_column(DENSITY_PROPERTY);
        Self::new()
            .with("fill-extrusion-color", density_ramp().to_expr(density.clone()))
            .with("fill-extrusion-height", extrusion_height(density))
            .with("fill-extrusion-base", Expr::number(0.0))
            .with("fill-extrusion-opacity", Expr::number(opacity))
            .with("fill-extrusion-vertical-gradient", Expr::lit(false))
    }
}

pub fn extrusion_height(density: Expr) -> Expr {
    Expr::interpolate_linear(
        density,
        vec![
            (0.0, Expr::number(0.0)),
            (DENSITY_DOMAIN_MAX, Expr::number(EXTRUSION_MAX_HEIGHT)),
        ],
    )
}

pub const MARKER_ICON_SIZE: f64 = 0.8;
pub const MARKER_ICON_OPACITY: f64 = 0.8;

/// Symbol layer drawing [`MARKER_ICON`] at every point of the POI source.
pub fn marker_layer_spec(visible: bool) -> LayerSpec {
    LayerSpec::new(MARKER_LAYER, LayerKind::Symbol, POI_SOURCE)
        .with_filter(Expr::cmp(CmpOp::Eq, Expr::GeometryType, Expr::lit("Point")))
        .with_layout(VISIBILITY, visibility_value(visible))
        .with_layout("icon-image", Expr::lit(MARKER_ICON))
        .with_layout("icon-size", Expr::number(MARKER_ICON_SIZE))
        .with_layout("icon-allow-overlap", Expr::lit(true))
        .with_layout("icon-ignore-placement", Expr::lit(true))
        .with_paint("icon-opacity", Expr::number(MARKER_ICON_OPACITY))
}

/// Target state of one overlay layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    pub id: String,
    pub source_id: String,
    pub kind: LayerKind,
    pub visible: bool,
    /// `None` leaves the layer's filter untouched.
    pub filter: Option<FilterExpression>,
    pub paint: PaintProperties,
}

impl LayerDescriptor {
    /// Coverage overlay for the layer the surface reports, colored by the
    /// fixed-domain temporal ramp.
    pub fn coverage(layer: &LayerInfo, state: &ViewState) -> Option<Self> {
        let filter = FilterExpression::for_view(state);
        let color = temporal_ramp().to_expr(filter.value_expr());
        let paint = PaintProperties::for_coverage(layer.kind, color, state.is_3d)?;
        Some(Self {
            id: layer.id.clone(),
            source_id: layer
                .source
                .clone()
                .unwrap_or_else(|| COVERAGE_SOURCE.to_string()),
            kind: layer.kind,
            visible: true,
            filter: Some(filter),
            paint,
        })
    }

    /// Marker visibility only; the pulse owns the icon paint.
    pub fn markers(layer: &LayerInfo, state: &ViewState) -> Self {
        Self {
            id: layer.id.clone(),
            source_id: layer.source.clone().unwrap_or_default(),
            kind: layer.kind,
            visible: state.poi_visible,
            filter: None,
            paint: PaintProperties::new(),
        }
    }

    pub fn extrusion(id: &str, source_id: &str, filter: FilterExpression, opacity: f64) -> Self {
        Self {
            id: id.to_string(),
            source_id: source_id.to_string(),
            kind: LayerKind::Extrusion,
            visible: true,
            filter: Some(filter),
            paint: PaintProperties::for_extrusion(opacity),
        }
    }

    /// Full layer spec for creating the layer from scratch.
    pub fn to_spec(&self) -> LayerSpec {
        let mut spec = LayerSpec::new(self.id.as_str(), self.kind, self.source_id.as_str())
            .with_layout(VISIBILITY, visibility_value(self.visible));
        if let Some(filter) = &self.filter {
            spec = spec.with_filter(filter.to_expr());
        }
        for (name, value) in self.paint.iter() {
            spec = spec.with_paint(name, value.clone());
        }
        spec
    }
}
