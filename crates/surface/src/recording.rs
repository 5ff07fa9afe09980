use std::collections::BTreeMap;

use foundation::geometry::{LngLat, ScreenPoint, ScreenSize};

use crate::error::SurfaceError;
use crate::expr::Expr;
use crate::surface::{
    Bitmap, CameraEase, Cursor, ImageOptions, LayerEvent, LayerInfo, LayerKind, LayerSpec,
    RenderedFeature, RenderingSurface, SourceSpec, SubscriptionId,
};

/// In-memory [`RenderingSurface`] that keeps the layer state it is told to
/// keep and records every successful mutation.
///
/// Used by the headless driver and by tests that need to count calls or
/// inject failures.
#[derive(Debug)]
pub struct RecordingSurface {
    // Draw order: the last layer is on top.
    layers: Vec<RecordedLayer>,
    sources: BTreeMap<String, SourceSpec>,
    images: BTreeMap<String, ImageOptions>,
    subscriptions: BTreeMap<SubscriptionId, (LayerEvent, String)>,
    next_subscription: u64,
    rendered: Vec<RenderedFeature>,
    failures: Vec<Failure>,
    calls: Vec<SurfaceCall>,
    container_visible: bool,
    cursor: Cursor,
    camera: Option<CameraEase>,
    projection: Projection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLayer {
    pub info: LayerInfo,
    pub filter: Option<Expr>,
    pub layout: BTreeMap<String, Expr>,
    pub paint: BTreeMap<String, Expr>,
}

/// One successful mutation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    AddLayer(String),
    RemoveLayer(String),
    MoveLayerToTop(String),
    SetFilter { layer: String, filter: Expr },
    SetPaint { layer: String, name: String, value: Expr },
    SetLayout { layer: String, name: String, value: Expr },
    AddSource(String),
    RemoveSource(String),
    AddImage(String),
    Subscribe { event: LayerEvent, layer: String },
    Unsubscribe(SubscriptionId),
}

impl SurfaceCall {
    /// Id of the layer (or source/image) the call targets.
    pub fn target(&self) -> Option<&str> {
        match self {
            SurfaceCall::AddLayer(id)
            | SurfaceCall::RemoveLayer(id)
            | SurfaceCall::MoveLayerToTop(id)
            | SurfaceCall::AddSource(id)
            | SurfaceCall::RemoveSource(id)
            | SurfaceCall::AddImage(id) => Some(id),
            SurfaceCall::SetFilter { layer, .. }
            | SurfaceCall::SetPaint { layer, .. }
            | SurfaceCall::SetLayout { layer, .. }
            | SurfaceCall::Subscribe { layer, .. } => Some(layer),
            SurfaceCall::Unsubscribe(_) => None,
        }
    }
}

/// Which call an injected failure applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CallKind {
    AddLayer,
    RemoveLayer,
    MoveLayerToTop,
    SetFilter,
    SetPaint,
    SetLayout,
    AddSource,
    AddImage,
}

#[derive(Debug, Clone)]
struct Failure {
    kind: CallKind,
    target: String,
}

/// Equirectangular projection centred on the viewport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    pub center: LngLat,
    pub pixels_per_degree: f64,
    pub viewport: ScreenSize,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            center: LngLat::new(34.791462, 31.252973),
            pixels_per_degree: 20_000.0,
            viewport: ScreenSize::new(1280.0, 800.0),
        }
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            sources: BTreeMap::new(),
            images: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            next_subscription: 0,
            rendered: Vec::new(),
            failures: Vec::new(),
            calls: Vec::new(),
            container_visible: false,
            cursor: Cursor::Default,
            camera: None,
            projection: Projection::default(),
        }
    }

    /// Seeds a layer that the loaded style already contains. Not recorded.
    pub fn with_style_layer(mut self, id: &str, kind: LayerKind, source: Option<&str>) -> Self {
        self.layers.push(RecordedLayer {
            info: LayerInfo {
                id: id.to_string(),
                kind,
                source: source.map(str::to_string),
            },
            filter: None,
            layout: BTreeMap::new(),
            paint: BTreeMap::new(),
        });
        self
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    /// Features returned by every subsequent hit-test.
    pub fn set_rendered_features(&mut self, features: Vec<RenderedFeature>) {
        self.rendered = features;
    }

    /// Makes the next matching call fail with [`SurfaceError::Rejected`].
    pub fn fail_once(&mut self, kind: CallKind, target: &str) {
        self.failures.push(Failure {
            kind,
            target: target.to_string(),
        });
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn layer(&self, id: &str) -> Option<&RecordedLayer> {
        self.layers.iter().find(|l| l.info.id == id)
    }

    /// Layer ids bottom to top.
    pub fn layer_order(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.info.id.as_str()).collect()
    }

    pub fn paint(&self, layer: &str, name: &str) -> Option<&Expr> {
        self.layer(layer)?.paint.get(name)
    }

    pub fn layout(&self, layer: &str, name: &str) -> Option<&Expr> {
        self.layer(layer)?.layout.get(name)
    }

    pub fn filter(&self, layer: &str) -> Option<&Expr> {
        self.layer(layer)?.filter.as_ref()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_container_visible(&self) -> bool {
        self.container_visible
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn camera(&self) -> Option<CameraEase> {
        self.camera
    }

    fn take_failure(&mut self, kind: CallKind, target: &str) -> Result<(), SurfaceError> {
        let Some(idx) = self
            .failures
            .iter()
            .position(|f| f.kind == kind && f.target == target)
        else {
            return Ok(());
        };
        self.failures.remove(idx);
        Err(SurfaceError::Rejected {
            call: call_name(kind),
            reason: format!("injected failure for {target}"),
        })
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut RecordedLayer, SurfaceError> {
        self.layers
            .iter_mut()
            .find(|l| l.info.id == id)
            .ok_or_else(|| SurfaceError::UnknownLayer(id.to_string()))
    }
}

fn call_name(kind: CallKind) -> &'static str {
    match kind {
        CallKind::AddLayer => "addLayer",
        CallKind::RemoveLayer => "removeLayer",
        CallKind::MoveLayerToTop => "moveLayer",
        CallKind::SetFilter => "setFilter",
        CallKind::SetPaint => "setPaintProperty",
        CallKind::SetLayout => "setLayoutProperty",
        CallKind::AddSource => "addSource",
        CallKind::AddImage => "addImage",
    }
}

impl RenderingSurface for RecordingSurface {
    fn get_layer(&self, id: &str) -> Option<LayerInfo> {
        self.layer(id).map(|l| l.info.clone())
    }

    fn add_layer(&mut self, spec: LayerSpec) -> Result<(), SurfaceError> {
        self.take_failure(CallKind::AddLayer, &spec.id)?;
        if self.layer(&spec.id).is_some() {
            return Err(SurfaceError::DuplicateLayer(spec.id));
        }
        if !self.sources.contains_key(&spec.source) {
            return Err(SurfaceError::UnknownSource(spec.source));
        }
        self.calls.push(SurfaceCall::AddLayer(spec.id.clone()));
        self.layers.push(RecordedLayer {
            info: LayerInfo {
                id: spec.id,
                kind: spec.kind,
                source: Some(spec.source),
            },
            filter: spec.filter,
            layout: spec.layout.into_iter().collect(),
            paint: spec.paint.into_iter().collect(),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.take_failure(CallKind::RemoveLayer, id)?;
        let idx = self
            .layers
            .iter()
            .position(|l| l.info.id == id)
            .ok_or_else(|| SurfaceError::UnknownLayer(id.to_string()))?;
        self.layers.remove(idx);
        self.calls.push(SurfaceCall::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn move_layer_to_top(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.take_failure(CallKind::MoveLayerToTop, id)?;
        let idx = self
            .layers
            .iter()
            .position(|l| l.info.id == id)
            .ok_or_else(|| SurfaceError::UnknownLayer(id.to_string()))?;
        let layer = self.layers.remove(idx);
        self.layers.push(layer);
        self.calls.push(SurfaceCall::MoveLayerToTop(id.to_string()));
        Ok(())
    }

    fn set_filter(&mut self, id: &str, filter: &Expr) -> Result<(), SurfaceError> {
        self.take_failure(CallKind::SetFilter, id)?;
        self.layer_mut(id)?.filter = Some(filter.clone());
        self.calls.push(SurfaceCall::SetFilter {
            layer: id.to_string(),
            filter: filter.clone(),
        });
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        id: &str,
        name: &str,
        value: &Expr,
    ) -> Result<(), SurfaceError> {
        self.take_failure(CallKind::SetPaint, id)?;
        let layer = self.layer_mut(id)?;
        if !paint_allowed(layer.info.kind, name) {
            return Err(SurfaceError::Rejected {
                call: "setPaintProperty",
                reason: format!("{name} is not a {} paint property", layer.info.kind.as_str()),
            });
        }
        layer.paint.insert(name.to_string(), value.clone());
        self.calls.push(SurfaceCall::SetPaint {
            layer: id.to_string(),
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn set_layout_property(
        &mut self,
        id: &str,
        name: &str,
        value: &Expr,
    ) -> Result<(), SurfaceError> {
        self.take_failure(CallKind::SetLayout, id)?;
        self.layer_mut(id)?
            .layout
            .insert(name.to_string(), value.clone());
        self.calls.push(SurfaceCall::SetLayout {
            layer: id.to_string(),
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), SurfaceError> {
        self.take_failure(CallKind::AddSource, id)?;
        if self.sources.contains_key(id) {
            return Err(SurfaceError::DuplicateSource(id.to_string()));
        }
        self.sources.insert(id.to_string(), spec);
        self.calls.push(SurfaceCall::AddSource(id.to_string()));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError> {
        if self
            .layers
            .iter()
            .any(|l| l.info.source.as_deref() == Some(id))
        {
            return Err(SurfaceError::Rejected {
                call: "removeSource",
                reason: format!("source {id} is still used by a layer"),
            });
        }
        self.sources
            .remove(id)
            .ok_or_else(|| SurfaceError::UnknownSource(id.to_string()))?;
        self.calls.push(SurfaceCall::RemoveSource(id.to_string()));
        Ok(())
    }

    fn has_image(&self, id: &str) -> bool {
        self.images.contains_key(id)
    }

    fn add_image(
        &mut self,
        id: &str,
        _bitmap: Bitmap,
        options: ImageOptions,
    ) -> Result<(), SurfaceError> {
        self.take_failure(CallKind::AddImage, id)?;
        if self.images.contains_key(id) {
            return Err(SurfaceError::DuplicateImage(id.to_string()));
        }
        self.images.insert(id.to_string(), options);
        self.calls.push(SurfaceCall::AddImage(id.to_string()));
        Ok(())
    }

    fn project(&self, at: LngLat) -> ScreenPoint {
        let p = self.projection;
        ScreenPoint::new(
            p.viewport.width / 2.0 + (at.lng - p.center.lng) * p.pixels_per_degree,
            p.viewport.height / 2.0 - (at.lat - p.center.lat) * p.pixels_per_degree,
        )
    }

    fn query_rendered_features(&self, _point: ScreenPoint) -> Vec<RenderedFeature> {
        self.rendered.clone()
    }

    fn subscribe(
        &mut self,
        event: LayerEvent,
        layer_id: &str,
    ) -> Result<SubscriptionId, SurfaceError> {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(id, (event, layer_id.to_string()));
        self.calls.push(SurfaceCall::Subscribe {
            event,
            layer: layer_id.to_string(),
        });
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), SurfaceError> {
        self.subscriptions
            .remove(&id)
            .ok_or(SurfaceError::UnknownSubscription(id.0))?;
        self.calls.push(SurfaceCall::Unsubscribe(id));
        Ok(())
    }

    fn set_container_visible(&mut self, visible: bool) {
        self.container_visible = visible;
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn ease_camera(&mut self, ease: CameraEase) {
        self.camera = Some(ease);
    }
}

// Paint properties are namespaced by layer type in the style spec.
fn paint_allowed(kind: LayerKind, name: &str) -> bool {
    let prefix = match kind {
        LayerKind::Fill => "fill-",
        LayerKind::Heatmap => "heatmap-",
        LayerKind::Circle => "circle-",
        LayerKind::Extrusion => "fill-extrusion-",
        LayerKind::Symbol => return name.starts_with("icon-") || name.starts_with("text-"),
    };
    name.starts_with(prefix) && (kind != LayerKind::Fill || !name.starts_with("fill-extrusion-"))
}
