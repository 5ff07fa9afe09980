use std::time::Duration;

use formats::IconDecodeError;
use foundation::time::Time;
use layers::ids::{
    COVERAGE_LAYER, COVERAGE_SOURCE, MARKER_ICON, MARKER_ICON_PIXEL_RATIO, MARKER_LAYER,
    POI_SOURCE, RAW_POI_LAYER, STALE_COVERAGE_LAYER,
};
use layers::{LayerDescriptor, Reconciler, marker_layer_spec};
use runtime::timer_queue::TimerQueue;
use surface::{
    Bitmap, ImageOptions, LayerEvent, LayerInfo, LayerKind, RenderingSurface, SourceSpec,
    SubscriptionId, SurfaceError, VISIBILITY, visibility_value,
};
use tracing::{debug, info, warn};
use view::ViewState;

const LAYER_EVENTS: [LayerEvent; 3] = [
    LayerEvent::Click,
    LayerEvent::MouseEnter,
    LayerEvent::MouseLeave,
];

/// Startup progress. Only moves forward.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapPhase {
    Uninitialized,
    StyleLoading,
    SourcesReady,
    /// The marker icon step has resolved, with or without the custom layer.
    MarkerLayerReady,
    Live,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSettings {
    pub coverage_url: String,
    pub poi_url: String,
    pub settle_delay: Duration,
    pub settle_retries: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BootstrapTimer {
    Settle { attempt: u32 },
}

/// Brings the surface from a freshly loaded style to the live dashboard.
///
/// Style load and icon decode complete independently and in either order;
/// an icon that arrives first is held until the sources exist. The settle
/// check re-applies the view state and reveals the map once the coverage
/// layer is in place, giving up after a bounded number of retries.
#[derive(Debug)]
pub struct BootstrapSequencer {
    settings: BootstrapSettings,
    phase: BootstrapPhase,
    pending_icon: Option<Result<Bitmap, IconDecodeError>>,
    timers: TimerQueue<BootstrapTimer>,
    subscriptions: Vec<SubscriptionId>,
}

impl BootstrapSequencer {
    pub fn new(settings: BootstrapSettings) -> Self {
        Self {
            settings,
            phase: BootstrapPhase::Uninitialized,
            pending_icon: None,
            timers: TimerQueue::new(),
            subscriptions: Vec::new(),
        }
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    pub fn is_live(&self) -> bool {
        self.phase == BootstrapPhase::Live
    }

    pub fn subscriptions(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    pub fn next_due(&self) -> Option<Time> {
        self.timers.next_due()
    }

    /// The host has started loading the base style.
    pub fn begin(&mut self) {
        if self.phase == BootstrapPhase::Uninitialized {
            self.phase = BootstrapPhase::StyleLoading;
        }
    }

    /// Runs the style-dependent setup. Returns `false` if it already ran.
    pub fn on_style_ready(
        &mut self,
        surface: &mut dyn RenderingSurface,
        now: Time,
        reconciler: &mut Reconciler,
        view: &ViewState,
    ) -> bool {
        if self.phase >= BootstrapPhase::SourcesReady {
            warn!("style ready signalled again; ignoring");
            return false;
        }
        self.phase = BootstrapPhase::StyleLoading;

        match surface.get_layer(RAW_POI_LAYER) {
            Some(_) => set_visible(surface, RAW_POI_LAYER, true),
            None => warn!("style has no {RAW_POI_LAYER} layer"),
        }
        if surface.get_layer(STALE_COVERAGE_LAYER).is_some() {
            match surface.remove_layer(STALE_COVERAGE_LAYER) {
                Ok(()) => info!("removed stale coverage layer {STALE_COVERAGE_LAYER}"),
                Err(err) => warn!("removing {STALE_COVERAGE_LAYER} failed: {err}"),
            }
        }

        let coverage_url = self.settings.coverage_url.clone();
        let poi_url = self.settings.poi_url.clone();
        let coverage_source = ensure_source(surface, COVERAGE_SOURCE, coverage_url);
        ensure_source(surface, POI_SOURCE, poi_url);
        if coverage_source {
            install_coverage_layer(surface, reconciler, view);
        }
        self.subscribe_layer(surface, COVERAGE_LAYER);

        self.phase = BootstrapPhase::SourcesReady;
        self.timers.schedule(
            now.after(self.settings.settle_delay),
            BootstrapTimer::Settle { attempt: 0 },
        );
        info!("sources ready");

        if let Some(icon) = self.pending_icon.take() {
            self.install_markers(surface, icon, reconciler, view);
        }
        true
    }

    /// Accepts the decoded marker icon, or the reason it is unavailable.
    pub fn on_icon_decoded(
        &mut self,
        surface: &mut dyn RenderingSurface,
        icon: Result<Bitmap, IconDecodeError>,
        reconciler: &mut Reconciler,
        view: &ViewState,
    ) {
        if self.phase < BootstrapPhase::SourcesReady {
            debug!("icon decoded before style; holding it");
            self.pending_icon = Some(icon);
            return;
        }
        if surface.get_layer(MARKER_LAYER).is_some() {
            debug!("marker layer already installed; icon ignored");
            return;
        }
        self.install_markers(surface, icon, reconciler, view);
    }

    /// Fires due settle checks. Returns `true` when the dashboard went live.
    pub fn poll(
        &mut self,
        surface: &mut dyn RenderingSurface,
        now: Time,
        reconciler: &mut Reconciler,
        view: &ViewState,
    ) -> bool {
        let mut went_live = false;
        while let Some((_, timer)) = self.timers.pop_due(now) {
            match timer {
                BootstrapTimer::Settle { attempt } => {
                    went_live |= self.settle(surface, now, attempt, reconciler, view);
                }
            }
        }
        went_live
    }

    /// Drops every subscription and pending timer.
    pub fn shutdown(&mut self, surface: &mut dyn RenderingSurface) {
        for id in self.subscriptions.drain(..) {
            if let Err(err) = surface.unsubscribe(id) {
                warn!("unsubscribe {} failed: {err}", id.0);
            }
        }
        self.timers.clear();
        self.pending_icon = None;
    }

    fn settle(
        &mut self,
        surface: &mut dyn RenderingSurface,
        now: Time,
        attempt: u32,
        reconciler: &mut Reconciler,
        view: &ViewState,
    ) -> bool {
        if self.phase == BootstrapPhase::Live {
            return false;
        }
        let coverage_ready = surface.get_layer(COVERAGE_LAYER).is_some();
        let markers_ready = self.phase >= BootstrapPhase::MarkerLayerReady;

        if !(coverage_ready && markers_ready) {
            if attempt < self.settings.settle_retries {
                debug!("settle check {attempt}: not ready, retrying");
                self.timers.schedule(
                    now.after(self.settings.settle_delay),
                    BootstrapTimer::Settle {
                        attempt: attempt + 1,
                    },
                );
                return false;
            }
            if !coverage_ready {
                warn!("coverage layer still missing after {attempt} retries; revealing anyway");
            }
            if !markers_ready {
                warn!("marker icon unresolved; revealing with the style's markers");
            }
        }

        reconciler.forget(COVERAGE_LAYER);
        reconciler.forget(MARKER_LAYER);
        reconciler.forget(RAW_POI_LAYER);
        let report = reconciler.reconcile(surface, view);
        if report.failed > 0 {
            warn!("{} mutation(s) failed while settling", report.failed);
        }
        surface.set_container_visible(true);
        self.phase = BootstrapPhase::Live;
        info!("dashboard live");
        true
    }

    fn install_markers(
        &mut self,
        surface: &mut dyn RenderingSurface,
        icon: Result<Bitmap, IconDecodeError>,
        reconciler: &mut Reconciler,
        view: &ViewState,
    ) {
        match icon {
            Err(err) => warn!("marker icon unavailable, keeping style markers: {err}"),
            Ok(bitmap) => match add_marker_layer(surface, bitmap, view.poi_visible) {
                Ok(()) => {
                    info!("custom marker layer installed");
                    if surface.get_layer(RAW_POI_LAYER).is_some() {
                        set_visible(surface, RAW_POI_LAYER, false);
                    }
                    self.subscribe_layer(surface, MARKER_LAYER);
                    reconciler.forget(MARKER_LAYER);
                    reconciler.reconcile(surface, view);
                }
                Err(err) => warn!("marker layer not installed, keeping style markers: {err}"),
            },
        }
        if self.phase == BootstrapPhase::SourcesReady {
            self.phase = BootstrapPhase::MarkerLayerReady;
        }
    }

    fn subscribe_layer(&mut self, surface: &mut dyn RenderingSurface, layer: &str) {
        for event in LAYER_EVENTS {
            match surface.subscribe(event, layer) {
                Ok(id) => self.subscriptions.push(id),
                Err(err) => warn!("subscribing {event:?} on {layer} failed: {err}"),
            }
        }
    }
}

fn set_visible(surface: &mut dyn RenderingSurface, layer: &str, visible: bool) {
    if let Err(err) = surface.set_layout_property(layer, VISIBILITY, &visibility_value(visible)) {
        warn!("setting visibility of {layer} failed: {err}");
    }
}

/// Adds the GeoJSON source unless the style already carries one by that id.
fn ensure_source(surface: &mut dyn RenderingSurface, id: &str, url: String) -> bool {
    if surface.has_source(id) {
        debug!("source {id} already present");
        return true;
    }
    match surface.add_source(id, SourceSpec::GeoJson { url }) {
        Ok(()) => true,
        Err(err) => {
            warn!("adding source {id} failed: {err}");
            false
        }
    }
}

fn install_coverage_layer(
    surface: &mut dyn RenderingSurface,
    reconciler: &mut Reconciler,
    view: &ViewState,
) {
    if let Some(existing) = surface.get_layer(COVERAGE_LAYER) {
        debug!("coverage layer present as {}", existing.kind.as_str());
        return;
    }
    let info = LayerInfo {
        id: COVERAGE_LAYER.to_string(),
        kind: LayerKind::Fill,
        source: Some(COVERAGE_SOURCE.to_string()),
    };
    let Some(descriptor) = LayerDescriptor::coverage(&info, view) else {
        return;
    };
    match surface.add_layer(descriptor.to_spec()) {
        Ok(()) => reconciler.record_created(&descriptor),
        Err(err) => warn!("creating coverage layer failed: {err}"),
    }
}

fn add_marker_layer(
    surface: &mut dyn RenderingSurface,
    bitmap: Bitmap,
    visible: bool,
) -> Result<(), SurfaceError> {
    if !surface.has_image(MARKER_ICON) {
        surface.add_image(
            MARKER_ICON,
            bitmap,
            ImageOptions {
                pixel_ratio: MARKER_ICON_PIXEL_RATIO,
            },
        )?;
    }
    surface.add_layer(marker_layer_spec(visible))
}

#[cfg(test)]
mod tests {
    use super::{BootstrapPhase, BootstrapSequencer, BootstrapSettings};
    use formats::IconDecodeError;
    use foundation::time::Time;
    use layers::Reconciler;
    use layers::ids::{
        COVERAGE_LAYER, COVERAGE_SOURCE, MARKER_LAYER, POI_SOURCE, RAW_POI_LAYER,
        STALE_COVERAGE_LAYER,
    };
    use std::time::Duration;
    use surface::{
        Bitmap, CallKind, Expr, LayerKind, RecordingSurface, RenderingSurface, SurfaceCall,
    };
    use view::ViewState;

    fn settings() -> BootstrapSettings {
        BootstrapSettings {
            coverage_url: "coverage.geojson".into(),
            poi_url: "poi.geojson".into(),
            settle_delay: Duration::from_millis(1000),
            settle_retries: 2,
        }
    }

    fn style() -> RecordingSurface {
        RecordingSurface::new()
            .with_style_layer(RAW_POI_LAYER, LayerKind::Circle, None)
            .with_style_layer(STALE_COVERAGE_LAYER, LayerKind::Fill, None)
    }

    fn icon() -> Bitmap {
        Bitmap {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    }

    #[test]
    fn style_ready_installs_sources_and_coverage() {
        let mut s = style();
        let mut r = Reconciler::new();
        let mut b = BootstrapSequencer::new(settings());
        b.begin();
        assert_eq!(b.phase(), BootstrapPhase::StyleLoading);

        assert!(b.on_style_ready(&mut s, Time(0), &mut r, &ViewState::default()));
        assert_eq!(b.phase(), BootstrapPhase::SourcesReady);
        assert!(s.get_layer(STALE_COVERAGE_LAYER).is_none());
        assert!(s.has_source(COVERAGE_SOURCE));
        assert!(s.has_source(POI_SOURCE));
        assert_eq!(s.get_layer(COVERAGE_LAYER).map(|l| l.kind), Some(LayerKind::Fill));
        assert_eq!(b.subscriptions().len(), 3);
        assert!(!s.is_container_visible());

        // The freshly created layer needs no reconcile.
        s.take_calls();
        r.reconcile(&mut s, &ViewState::default());
        assert!(
            !s.calls()
                .iter()
                .any(|c| c.target() == Some(COVERAGE_LAYER))
        );
    }

    #[test]
    fn second_style_ready_is_ignored() {
        let mut s = style();
        let mut r = Reconciler::new();
        let mut b = BootstrapSequencer::new(settings());
        b.on_style_ready(&mut s, Time(0), &mut r, &ViewState::default());
        s.take_calls();
        assert!(!b.on_style_ready(&mut s, Time(5), &mut r, &ViewState::default()));
        assert!(s.calls().is_empty());
    }

    #[test]
    fn early_icon_is_held_until_sources_exist() {
        let mut s = style();
        let mut r = Reconciler::new();
        let mut b = BootstrapSequencer::new(settings());
        let v = ViewState::default();

        b.on_icon_decoded(&mut s, Ok(icon()), &mut r, &v);
        assert!(s.calls().is_empty());
        assert_eq!(b.phase(), BootstrapPhase::Uninitialized);

        b.on_style_ready(&mut s, Time(0), &mut r, &v);
        assert_eq!(b.phase(), BootstrapPhase::MarkerLayerReady);
        assert!(s.get_layer(MARKER_LAYER).is_some());
        assert_eq!(s.layout(RAW_POI_LAYER, "visibility"), Some(&Expr::lit("none")));
        assert_eq!(s.layout(MARKER_LAYER, "visibility"), Some(&Expr::lit("visible")));
        assert_eq!(b.subscriptions().len(), 6);
    }

    #[test]
    fn failed_icon_keeps_raw_markers() {
        let mut s = style();
        let mut r = Reconciler::new();
        let mut b = BootstrapSequencer::new(settings());
        let v = ViewState::default();
        b.on_style_ready(&mut s, Time(0), &mut r, &v);
        b.on_icon_decoded(&mut s, Err(IconDecodeError::Empty), &mut r, &v);

        assert_eq!(b.phase(), BootstrapPhase::MarkerLayerReady);
        assert!(s.get_layer(MARKER_LAYER).is_none());
        assert_eq!(s.layout(RAW_POI_LAYER, "visibility"), Some(&Expr::lit("visible")));
    }

    #[test]
    fn rejected_marker_layer_falls_back() {
        let mut s = style();
        s.fail_once(CallKind::AddLayer, MARKER_LAYER);
        let mut r = Reconciler::new();
        let mut b = BootstrapSequencer::new(settings());
        let v = ViewState::default();
        b.on_style_ready(&mut s, Time(0), &mut r, &v);
        b.on_icon_decoded(&mut s, Ok(icon()), &mut r, &v);

        assert!(s.get_layer(MARKER_LAYER).is_none());
        assert_eq!(s.layout(RAW_POI_LAYER, "visibility"), Some(&Expr::lit("visible")));
        assert_eq!(b.subscriptions().len(), 3);
    }

    #[test]
    fn settle_reveals_once_ready() {
        let mut s = style();
        let mut r = Reconciler::new();
        let mut b = BootstrapSequencer::new(settings());
        let v = ViewState::default();
        b.on_style_ready(&mut s, Time(0), &mut r, &v);
        b.on_icon_decoded(&mut s, Ok(icon()), &mut r, &v);

        assert!(!b.poll(&mut s, Time(999), &mut r, &v));
        assert!(b.poll(&mut s, Time(1000), &mut r, &v));
        assert!(b.is_live());
        assert!(s.is_container_visible());
        assert_eq!(b.next_due(), None);
    }

    #[test]
    fn settle_retries_are_bounded() {
        let mut s = style();
        // Coverage layer creation fails, so the layer never appears.
        s.fail_once(CallKind::AddLayer, COVERAGE_LAYER);
        let mut r = Reconciler::new();
        let mut b = BootstrapSequencer::new(settings());
        let v = ViewState::default();
        b.on_style_ready(&mut s, Time(0), &mut r, &v);
        b.on_icon_decoded(&mut s, Ok(icon()), &mut r, &v);

        assert!(!b.poll(&mut s, Time(1000), &mut r, &v));
        assert!(!b.poll(&mut s, Time(2000), &mut r, &v));
        assert!(b.poll(&mut s, Time(3000), &mut r, &v));
        assert!(s.is_container_visible());
    }

    #[test]
    fn shutdown_releases_subscriptions() {
        let mut s = style();
        let mut r = Reconciler::new();
        let mut b = BootstrapSequencer::new(settings());
        b.on_style_ready(&mut s, Time(0), &mut r, &ViewState::default());
        assert_eq!(s.subscription_count(), 3);

        b.shutdown(&mut s);
        assert_eq!(s.subscription_count(), 0);
        assert!(b.subscriptions().is_empty());
        assert_eq!(b.next_due(), None);
        assert!(
            s.calls()
                .iter()
                .any(|c| matches!(c, SurfaceCall::Unsubscribe(_)))
        );
    }
}
