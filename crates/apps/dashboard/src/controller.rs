use formats::{
    AgeGroup, CoverageDataset, CoverageSummary, DatasetError, IconDecodeError, PoiDetails,
};
use foundation::geometry::{LngLat, ScreenPoint};
use foundation::time::Time;
use layers::ids::{COVERAGE_LAYER, MARKER_LAYER};
use layers::{ExtrusionManager, FlushReport, Legend, Reconciler, legend};
use runtime::debounce::Debouncer;
use runtime::frame::Frame;
use serde_json::{Map, Value};
use surface::{Bitmap, RenderingSurface};
use tracing::{debug, info, warn};
use view::{ListenerId, PopupState, PulseAnimator, TransportMode, ViewState, ViewStateStore};

use crate::bootstrap::{BootstrapPhase, BootstrapSequencer, BootstrapSettings};
use crate::config::DashboardConfig;
use crate::interaction::{InfoBubble, Interaction};

/// What the coverage side panel shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoveragePanel {
    Loading,
    NoData,
    Summary(CoverageSummary),
}

/// Surface work done during one frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub flush: FlushReport,
    pub went_live: bool,
    pub pulsed: bool,
}

/// The dashboard core, driven entirely by host callbacks.
///
/// Setters record the new view state and queue it behind the debounce
/// window. Surface mutations only happen inside [`Dashboard::on_frame`]
/// and the bootstrap callbacks.
pub struct Dashboard<S: RenderingSurface> {
    surface: S,
    config: DashboardConfig,
    store: ViewStateStore,
    pending: Debouncer<ViewState>,
    reconciler: Reconciler,
    extrusion: ExtrusionManager,
    bootstrap: BootstrapSequencer,
    pulse: PulseAnimator,
    interaction: Interaction,
    coverage: Option<CoverageDataset>,
    age_group: AgeGroup,
    last_frame: Option<Frame>,
    shut_down: bool,
}

impl<S: RenderingSurface> std::fmt::Debug for Dashboard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("view", &self.store.snapshot())
            .field("phase", &self.bootstrap.phase())
            .field("age_group", &self.age_group)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

impl<S: RenderingSurface> Dashboard<S> {
    pub fn new(surface: S, config: DashboardConfig) -> Self {
        Self::with_view(surface, config, ViewState::default())
    }

    pub fn with_view(surface: S, config: DashboardConfig, initial: ViewState) -> Self {
        let store = ViewStateStore::new(initial);
        let mut pulse = PulseAnimator::new();
        pulse.set_enabled(store.snapshot().poi_visible);
        let mut bootstrap = BootstrapSequencer::new(BootstrapSettings {
            coverage_url: config.polygons_path.clone(),
            poi_url: config.poi_path.clone(),
            settle_delay: config.settle_delay,
            settle_retries: config.settle_retries,
        });
        bootstrap.begin();
        let interaction = Interaction::new(config.viewport, config.bubble_timeout);
        Self {
            surface,
            pending: Debouncer::new(config.debounce),
            config,
            store,
            reconciler: Reconciler::new(),
            extrusion: ExtrusionManager::new(),
            bootstrap,
            pulse,
            interaction,
            coverage: None,
            age_group: AgeGroup::default(),
            last_frame: None,
            shut_down: false,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn view(&self) -> ViewState {
        self.store.snapshot()
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.bootstrap.phase()
    }

    pub fn extrusion(&self) -> &ExtrusionManager {
        &self.extrusion
    }

    /// Presentation hook: called synchronously with every view change.
    pub fn subscribe_view(&mut self, listener: impl FnMut(&ViewState) + 'static) -> ListenerId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe_view(&mut self, id: ListenerId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn set_mode(&mut self, now: Time, mode: TransportMode) -> bool {
        let changed = self.store.set_mode(mode);
        self.queue(now, changed)
    }

    pub fn set_range(&mut self, now: Time, range_minutes: u32) -> bool {
        let changed = self.store.set_range(range_minutes);
        self.queue(now, changed)
    }

    pub fn set_is_3d(&mut self, now: Time, is_3d: bool) -> bool {
        let changed = self.store.set_is_3d(is_3d);
        self.queue(now, changed)
    }

    /// Also starts or stops the marker pulse, immediately.
    pub fn set_poi_visible(&mut self, now: Time, visible: bool) -> bool {
        let changed = self.store.set_poi_visible(visible);
        if changed && !self.shut_down {
            self.pulse.set_enabled(visible);
        }
        self.queue(now, changed)
    }

    pub fn set_age_group(&mut self, age: AgeGroup) {
        self.age_group = age;
    }

    pub fn age_group(&self) -> AgeGroup {
        self.age_group
    }

    fn queue(&mut self, now: Time, changed: bool) -> bool {
        if changed && !self.shut_down {
            self.pending.push(now, self.store.snapshot());
        }
        changed
    }

    pub fn on_style_ready(&mut self, now: Time) -> bool {
        if self.shut_down {
            return false;
        }
        let view = self.store.snapshot();
        self.bootstrap
            .on_style_ready(&mut self.surface, now, &mut self.reconciler, &view)
    }

    pub fn on_icon_decoded(&mut self, icon: Result<Bitmap, IconDecodeError>) {
        if self.shut_down {
            return;
        }
        let view = self.store.snapshot();
        self.bootstrap
            .on_icon_decoded(&mut self.surface, icon, &mut self.reconciler, &view);
    }

    /// A failed load degrades to an empty dataset, which reads as no data.
    pub fn set_coverage_dataset(&mut self, dataset: Result<CoverageDataset, DatasetError>) {
        match dataset {
            Ok(d) => {
                info!("coverage dataset loaded: {} entries", d.len());
                self.coverage = Some(d);
            }
            Err(err) => {
                warn!("coverage dataset unavailable: {err}");
                self.coverage = Some(CoverageDataset::default());
            }
        }
    }

    pub fn coverage_panel(&self) -> CoveragePanel {
        let Some(dataset) = &self.coverage else {
            return CoveragePanel::Loading;
        };
        let view = self.store.snapshot();
        match dataset.lookup(view.mode, view.range_minutes, self.age_group) {
            Some(entry) => CoveragePanel::Summary(CoverageSummary::new(
                entry,
                view.mode,
                view.range_minutes,
                self.age_group,
                &self.config.area_name,
            )),
            None => CoveragePanel::NoData,
        }
    }

    pub fn legend(&self) -> Legend {
        legend(self.store.snapshot().is_3d)
    }

    pub fn popup(&self) -> Option<&PopupState<PoiDetails>> {
        self.interaction.popup()
    }

    pub fn bubble(&self) -> Option<&PopupState<InfoBubble>> {
        self.interaction.bubble()
    }

    /// Click routed from a subscribed layer.
    pub fn on_layer_click(
        &mut self,
        now: Time,
        layer_id: &str,
        at: LngLat,
        properties: &Map<String, Value>,
    ) {
        if self.shut_down {
            return;
        }
        match layer_id {
            MARKER_LAYER => self.interaction.on_marker_click(&self.surface, at, properties),
            COVERAGE_LAYER => {
                let view = self.store.snapshot();
                self.interaction
                    .on_coverage_click(&self.surface, at, properties, &view, now);
            }
            other => debug!("click on {other} ignored"),
        }
    }

    pub fn on_layer_hover(&mut self, entered: bool) {
        if !self.shut_down {
            self.interaction.on_hover(&mut self.surface, entered);
        }
    }

    /// Every map click, after any layer handlers.
    pub fn on_map_click(&mut self, point: ScreenPoint) -> bool {
        !self.shut_down && self.interaction.on_map_click(&self.surface, point)
    }

    /// Whether the host should keep delivering frames.
    pub fn needs_frame(&self) -> bool {
        self.has_pending_work() || (!self.shut_down && self.pulse.is_running())
    }

    /// A queued flush or timer is outstanding. Ignores the pulse.
    pub fn has_pending_work(&self) -> bool {
        !self.shut_down
            && (self.pending.is_pending()
                || self.bootstrap.next_due().is_some()
                || self.interaction.next_due().is_some())
    }

    pub fn on_frame(&mut self, frame: Frame) -> FrameReport {
        let mut report = FrameReport::default();
        if self.shut_down {
            return report;
        }
        let now = frame.time;
        self.last_frame = Some(frame);
        let view = self.store.snapshot();

        if self
            .bootstrap
            .poll(&mut self.surface, now, &mut self.reconciler, &view)
        {
            report.went_live = true;
            report.flush = report
                .flush
                .merge(self.extrusion.sync_extrusion(&mut self.surface, &view));
        }

        if let Some(state) = self.pending.poll(now) {
            debug!("flushing view {:?} {}min", state.mode, state.range_minutes);
            let flush = self
                .reconciler
                .reconcile(&mut self.surface, &state)
                .merge(self.extrusion.sync_extrusion(&mut self.surface, &state));
            report.flush = report.flush.merge(flush);
        }

        if let Some(style) = self.pulse.on_frame(frame, &mut self.store) {
            report.pulsed = true;
            report.flush = report
                .flush
                .merge(self.reconciler.apply_pulse(&mut self.surface, style));
        }

        self.interaction.poll(now);
        report
    }

    /// Releases every subscription, timer and animation.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.bootstrap.shutdown(&mut self.surface);
        self.pulse.stop();
        self.pending.cancel();
        self.interaction.dismiss();
        self.shut_down = true;
        info!("dashboard shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.last_frame
    }
}
