use std::fs;

use dashboard::{CoveragePanel, Dashboard, DashboardConfig};
use formats::{CoverageDataset, DatasetError, FeatureCollection, load_icon};
use foundation::time::Time;
use layers::FilterExpression;
use layers::ids::{MARKER_LAYER, RAW_POI_LAYER, STALE_COVERAGE_LAYER};
use runtime::frame::Frame;
use serde::Serialize;
use surface::{LayerKind, RecordingSurface};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use view::TransportMode;

const FRAME_MS: u64 = 16;
/// Upper bound on frames per scripted step.
const MAX_FRAMES: u64 = 1_000;

#[derive(Debug, Serialize)]
struct SessionReport {
    phase: String,
    mode: TransportMode,
    range_minutes: u32,
    is_3d: bool,
    layers: Vec<String>,
    surface_calls: usize,
    cells_in_range: Option<usize>,
    headline: Option<String>,
    detail: Option<String>,
    popup: Option<String>,
}

/// Drives frames until the dashboard has nothing left to flush.
struct Clock {
    frame: Frame,
}

impl Clock {
    fn now(&self) -> Time {
        self.frame.time
    }

    fn run_until_idle(&mut self, dashboard: &mut Dashboard<RecordingSurface>) {
        for _ in 0..MAX_FRAMES {
            self.frame = self.frame.next(Time(self.frame.time.0 + FRAME_MS));
            dashboard.on_frame(self.frame);
            // The pulse never idles, so stop once only it is left.
            if !dashboard.has_pending_work() {
                return;
            }
        }
    }
}

fn load_coverage(path: &str) -> Result<CoverageDataset, DatasetError> {
    let payload =
        fs::read_to_string(path).map_err(|e| DatasetError::Parse(format!("{path}: {e}")))?;
    CoverageDataset::parse(&payload)
}

fn load_features(path: &str) -> Option<FeatureCollection> {
    let payload = match fs::read_to_string(path) {
        Ok(p) => p,
        Err(err) => {
            warn!("features {path} unavailable: {err}");
            return None;
        }
    };
    match FeatureCollection::parse(&payload) {
        Ok(fc) => Some(fc),
        Err(err) => {
            warn!("features {path} unreadable: {err}");
            None
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = DashboardConfig::from_env();
    info!("replaying dashboard session for {}", config.area_name);

    let surface = RecordingSurface::new()
        .with_style_layer(RAW_POI_LAYER, LayerKind::Circle, None)
        .with_style_layer(STALE_COVERAGE_LAYER, LayerKind::Fill, None);
    let mut dashboard = Dashboard::new(surface, config.clone());
    let mut clock = Clock {
        frame: Frame::first(Time(0)),
    };

    dashboard.set_coverage_dataset(load_coverage(&config.coverage_path));
    dashboard.on_style_ready(clock.now());
    dashboard.on_icon_decoded(load_icon(&config.icon_path));
    clock.run_until_idle(&mut dashboard);

    dashboard.set_mode(clock.now(), TransportMode::Car);
    dashboard.set_range(clock.now(), 20);
    dashboard.set_is_3d(clock.now(), true);
    clock.run_until_idle(&mut dashboard);

    let view = dashboard.view();
    let polygons = load_features(&config.polygons_path);
    let cells_in_range = polygons.as_ref().map(|fc| {
        let filter = FilterExpression::for_view(&view);
        fc.features
            .iter()
            .filter(|f| filter.accepts(&f.properties))
            .count()
    });

    let popup = load_features(&config.poi_path).and_then(|pois| {
        let poi = pois.of_type("Point").next()?;
        let at = poi.geometry.anchor()?;
        dashboard.on_layer_click(clock.now(), MARKER_LAYER, at, &poi.properties);
        dashboard.popup().map(|p| p.payload.name.clone())
    });

    let (headline, detail) = match dashboard.coverage_panel() {
        CoveragePanel::Summary(s) => (Some(s.headline), Some(s.detail)),
        CoveragePanel::Loading | CoveragePanel::NoData => (None, None),
    };

    let report = SessionReport {
        phase: format!("{:?}", dashboard.phase()),
        mode: view.mode,
        range_minutes: view.range_minutes,
        is_3d: view.is_3d,
        layers: dashboard
            .surface()
            .layer_order()
            .into_iter()
            .map(str::to_string)
            .collect(),
        surface_calls: dashboard.surface().calls().len(),
        cells_in_range,
        headline,
        detail,
        popup,
    };
    dashboard.shutdown();

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(err) => warn!("report serialization failed: {err}"),
    }
}
