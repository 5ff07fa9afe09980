use dashboard::{CoveragePanel, Dashboard, DashboardConfig};
use formats::{AgeGroup, CoverageDataset};
use foundation::geometry::{LngLat, ScreenPoint};
use foundation::time::Time;
use layers::FilterExpression;
use layers::ids::{COVERAGE_LAYER, MARKER_LAYER, RAW_POI_LAYER, STALE_COVERAGE_LAYER};
use pretty_assertions::assert_eq;
use runtime::frame::Frame;
use serde_json::{Map, Value, json};
use surface::{
    Bitmap, CallKind, Expr, LayerKind, RecordingSurface, RenderedFeature, RenderingSurface,
    SurfaceCall,
};
use view::TransportMode;

const DATASET: &str = r#"{
    "walk": {
        "15min": {"5-18": {"percentage": 62.0, "total_population": 10000, "accessible_population": 6200}},
        "10min": {"5-18": {"percentage": 41.0, "total_population": 10000, "accessible_population": 4100}}
    },
    "car": {
        "20min": {"5-18": {"percentage": 97.3, "total_population": 10000, "accessible_population": 9730}}
    }
}"#;

struct Host {
    dashboard: Dashboard<RecordingSurface>,
    frame: Frame,
}

impl Host {
    /// A dashboard that has completed bootstrap.
    fn live() -> Self {
        let surface = RecordingSurface::new()
            .with_style_layer(RAW_POI_LAYER, LayerKind::Circle, None)
            .with_style_layer(STALE_COVERAGE_LAYER, LayerKind::Fill, None);
        let mut host = Self {
            dashboard: Dashboard::new(surface, DashboardConfig::default()),
            frame: Frame::first(Time(0)),
        };
        host.dashboard.set_coverage_dataset(CoverageDataset::parse(DATASET));
        host.dashboard.on_style_ready(Time(0));
        host.dashboard.on_icon_decoded(Ok(Bitmap {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        }));
        host.advance(1100);
        assert!(host.surface().is_container_visible());
        host.surface_mut().take_calls();
        host
    }

    fn now(&self) -> Time {
        self.frame.time
    }

    fn advance(&mut self, ms: u64) {
        let end = self.frame.time.0 + ms;
        while self.frame.time.0 < end {
            self.frame = self.frame.next(Time(self.frame.time.0 + 16));
            self.dashboard.on_frame(self.frame);
        }
    }

    fn surface(&self) -> &RecordingSurface {
        self.dashboard.surface()
    }

    fn surface_mut(&mut self) -> &mut RecordingSurface {
        self.dashboard.surface_mut()
    }

    fn filter_calls(&self) -> Vec<Expr> {
        self.surface()
            .calls()
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::SetFilter { layer, filter } if layer == COVERAGE_LAYER => {
                    Some(filter.clone())
                }
                _ => None,
            })
            .collect()
    }
}

fn props(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap_or_default()
}

#[test]
fn walk_fifteen_end_to_end() {
    let host = Host::live();
    let d = &host.dashboard;

    assert_eq!(
        host.surface().filter(COVERAGE_LAYER),
        Some(&FilterExpression::new(TransportMode::Walk, 15).to_expr())
    );
    assert_eq!(d.age_group(), AgeGroup::School);
    let CoveragePanel::Summary(summary) = d.coverage_panel() else {
        panic!("expected a summary");
    };
    assert_eq!(summary.percentage, 62);
    assert_eq!(
        summary.headline,
        "62% of children in Be'er-Sheva can walk in 15min"
    );
    assert_eq!(
        summary.detail,
        "This means that 6,200 children in Be'er-Sheva have access, out of 10,000 children"
    );
    assert_eq!(d.legend().labels, vec!["0 min", "15 min", "30 min"]);
}

#[test]
fn burst_of_changes_flushes_once() {
    let mut host = Host::live();
    let now = host.now();
    host.dashboard.set_range(now, 10);
    host.dashboard.set_mode(now, TransportMode::Car);
    host.dashboard.set_range(now, 20);

    host.advance(80);
    assert!(host.filter_calls().is_empty());

    host.advance(100);
    assert_eq!(
        host.filter_calls(),
        vec![FilterExpression::new(TransportMode::Car, 20).to_expr()]
    );

    let CoveragePanel::Summary(summary) = host.dashboard.coverage_panel() else {
        panic!("expected a summary");
    };
    assert_eq!(summary.headline, "97% of children in Be'er-Sheva can drive in 20min");
}

#[test]
fn toggle_back_and_forth_flushes_nothing_new() {
    let mut host = Host::live();
    let now = host.now();
    host.dashboard.set_range(now, 10);
    host.dashboard.set_range(now, 15);
    host.advance(200);
    assert!(host.filter_calls().is_empty());
}

#[test]
fn three_d_round_trip_through_dashboard() {
    let mut host = Host::live();
    let ext = host.dashboard.extrusion().extrusion_layer().to_string();

    let now = host.now();
    host.dashboard.set_is_3d(now, true);
    host.advance(200);
    {
        let s = host.surface();
        assert_eq!(s.paint(COVERAGE_LAYER, "fill-opacity"), Some(&Expr::number(0.0)));
        assert_eq!(s.paint(&ext, "fill-extrusion-opacity"), Some(&Expr::number(1.0)));
        assert_eq!(s.layer_order().last(), Some(&MARKER_LAYER));
        assert_eq!(s.camera().map(|c| c.pitch_deg), Some(60.0));
    }
    assert_eq!(host.dashboard.legend().labels[2], "1000 people");

    let now = host.now();
    host.dashboard.set_is_3d(now, false);
    host.advance(200);
    {
        let s = host.surface();
        assert_eq!(s.paint(COVERAGE_LAYER, "fill-opacity"), Some(&Expr::number(0.9)));
        assert_eq!(s.paint(&ext, "fill-extrusion-opacity"), Some(&Expr::number(0.0)));
        assert_eq!(s.camera().map(|c| c.pitch_deg), Some(0.0));
    }

    let now = host.now();
    host.dashboard.set_is_3d(now, true);
    host.advance(200);
    assert_eq!(host.dashboard.extrusion().layers_created(), 1);
}

fn marker_writes(host: &Host, property: &str) -> usize {
    host.surface()
        .calls()
        .iter()
        .filter(|c| match c {
            SurfaceCall::SetLayout { layer, name, .. } | SurfaceCall::SetPaint { layer, name, .. } => {
                layer == MARKER_LAYER && name == property
            }
            _ => false,
        })
        .count()
}

#[test]
fn hiding_markers_stops_the_pulse_and_showing_resumes_it() {
    let mut host = Host::live();
    host.advance(50);
    let pulsed = host.surface().calls().iter().any(|c| {
        matches!(c, SurfaceCall::SetLayout { layer, name, .. }
            if layer == MARKER_LAYER && name == "icon-size")
    });
    assert!(pulsed);

    let now = host.now();
    host.dashboard.set_poi_visible(now, false);
    host.advance(150);
    assert_eq!(
        host.surface().layout(MARKER_LAYER, "visibility"),
        Some(&Expr::lit("none"))
    );
    assert!(!host.dashboard.needs_frame());

    host.surface_mut().take_calls();
    host.advance(500);
    assert!(host.surface().calls().is_empty());
    let stopped_at = host.dashboard.view().pulse_phase;
    assert!(stopped_at > 0.0);

    let now = host.now();
    host.dashboard.set_poi_visible(now, true);
    assert!(host.dashboard.needs_frame());
    host.advance(200);
    assert!(host.dashboard.needs_frame());
    assert_eq!(
        host.surface().layout(MARKER_LAYER, "visibility"),
        Some(&Expr::lit("visible"))
    );
    assert!(marker_writes(&host, "icon-size") > 0);
    assert!(marker_writes(&host, "icon-opacity") > 0);

    // Picks up where it stopped rather than restarting from zero.
    let resumed = host.dashboard.view().pulse_phase;
    assert!(resumed > stopped_at);
    assert!(resumed - stopped_at < 1.0);
}

#[test]
fn failed_filter_is_retried_on_next_flush() {
    let mut host = Host::live();
    host.surface_mut().fail_once(CallKind::SetFilter, COVERAGE_LAYER);

    let now = host.now();
    host.dashboard.set_range(now, 10);
    host.advance(150);
    let walk_10 = FilterExpression::new(TransportMode::Walk, 10).to_expr();
    assert_ne!(host.surface().filter(COVERAGE_LAYER), Some(&walk_10));

    let now = host.now();
    host.dashboard.set_poi_visible(now, false);
    host.advance(150);
    assert_eq!(host.surface().filter(COVERAGE_LAYER), Some(&walk_10));
}

#[test]
fn clicks_open_and_dismiss_overlays() {
    let mut host = Host::live();
    let at = LngLat::new(34.79, 31.25);
    let now = host.now();
    host.dashboard.on_layer_click(
        now,
        MARKER_LAYER,
        at,
        &props(json!({"name": "Soroka_Clinic", "healthcare": 2, "retail": 2})),
    );
    host.dashboard.on_layer_click(
        now,
        COVERAGE_LAYER,
        at,
        &props(json!({"walk_15min": 9.4, "density": 120})),
    );
    assert_eq!(
        host.dashboard.popup().map(|p| p.payload.name.as_str()),
        Some("Soroka Clinic")
    );
    assert_eq!(
        host.dashboard.bubble().map(|b| b.payload.lines()[1].clone()),
        Some("9 min to closest clinic".to_string())
    );

    host.surface_mut().set_rendered_features(vec![RenderedFeature {
        layer_id: "water".into(),
        geometry_type: "Polygon".into(),
        properties: Map::new(),
    }]);
    assert!(host.dashboard.on_map_click(ScreenPoint::new(5.0, 5.0)));
    assert!(host.dashboard.popup().is_none());
    assert!(host.dashboard.bubble().is_none());
}

#[test]
fn bubble_expires_on_its_own() {
    let mut host = Host::live();
    let now = host.now();
    host.dashboard.on_layer_click(
        now,
        COVERAGE_LAYER,
        LngLat::new(34.79, 31.25),
        &props(json!({"walk_15min": 3})),
    );
    host.advance(2900);
    assert!(host.dashboard.bubble().is_some());
    host.advance(200);
    assert!(host.dashboard.bubble().is_none());
}

#[test]
fn hover_toggles_pointer() {
    let mut host = Host::live();
    host.dashboard.on_layer_hover(true);
    assert_eq!(host.surface().cursor(), surface::Cursor::Pointer);
    host.dashboard.on_layer_hover(false);
    assert_eq!(host.surface().cursor(), surface::Cursor::Default);
}
