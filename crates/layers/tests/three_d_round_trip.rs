use layers::ids::{COVERAGE_LAYER, COVERAGE_SOURCE};
use layers::{ExtrusionManager, Reconciler};
use surface::{Expr, LayerKind, LayerSpec, RecordingSurface, RenderingSurface, SourceSpec, SurfaceCall};
use view::{ViewState, ViewStateStore};

fn fill_surface() -> RecordingSurface {
    let mut s = RecordingSurface::new();
    s.add_source(COVERAGE_SOURCE, SourceSpec::GeoJson { url: "cov.geojson".into() })
        .unwrap();
    s.add_layer(LayerSpec::new(COVERAGE_LAYER, LayerKind::Fill, COVERAGE_SOURCE))
        .unwrap();
    s
}

fn sync(s: &mut RecordingSurface, r: &mut Reconciler, e: &mut ExtrusionManager, v: &ViewState) {
    r.reconcile(s, v);
    e.sync_extrusion(s, v);
}

#[test]
fn toggle_restores_base_opacity() {
    let mut s = fill_surface();
    let mut r = Reconciler::new();
    let mut e = ExtrusionManager::new();
    let mut store = ViewStateStore::default();

    sync(&mut s, &mut r, &mut e, &store.snapshot());
    let before = s.paint(COVERAGE_LAYER, "fill-opacity").cloned();
    assert_eq!(before, Some(Expr::number(0.9)));

    store.set_is_3d(true);
    sync(&mut s, &mut r, &mut e, &store.snapshot());
    assert_eq!(s.paint(COVERAGE_LAYER, "fill-opacity"), Some(&Expr::number(0.0)));

    store.set_is_3d(false);
    sync(&mut s, &mut r, &mut e, &store.snapshot());
    assert_eq!(s.paint(COVERAGE_LAYER, "fill-opacity").cloned(), before);
    assert_eq!(
        s.paint(e.extrusion_layer(), "fill-extrusion-opacity"),
        Some(&Expr::number(0.0))
    );
    assert_eq!(s.layout(COVERAGE_LAYER, "visibility"), Some(&Expr::lit("visible")));
}

#[test]
fn two_enables_create_one_layer() {
    let mut s = fill_surface();
    let mut r = Reconciler::new();
    let mut e = ExtrusionManager::new();
    let mut store = ViewStateStore::default();

    for _ in 0..2 {
        store.set_is_3d(true);
        sync(&mut s, &mut r, &mut e, &store.snapshot());
        store.set_is_3d(false);
        sync(&mut s, &mut r, &mut e, &store.snapshot());
    }
    store.set_is_3d(true);
    sync(&mut s, &mut r, &mut e, &store.snapshot());

    let adds = s
        .calls()
        .iter()
        .filter(|c| matches!(c, SurfaceCall::AddLayer(id) if id == e.extrusion_layer()))
        .count();
    assert_eq!(adds, 1);
}

#[test]
fn extrusion_follows_filter_changes() {
    let mut s = fill_surface();
    let mut r = Reconciler::new();
    let mut e = ExtrusionManager::new();
    let mut store = ViewStateStore::default();
    store.set_is_3d(true);
    sync(&mut s, &mut r, &mut e, &store.snapshot());

    store.set_range(10);
    sync(&mut s, &mut r, &mut e, &store.snapshot());
    let base = s.filter(COVERAGE_LAYER).cloned();
    assert_eq!(s.filter(e.extrusion_layer()).cloned(), base);
}
