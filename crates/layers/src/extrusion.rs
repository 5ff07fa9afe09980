use std::time::Duration;

use surface::{CameraEase, Expr, LayerKind, RenderingSurface};
use tracing::{info, warn};
use view::ViewState;

use crate::descriptor::{LayerDescriptor, extrusion_height};
use crate::filter::FilterExpression;
use crate::ids::{COVERAGE_LAYER, COVERAGE_SOURCE, DENSITY_PROPERTY, extrusion_layer_id};
use crate::ramp::{ColorRamp, density_ramp};
use crate::reconciler::{
    FlushReport, LastApplied, Mutation, MutationBatch, diff_layer, diff_mutation, flush_batch,
    marker_target,
};

pub const PITCH_3D_DEG: f64 = 60.0;
pub const PITCH_ENABLE_DURATION: Duration = Duration::from_millis(2000);
pub const PITCH_DISABLE_DURATION: Duration = Duration::from_millis(1000);

const OPACITY: &str = "fill-extrusion-opacity";

/// The live 3D representation. Exists only while 3D is on.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrusionState {
    pub layer_id: String,
    pub present: bool,
    pub height: Expr,
    pub color_ramp: ColorRamp,
}

/// Owns the extrusion layer derived from a fill coverage layer.
///
/// Turning 3D off hides the extrusion (opacity 0) instead of removing it, so
/// turning it back on only updates paint. The base layer's own opacity is the
/// reconciler's business.
#[derive(Debug)]
pub struct ExtrusionManager {
    base_layer: String,
    extrusion_layer: String,
    last_applied: LastApplied,
    state: Option<ExtrusionState>,
    was_3d: bool,
    layers_created: u32,
}

impl Default for ExtrusionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtrusionManager {
    pub fn new() -> Self {
        Self::for_layer(COVERAGE_LAYER)
    }

    pub fn for_layer(base_layer: &str) -> Self {
        Self {
            base_layer: base_layer.to_string(),
            extrusion_layer: extrusion_layer_id(base_layer),
            last_applied: LastApplied::new(),
            state: None,
            was_3d: false,
            layers_created: 0,
        }
    }

    pub fn extrusion_layer(&self) -> &str {
        &self.extrusion_layer
    }

    pub fn state(&self) -> Option<&ExtrusionState> {
        self.state.as_ref()
    }

    /// Number of times the extrusion layer was added to the surface.
    pub fn layers_created(&self) -> u32 {
        self.layers_created
    }

    pub fn sync_extrusion(
        &mut self,
        surface: &mut dyn RenderingSurface,
        view: &ViewState,
    ) -> FlushReport {
        let transition = (view.is_3d != self.was_3d).then_some(view.is_3d);
        self.was_3d = view.is_3d;
        if let Some(enabled) = transition {
            ease_camera(surface, enabled);
        }

        let Some(base) = surface.get_layer(&self.base_layer) else {
            warn!("base layer {} not found; extrusion skipped", self.base_layer);
            self.state = None;
            return FlushReport::default();
        };
        if base.kind != LayerKind::Fill {
            self.state = None;
            return FlushReport::default();
        }

        if view.is_3d {
            let source = base.source.as_deref().unwrap_or(COVERAGE_SOURCE);
            let report = self.show(surface, source, view, transition.is_some());
            self.state = Some(ExtrusionState {
                layer_id: self.extrusion_layer.clone(),
                present: surface.get_layer(&self.extrusion_layer).is_some(),
                height: extrusion_height(Expr::numeric_column(DENSITY_PROPERTY)),
                color_ramp: density_ramp(),
            });
            report
        } else {
            self.state = None;
            self.hide(surface)
        }
    }

    fn show(
        &mut self,
        surface: &mut dyn RenderingSurface,
        source: &str,
        view: &ViewState,
        just_enabled: bool,
    ) -> FlushReport {
        let target = LayerDescriptor::extrusion(
            &self.extrusion_layer,
            source,
            FilterExpression::for_view(view),
            1.0,
        );

        if surface.get_layer(&self.extrusion_layer).is_some() {
            let mut batch = MutationBatch::new();
            batch.extend(diff_layer(&target, self.last_applied.get(&target.id)));
            let report = flush_batch(surface, batch, &mut self.last_applied);
            if just_enabled {
                self.raise_markers(surface);
            }
            return report;
        }

        if !surface.has_source(source) {
            warn!("source {source} not found; extrusion not created");
            return FlushReport::default();
        }
        self.last_applied.forget(&self.extrusion_layer);
        match surface.add_layer(target.to_spec()) {
            Ok(()) => {
                info!("created extrusion layer {}", self.extrusion_layer);
                self.layers_created += 1;
                self.last_applied.record_created(&target);
                // Extrusions draw over anything beneath them.
                self.raise_markers(surface);
                FlushReport {
                    applied: 1,
                    failed: 0,
                }
            }
            Err(err) => {
                warn!("creating extrusion layer {} failed: {err}", self.extrusion_layer);
                FlushReport {
                    applied: 0,
                    failed: 1,
                }
            }
        }
    }

    fn hide(&mut self, surface: &mut dyn RenderingSurface) -> FlushReport {
        if surface.get_layer(&self.extrusion_layer).is_none() {
            self.last_applied.forget(&self.extrusion_layer);
            return FlushReport::default();
        }
        let mut batch = MutationBatch::new();
        batch.extend(diff_mutation(
            self.last_applied.get(&self.extrusion_layer),
            Mutation::Paint {
                layer: self.extrusion_layer.clone(),
                name: OPACITY.to_string(),
                value: Expr::number(0.0),
            },
        ));
        flush_batch(surface, batch, &mut self.last_applied)
    }

    fn raise_markers(&self, surface: &mut dyn RenderingSurface) {
        let Some(marker) = marker_target(surface) else {
            return;
        };
        if let Err(err) = surface.move_layer_to_top(&marker.id) {
            warn!("moving {} above extrusion failed: {err}", marker.id);
        }
    }
}

fn ease_camera(surface: &mut dyn RenderingSurface, enabled: bool) {
    let ease = if enabled {
        CameraEase {
            pitch_deg: PITCH_3D_DEG,
            bearing_deg: 0.0,
            duration: PITCH_ENABLE_DURATION,
        }
    } else {
        CameraEase {
            pitch_deg: 0.0,
            bearing_deg: 0.0,
            duration: PITCH_DISABLE_DURATION,
        }
    };
    info!("3D {}", if enabled { "enabled" } else { "disabled" });
    surface.ease_camera(ease);
}
