use std::collections::BTreeMap;

use surface::{Expr, LayerInfo, RenderingSurface, SurfaceError, VISIBILITY, visibility_value};
use tracing::{debug, warn};
use view::{PulseStyle, ViewState};

use crate::descriptor::LayerDescriptor;
use crate::ids::{COVERAGE_LAYER, MARKER_LAYER, RAW_POI_LAYER};

/// One property change against one layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Visibility { layer: String, visible: bool },
    Filter { layer: String, filter: Expr },
    Paint { layer: String, name: String, value: Expr },
    Layout { layer: String, name: String, value: Expr },
}

impl Mutation {
    pub fn layer(&self) -> &str {
        match self {
            Mutation::Visibility { layer, .. }
            | Mutation::Filter { layer, .. }
            | Mutation::Paint { layer, .. }
            | Mutation::Layout { layer, .. } => layer,
        }
    }

    // Flush order within a batch.
    fn phase(&self) -> u8 {
        match self {
            Mutation::Visibility { .. } => 0,
            Mutation::Filter { .. } => 1,
            Mutation::Paint { .. } => 2,
            Mutation::Layout { .. } => 3,
        }
    }

    fn describe(&self) -> String {
        match self {
            Mutation::Visibility { layer, visible } => format!("visibility={visible} on {layer}"),
            Mutation::Filter { layer, .. } => format!("filter on {layer}"),
            Mutation::Paint { layer, name, .. } => format!("paint {name} on {layer}"),
            Mutation::Layout { layer, name, .. } => format!("layout {name} on {layer}"),
        }
    }

    fn apply(&self, surface: &mut dyn RenderingSurface) -> Result<(), SurfaceError> {
        match self {
            Mutation::Visibility { layer, visible } => {
                surface.set_layout_property(layer, VISIBILITY, &visibility_value(*visible))
            }
            Mutation::Filter { layer, filter } => surface.set_filter(layer, filter),
            Mutation::Paint { layer, name, value } => surface.set_paint_property(layer, name, value),
            Mutation::Layout { layer, name, value } => {
                surface.set_layout_property(layer, name, value)
            }
        }
    }
}

/// Mutations queued for a single flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationBatch {
    mutations: Vec<Mutation>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn extend(&mut self, mutations: impl IntoIterator<Item = Mutation>) {
        self.mutations.extend(mutations);
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Visibility, then filter, then paint, then layout. Stable within each
    /// phase.
    pub fn into_ordered(mut self) -> Vec<Mutation> {
        self.mutations.sort_by_key(Mutation::phase);
        self.mutations
    }
}

/// What was last successfully applied to one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedLayer {
    pub visible: Option<bool>,
    pub filter: Option<Expr>,
    pub paint: BTreeMap<String, Expr>,
    pub layout: BTreeMap<String, Expr>,
}

/// Per-layer snapshot used to skip mutations that would change nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastApplied {
    layers: BTreeMap<String, AppliedLayer>,
}

impl LastApplied {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, layer: &str) -> Option<&AppliedLayer> {
        self.layers.get(layer)
    }

    pub fn record(&mut self, mutation: &Mutation) {
        let entry = self.layers.entry(mutation.layer().to_string()).or_default();
        match mutation {
            Mutation::Visibility { visible, .. } => entry.visible = Some(*visible),
            Mutation::Filter { filter, .. } => entry.filter = Some(filter.clone()),
            Mutation::Paint { name, value, .. } => {
                entry.paint.insert(name.clone(), value.clone());
            }
            Mutation::Layout { name, value, .. } => {
                entry.layout.insert(name.clone(), value.clone());
            }
        }
    }

    /// Records a freshly created layer as carrying everything in `descriptor`.
    pub fn record_created(&mut self, descriptor: &LayerDescriptor) {
        let entry = AppliedLayer {
            visible: Some(descriptor.visible),
            filter: descriptor.filter.as_ref().map(|f| f.to_expr()),
            paint: descriptor
                .paint
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
            layout: BTreeMap::new(),
        };
        self.layers.insert(descriptor.id.clone(), entry);
    }

    pub fn forget(&mut self, layer: &str) -> bool {
        self.layers.remove(layer).is_some()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }
}

/// Mutations needed to move `applied` to `descriptor`.
pub fn diff_layer(descriptor: &LayerDescriptor, applied: Option<&AppliedLayer>) -> Vec<Mutation> {
    let layer = || descriptor.id.clone();
    let mut wanted = vec![Mutation::Visibility {
        layer: layer(),
        visible: descriptor.visible,
    }];
    if let Some(filter) = &descriptor.filter {
        wanted.push(Mutation::Filter {
            layer: layer(),
            filter: filter.to_expr(),
        });
    }
    wanted.extend(descriptor.paint.iter().map(|(name, value)| Mutation::Paint {
        layer: layer(),
        name: name.to_string(),
        value: value.clone(),
    }));
    wanted
        .into_iter()
        .filter_map(|m| diff_mutation(applied, m))
        .collect()
}

/// `None` when `applied` already carries the mutation's value.
pub fn diff_mutation(applied: Option<&AppliedLayer>, mutation: Mutation) -> Option<Mutation> {
    let unchanged = match &mutation {
        Mutation::Visibility { visible, .. } => applied.and_then(|a| a.visible) == Some(*visible),
        Mutation::Filter { filter, .. } => applied.and_then(|a| a.filter.as_ref()) == Some(filter),
        Mutation::Paint { name, value, .. } => applied.and_then(|a| a.paint.get(name)) == Some(value),
        Mutation::Layout { name, value, .. } => {
            applied.and_then(|a| a.layout.get(name)) == Some(value)
        }
    };
    (!unchanged).then_some(mutation)
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: usize,
    pub failed: usize,
}

impl FlushReport {
    pub fn merge(self, other: FlushReport) -> FlushReport {
        FlushReport {
            applied: self.applied + other.applied,
            failed: self.failed + other.failed,
        }
    }
}

/// Applies `batch` in order. A failed mutation is logged and skipped; it is
/// not recorded, so the next diff retries it.
pub fn flush_batch(
    surface: &mut dyn RenderingSurface,
    batch: MutationBatch,
    last: &mut LastApplied,
) -> FlushReport {
    let mut report = FlushReport::default();
    for mutation in batch.into_ordered() {
        match mutation.apply(surface) {
            Ok(()) => {
                debug!("applied {}", mutation.describe());
                last.record(&mutation);
                report.applied += 1;
            }
            Err(err) => {
                warn!("{} failed: {err}", mutation.describe());
                report.failed += 1;
            }
        }
    }
    report
}

/// Keeps the coverage and marker layers in line with the view state.
///
/// The reconciler never creates or removes layers. A layer that is absent is
/// skipped with a warning and its snapshot dropped, so it is fully
/// re-applied once it appears.
#[derive(Debug)]
pub struct Reconciler {
    coverage_layer: String,
    last_applied: LastApplied,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self::for_layer(COVERAGE_LAYER)
    }

    pub fn for_layer(coverage_layer: &str) -> Self {
        Self {
            coverage_layer: coverage_layer.to_string(),
            last_applied: LastApplied::new(),
        }
    }

    pub fn coverage_layer(&self) -> &str {
        &self.coverage_layer
    }

    pub fn last_applied(&self) -> &LastApplied {
        &self.last_applied
    }

    /// Drops the snapshot for `layer` so its next reconcile re-applies
    /// everything.
    pub fn forget(&mut self, layer: &str) -> bool {
        self.last_applied.forget(layer)
    }

    /// Records a layer the caller has just created from `descriptor`.
    pub fn record_created(&mut self, descriptor: &LayerDescriptor) {
        self.last_applied.record_created(descriptor);
    }

    /// Computes the changed mutations for `state` without applying them.
    pub fn plan(&mut self, surface: &dyn RenderingSurface, state: &ViewState) -> MutationBatch {
        let mut batch = MutationBatch::new();

        match surface.get_layer(&self.coverage_layer) {
            Some(info) => match LayerDescriptor::coverage(&info, state) {
                Some(target) => {
                    batch.extend(diff_layer(&target, self.last_applied.get(&target.id)));
                }
                None => warn!(
                    "coverage layer {} has kind {}, which cannot show coverage",
                    info.id,
                    info.kind.as_str()
                ),
            },
            None => {
                warn!("coverage layer {} not found; skipping", self.coverage_layer);
                self.last_applied.forget(&self.coverage_layer);
            }
        }

        match marker_target(surface) {
            Some(info) => {
                let target = LayerDescriptor::markers(&info, state);
                batch.extend(diff_layer(&target, self.last_applied.get(&target.id)));
            }
            None => debug!("no marker layer to reconcile"),
        }

        batch
    }

    pub fn flush(&mut self, surface: &mut dyn RenderingSurface, batch: MutationBatch) -> FlushReport {
        if batch.is_empty() {
            return FlushReport::default();
        }
        flush_batch(surface, batch, &mut self.last_applied)
    }

    /// Plans and flushes in one step.
    pub fn reconcile(&mut self, surface: &mut dyn RenderingSurface, state: &ViewState) -> FlushReport {
        let batch = self.plan(surface, state);
        debug!(
            "reconcile {}: {} mutation(s)",
            crate::filter::coverage_column(state.mode, state.range_minutes),
            batch.len()
        );
        self.flush(surface, batch)
    }

    /// Applies one pulse frame to the custom marker layer.
    pub fn apply_pulse(&mut self, surface: &mut dyn RenderingSurface, style: PulseStyle) -> FlushReport {
        if surface.get_layer(MARKER_LAYER).is_none() {
            return FlushReport::default();
        }
        let applied = self.last_applied.get(MARKER_LAYER);
        let mut batch = MutationBatch::new();
        batch.extend(diff_mutation(
            applied,
            Mutation::Paint {
                layer: MARKER_LAYER.to_string(),
                name: "icon-opacity".to_string(),
                value: Expr::number(style.icon_opacity),
            },
        ));
        batch.extend(diff_mutation(
            applied,
            Mutation::Layout {
                layer: MARKER_LAYER.to_string(),
                name: "icon-size".to_string(),
                value: Expr::number(style.icon_size),
            },
        ));
        self.flush(surface, batch)
    }
}

/// The custom symbol layer when it exists, otherwise the raw style layer.
pub fn marker_target(surface: &dyn RenderingSurface) -> Option<LayerInfo> {
    surface
        .get_layer(MARKER_LAYER)
        .or_else(|| surface.get_layer(RAW_POI_LAYER))
}
