use std::time::Duration;

use formats::PoiDetails;
use foundation::geometry::{LngLat, ScreenPoint, ScreenSize};
use foundation::time::Time;
use layers::coverage_column;
use layers::ids::{DENSITY_PROPERTY, is_interactive_layer};
use serde_json::{Map, Value};
use surface::{Cursor, RenderingSurface};
use tracing::debug;
use view::{Placement, PopupGeometry, PopupLayout, PopupState, ViewState, place};

/// Vertical lift of the info bubble above the click point.
pub const BUBBLE_OFFSET_Y: f64 = 60.0;

/// Short-lived readout for a clicked coverage cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoBubble {
    pub people: u64,
    pub minutes: u64,
}

impl InfoBubble {
    /// `None` when the cell has no travel time for `column`.
    pub fn from_properties(properties: &Map<String, Value>, column: &str) -> Option<Self> {
        let minutes = number(properties.get(column)?)?;
        let people = properties
            .get(DENSITY_PROPERTY)
            .and_then(number)
            .unwrap_or(0.0);
        Some(Self {
            people: round_count(people),
            minutes: round_count(minutes),
        })
    }

    pub fn lines(&self) -> [String; 2] {
        [
            format!("{} people", self.people),
            format!("{} min to closest clinic", self.minutes),
        ]
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn round_count(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 { v.round() as u64 } else { 0 }
}

/// Popup and bubble state driven by pointer input.
#[derive(Debug)]
pub struct Interaction {
    viewport: ScreenSize,
    bubble_timeout: Duration,
    popup: Option<PopupState<PoiDetails>>,
    bubble: Option<PopupState<InfoBubble>>,
}

impl Interaction {
    pub fn new(viewport: ScreenSize, bubble_timeout: Duration) -> Self {
        Self {
            viewport,
            bubble_timeout,
            popup: None,
            bubble: None,
        }
    }

    pub fn popup(&self) -> Option<&PopupState<PoiDetails>> {
        self.popup.as_ref()
    }

    pub fn bubble(&self) -> Option<&PopupState<InfoBubble>> {
        self.bubble.as_ref()
    }

    pub fn on_marker_click(
        &mut self,
        surface: &dyn RenderingSurface,
        at: LngLat,
        properties: &Map<String, Value>,
    ) {
        let point = surface.project(at);
        let layout = place(point, self.viewport, PopupGeometry::POPUP_SIZE);
        let details = PoiDetails::from_properties(properties);
        debug!("popup for {} at ({}, {})", details.name, layout.x, layout.y);
        self.popup = Some(PopupState::new(layout, details));
    }

    /// Shows the bubble for a coverage cell, replacing any current one.
    pub fn on_coverage_click(
        &mut self,
        surface: &dyn RenderingSurface,
        at: LngLat,
        properties: &Map<String, Value>,
        view: &ViewState,
        now: Time,
    ) {
        let column = coverage_column(view.mode, view.range_minutes);
        let Some(bubble) = InfoBubble::from_properties(properties, &column) else {
            debug!("cell has no {column} value; no bubble");
            return;
        };
        let point = surface.project(at);
        let layout = PopupLayout {
            x: point.x,
            y: point.y - BUBBLE_OFFSET_Y,
            placement: Placement::Above,
        };
        self.bubble =
            Some(PopupState::new(layout, bubble).expiring_at(now.after(self.bubble_timeout)));
    }

    /// A click that hits no interactive feature dismisses everything.
    pub fn on_map_click(&mut self, surface: &dyn RenderingSurface, point: ScreenPoint) -> bool {
        let hit = surface
            .query_rendered_features(point)
            .iter()
            .any(|f| is_interactive_layer(&f.layer_id));
        if hit {
            return false;
        }
        let dismissed = self.popup.is_some() || self.bubble.is_some();
        self.dismiss();
        dismissed
    }

    pub fn on_hover(&self, surface: &mut dyn RenderingSurface, entered: bool) {
        surface.set_cursor(if entered { Cursor::Pointer } else { Cursor::Default });
    }

    /// Drops an expired bubble. Returns `true` if one was removed.
    pub fn poll(&mut self, now: Time) -> bool {
        if self.bubble.as_ref().is_some_and(|b| b.is_expired(now)) {
            self.bubble = None;
            return true;
        }
        false
    }

    pub fn next_due(&self) -> Option<Time> {
        self.bubble.as_ref().and_then(|b| b.expires_at)
    }

    pub fn dismiss(&mut self) {
        self.popup = None;
        self.bubble = None;
    }
}
