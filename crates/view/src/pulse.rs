use runtime::frame::Frame;
use runtime::ticker::Ticker;

use crate::view_state::ViewStateStore;

/// Phase increment per display frame, in radians.
pub const PULSE_STEP: f64 = 0.02;

const ICON_SIZE_BASE: f64 = 0.8;
const ICON_SIZE_AMPLITUDE: f64 = 0.1;
const ICON_OPACITY_BASE: f64 = 0.85;
const ICON_OPACITY_AMPLITUDE: f64 = 0.1;

/// Marker paint values for one pulse phase.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PulseStyle {
    pub icon_size: f64,
    pub icon_opacity: f64,
}

pub fn pulse_style(phase: f64) -> PulseStyle {
    let s = phase.sin();
    PulseStyle {
        icon_size: ICON_SIZE_BASE + ICON_SIZE_AMPLITUDE * s,
        icon_opacity: ICON_OPACITY_BASE + ICON_OPACITY_AMPLITUDE * s,
    }
}

/// Drives the marker pulse from display frames.
///
/// The underlying [`Ticker`] is released as soon as markers are hidden, so a
/// hidden marker layer costs no frames.
#[derive(Debug, Default)]
pub struct PulseAnimator {
    ticker: Ticker,
    step: f64,
}

impl PulseAnimator {
    pub fn new() -> Self {
        Self::with_step(PULSE_STEP)
    }

    pub fn with_step(step: f64) -> Self {
        Self {
            ticker: Ticker::new(),
            step,
        }
    }

    /// Starts or stops ticking to follow marker visibility.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.ticker.start();
        } else {
            self.ticker.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_active()
    }

    pub fn stop(&mut self) -> bool {
        self.ticker.stop()
    }

    /// Advances the phase once per frame while running and returns the style
    /// to apply to the marker layer.
    pub fn on_frame(&mut self, frame: Frame, store: &mut ViewStateStore) -> Option<PulseStyle> {
        if !self.ticker.on_frame(frame) {
            return None;
        }
        let phase = store.advance_pulse(self.step);
        Some(pulse_style(phase))
    }

    pub fn ticks(&self) -> u64 {
        self.ticker.ticks()
    }
}
