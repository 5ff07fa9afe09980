use foundation::geometry::{ScreenPoint, ScreenSize};
use foundation::time::Time;

/// Which side of the anchor point the popup body sits on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Placement {
    Above,
    Below,
}

/// Result of [`place`]: the popup's anchor in screen space.
///
/// `x` is the horizontal center of the popup. For [`Placement::Above`], `y`
/// is the popup's bottom edge; for [`Placement::Below`] it is its vertical
/// anchor after the downward offset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PopupLayout {
    pub x: f64,
    pub y: f64,
    pub placement: Placement,
}

/// Constants the positioner works with.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PopupGeometry {
    pub margin: f64,
    /// Extra downward shift applied when flipping below the anchor.
    pub below_offset: f64,
}

impl PopupGeometry {
    pub const POPUP_SIZE: ScreenSize = ScreenSize::new(300.0, 200.0);
}

impl Default for PopupGeometry {
    fn default() -> Self {
        Self {
            margin: 20.0,
            below_offset: 20.0,
        }
    }
}

/// Places a popup of `popup` size near `at` without crossing the viewport
/// margins, using the default [`PopupGeometry`].
pub fn place(at: ScreenPoint, viewport: ScreenSize, popup: ScreenSize) -> PopupLayout {
    place_with(at, viewport, popup, &PopupGeometry::default())
}

pub fn place_with(
    at: ScreenPoint,
    viewport: ScreenSize,
    popup: ScreenSize,
    geometry: &PopupGeometry,
) -> PopupLayout {
    let half_width = popup.width / 2.0;
    let mut x = at.x;
    if at.x + half_width > viewport.width - geometry.margin {
        x = viewport.width - half_width - geometry.margin;
    }
    // Left edge wins when the viewport is too narrow for both.
    if at.x - half_width < geometry.margin {
        x = half_width + geometry.margin;
    }

    if at.y - popup.height < geometry.margin {
        PopupLayout {
            x,
            y: at.y + popup.height / 2.0 + geometry.below_offset,
            placement: Placement::Below,
        }
    } else {
        PopupLayout {
            x,
            y: at.y,
            placement: Placement::Above,
        }
    }
}

/// A visible popup and what it shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupState<P> {
    pub screen_x: f64,
    pub screen_y: f64,
    pub placement: Placement,
    pub payload: P,
    /// Set for popups that dismiss themselves.
    pub expires_at: Option<Time>,
}

impl<P> PopupState<P> {
    pub fn new(layout: PopupLayout, payload: P) -> Self {
        Self {
            screen_x: layout.x,
            screen_y: layout.y,
            placement: layout.placement,
            payload,
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, at: Time) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn is_expired(&self, now: Time) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
