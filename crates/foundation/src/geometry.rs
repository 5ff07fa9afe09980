/// Screen-space point in CSS pixels, origin top-left.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned screen rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenRect {
    pub min: ScreenPoint,
    pub max: ScreenPoint,
}

impl ScreenRect {
    pub fn new(min: ScreenPoint, max: ScreenPoint) -> Self {
        Self { min, max }
    }

    pub fn from_size(size: ScreenSize) -> Self {
        Self::new(ScreenPoint::new(0.0, 0.0), ScreenPoint::new(size.width, size.height))
    }

    /// Shrinks every edge by `margin`.
    pub fn inset(self, margin: f64) -> Self {
        Self::new(
            ScreenPoint::new(self.min.x + margin, self.min.y + margin),
            ScreenPoint::new(self.max.x - margin, self.max.y - margin),
        )
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Geographic position in WGS84 degrees.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}
