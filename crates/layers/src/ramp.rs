use foundation::color::Rgba;
use surface::Expr;

/// Blue, teal, pale yellow, orange, dark red.
pub const PALETTE: [Rgba; 5] = [
    Rgba::rgb(0x3C, 0x64, 0xB4),
    Rgba::rgb(0x64, 0xC8, 0x96),
    Rgba::rgb(0xFF, 0xFF, 0xC8),
    Rgba::rgb(0xFF, 0x64, 0x32),
    Rgba::rgb(0x8C, 0x14, 0x46),
];

/// Evenly spaced fractions of the domain, one per palette entry.
pub const PALETTE_FRACTIONS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Travel-time domain in minutes. Fixed so colors mean the same thing for
/// every selected threshold.
pub const TEMPORAL_DOMAIN_MAX: f64 = 30.0;
/// People per cell.
pub const DENSITY_DOMAIN_MAX: f64 = 1000.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorStop {
    pub stop: f64,
    pub color: Rgba,
}

/// Piecewise-linear mapping from a value to a color.
///
/// Stops are strictly increasing; the first stop is the domain minimum and
/// the last the domain maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<ColorStop>,
}

/// Builds a ramp over `[0, domain_max]` from `(fraction, color)` pairs.
///
/// Fractions are clamped to `[0, 1]` and sorted; when two fractions land on
/// the same stop the first one given wins.
pub fn build_ramp(domain_max: f64, stops: &[(f64, Rgba)]) -> ColorRamp {
    let domain_max = if domain_max.is_finite() { domain_max.max(0.0) } else { 0.0 };
    let mut scaled: Vec<ColorStop> = stops
        .iter()
        .filter(|(f, _)| !f.is_nan())
        .map(|&(f, color)| ColorStop {
            stop: f.clamp(0.0, 1.0) * domain_max,
            color,
        })
        .collect();
    scaled.sort_by(|a, b| a.stop.total_cmp(&b.stop));
    scaled.dedup_by(|later, earlier| later.stop == earlier.stop);
    ColorRamp { stops: scaled }
}

fn palette_stops() -> Vec<(f64, Rgba)> {
    PALETTE_FRACTIONS.iter().copied().zip(PALETTE).collect()
}

/// Time-to-clinic ramp used in 2D.
pub fn temporal_ramp() -> ColorRamp {
    build_ramp(TEMPORAL_DOMAIN_MAX, &palette_stops())
}

/// Population-density ramp used by the 3D extrusion.
pub fn density_ramp() -> ColorRamp {
    build_ramp(DENSITY_DOMAIN_MAX, &palette_stops())
}

impl ColorRamp {
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    pub fn domain(&self) -> Option<(f64, f64)> {
        Some((self.stops.first()?.stop, self.stops.last()?.stop))
    }

    /// `interpolate linear` over `input`.
    pub fn to_expr(&self, input: Expr) -> Expr {
        Expr::interpolate_linear(
            input,
            self.stops
                .iter()
                .map(|s| (s.stop, Expr::color(s.color)))
                .collect(),
        )
    }

    /// Color at `value`, clamped to the end stops.
    pub fn color_at(&self, value: f64) -> Option<Rgba> {
        let first = self.stops.first()?;
        let last = self.stops.last()?;
        if value <= first.stop {
            return Some(first.color);
        }
        if value >= last.stop {
            return Some(last.color);
        }
        let i = self.stops.iter().position(|s| s.stop >= value)?;
        let (lo, hi) = (self.stops[i - 1], self.stops[i]);
        let t = (value - lo.stop) / (hi.stop - lo.stop);
        Some(lo.color.lerp(hi.color, t))
    }
}

/// The ramp currently on screen, with the labels shown under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub ramp: ColorRamp,
    /// Minimum, midpoint and maximum.
    pub labels: Vec<String>,
}

pub fn legend(is_3d: bool) -> Legend {
    let (ramp, unit) = if is_3d {
        (density_ramp(), "people")
    } else {
        (temporal_ramp(), "min")
    };
    let labels = match ramp.domain() {
        Some((lo, hi)) => [lo, (lo + hi) / 2.0, hi]
            .iter()
            .map(|v| format!("{v} {unit}"))
            .collect(),
        None => Vec::new(),
    };
    Legend { ramp, labels }
}
