/// 8-bit RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Parses `#RRGGBB`, `#RRGGBBAA` or `rgba(r,g,b,a)` with `a` in `[0, 1]`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let inner = s.strip_prefix("rgba(")?.strip_suffix(')')?;
        let mut parts = inner.split(',').map(str::trim);
        let r = parts.next()?.parse().ok()?;
        let g = parts.next()?.parse().ok()?;
        let b = parts.next()?.parse().ok()?;
        let a: f64 = parts.next()?.parse().ok()?;
        if parts.next().is_some() || !(0.0..=1.0).contains(&a) {
            return None;
        }
        Some(Self::new(r, g, b, (a * 255.0).round() as u8))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// CSS form understood by the style engine: `#RRGGBB` when opaque,
    /// `rgba(...)` otherwise.
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            let a = f64::from(self.a) / 255.0;
            format!("rgba({},{},{},{})", self.r, self.g, self.b, trim_float(a))
        }
    }

    /// Channel-wise linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

fn trim_float(v: f64) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

#[cfg(test)]
mod tests {
    use super::Rgba;

    #[test]
    fn parses_hex_and_rgba() {
        assert_eq!(Rgba::parse("#3C64B4"), Some(Rgba::rgb(0x3C, 0x64, 0xB4)));
        assert_eq!(Rgba::parse("#3c64b480"), Some(Rgba::new(0x3C, 0x64, 0xB4, 0x80)));
        assert_eq!(Rgba::parse("rgba(0,0,0,0)"), Some(Rgba::TRANSPARENT));
        assert_eq!(Rgba::parse("rgba(0,0,0,2)"), None);
        assert_eq!(Rgba::parse("#12345"), None);
        assert_eq!(Rgba::parse("teal"), None);
    }

    #[test]
    fn css_roundtrips_through_parse() {
        for c in [Rgba::rgb(0x8C, 0x14, 0x46), Rgba::TRANSPARENT, Rgba::WHITE] {
            assert_eq!(Rgba::parse(&c.to_css()), Some(c));
        }
        assert_eq!(Rgba::TRANSPARENT.to_css(), "rgba(0,0,0,0)");
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let a = Rgba::rgb(0, 0, 0);
        let b = Rgba::rgb(200, 100, 50);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Rgba::rgb(100, 50, 25));
        assert_eq!(a.lerp(b, 7.0), b);
    }
}
