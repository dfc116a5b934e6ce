//! Value mapping and color helpers
//!
//! Small designer-math utilities for projecting spring output onto host
//! properties: linear range remapping, degree/radian conversion, and hex
//! color interpolation for color-animating hosts.

/// Linearly remap `value` from one range onto another.
///
/// Values outside the source range extrapolate, which is what a spring
/// overshooting its target should do to the mapped property.
pub fn map_value_in_range(
    value: f64,
    from_low: f64,
    from_high: f64,
    to_low: f64,
    to_high: f64,
) -> f64 {
    let from_range_size = from_high - from_low;
    let to_range_size = to_high - to_low;
    let value_scale = (value - from_low) / from_range_size;
    to_low + value_scale * to_range_size
}

pub fn degrees_to_radians(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

pub fn radians_to_degrees(rad: f64) -> f64 {
    rad * 180.0 / std::f64::consts::PI
}

/// Parse a `#rrggbb` or `rrggbb` color string (case-insensitive).
///
/// Returns `None` for anything that is not six hex digits.
pub fn hex_to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Format RGB components as `#rrggbb`.
pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Interpolate between two hex colors by `value` in [0, 1], clamping each
/// channel so an overshooting spring still yields a valid color.
///
/// Returns `None` when either endpoint fails to parse.
pub fn interpolate_hex_color(value: f64, start_color: &str, end_color: &str) -> Option<String> {
    let (r1, g1, b1) = hex_to_rgb(start_color)?;
    let (r2, g2, b2) = hex_to_rgb(end_color)?;
    let channel = |a: u8, b: u8| {
        let mixed = map_value_in_range(value, 0.0, 1.0, f64::from(a), f64::from(b));
        mixed.round().clamp(0.0, 255.0) as u8
    };
    Some(rgb_to_hex(
        channel(r1, r2),
        channel(g1, g2),
        channel(b1, b2),
    ))
}
