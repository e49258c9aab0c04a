//! Color conversion between UI hex colors and ASS color tokens.

/// Fallback token for malformed input (opaque white).
pub const FALLBACK_ASS_COLOR: &str = "&H00FFFFFF&";

/// Convert a `#RRGGBB` color into an ASS `&HBBGGRR&` token.
///
/// ASS stores colors little-endian (blue first). Anything that is not
/// exactly `#` followed by six hex digits yields [`FALLBACK_ASS_COLOR`],
/// so a bad stored setting never aborts a run.
pub fn color_to_ass(color: &str) -> String {
    let Some(hex) = color.strip_prefix('#') else {
        return FALLBACK_ASS_COLOR.to_string();
    };

    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return FALLBACK_ASS_COLOR.to_string();
    }

    let (r, rest) = hex.split_at(2);
    let (g, b) = rest.split_at(2);
    format!("&H{}{}{}&", b, g, r).to_ascii_uppercase()
}
