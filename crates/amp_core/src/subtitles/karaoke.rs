//! Karaoke ASS document generation.
//!
//! Produces a single-style ASS script where each lyric line is one
//! `Dialogue` event and each word carries a `\k` tag. A renderer fills
//! each word from SecondaryColour (upcoming) to PrimaryColour (highlight)
//! over the tag's duration.
//!
//! Rendering is a pure function: the same transcription and style always
//! produce byte-identical output.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use crate::models::{KaraokeStyle, Segment, TranscriptionResult};

use super::color::color_to_ass;
use super::timing::{format_ass_time, to_centiseconds};

/// Seconds a line appears before its first word is sung.
pub const DEFAULT_LEAD_IN_SECS: f64 = 0.5;

/// Name of the single style every event references.
pub const KARAOKE_STYLE_NAME: &str = "Karaoke";

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

const EVENT_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Render the karaoke document as a string.
pub fn render_karaoke(
    result: &TranscriptionResult,
    style: &KaraokeStyle,
    lead_in_secs: f64,
) -> String {
    let mut out = String::new();

    out.push_str("[Script Info]\n");
    out.push_str("Title: Karaoke Lyrics\n");
    out.push_str("ScriptType: v4.00+\n");
    out.push_str("PlayResX: 1280\n");
    out.push_str("PlayResY: 720\n\n");

    out.push_str("[V4+ Styles]\n");
    out.push_str(STYLE_FORMAT);
    out.push('\n');
    // Primary = after highlight, Secondary = before highlight. Bold = -1.
    let _ = writeln!(
        out,
        "Style: {},{},{},{},{},{},{},-1,0,0,0,100,100,0,0,1,2,2,2,10,10,20,1",
        KARAOKE_STYLE_NAME,
        style_field(&style.font_name),
        style.font_size,
        color_to_ass(&style.highlight_color),
        color_to_ass(&style.upcoming_color),
        color_to_ass(&style.outline_color),
        color_to_ass(&style.shadow_color),
    );
    out.push('\n');

    out.push_str("[Events]\n");
    out.push_str(EVENT_FORMAT);
    out.push('\n');

    for segment in &result.segments {
        out.push_str(&dialogue_line(segment, lead_in_secs));
        out.push('\n');
    }

    out
}

/// Render and write the document with a UTF-8 BOM.
pub fn write_karaoke(
    result: &TranscriptionResult,
    style: &KaraokeStyle,
    lead_in_secs: f64,
    path: &Path,
) -> io::Result<()> {
    let body = render_karaoke(result, style, lead_in_secs);
    let mut bytes = Vec::with_capacity(body.len() + 3);
    bytes.extend_from_slice(b"\xEF\xBB\xBF");
    bytes.extend_from_slice(body.as_bytes());
    fs::write(path, bytes)
}

/// Build one `Dialogue:` line for a segment.
fn dialogue_line(segment: &Segment, lead_in_secs: f64) -> String {
    let start = (segment.start - lead_in_secs.max(0.0)).max(0.0);
    let text = karaoke_text(segment);

    format!(
        "Dialogue: 0,{},{},{},,0,0,0,,{}",
        format_ass_time(start),
        format_ass_time(segment.end),
        KARAOKE_STYLE_NAME,
        text
    )
}

/// `{\k<cs>}word` fragments joined by single spaces.
fn karaoke_text(segment: &Segment) -> String {
    segment
        .words
        .iter()
        .map(|w| {
            format!(
                "{{\\k{}}}{}",
                to_centiseconds(w.duration()),
                lyric_text(&w.text)
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word text with override-block and escape characters removed.
fn lyric_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '{' | '}' | '\\'))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Style values are comma separated; a comma inside one shifts every later field.
fn style_field(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != ',' && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
