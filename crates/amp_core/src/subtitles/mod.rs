//! Karaoke subtitle generation.
//!
//! Converts word-timed transcriptions into an ASS script with per-word
//! `\k` highlight tags.

mod color;
mod karaoke;
mod timing;

pub use color::{color_to_ass, FALLBACK_ASS_COLOR};
pub use karaoke::{render_karaoke, write_karaoke, DEFAULT_LEAD_IN_SECS, KARAOKE_STYLE_NAME};
pub use timing::{format_ass_time, to_centiseconds};
