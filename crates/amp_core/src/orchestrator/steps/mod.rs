//! Pipeline step implementations.
//!
//! Each step handles one phase of a remix run.

mod acquire;
mod effects;
mod export;
mod mix;
mod separate;
mod setup;
mod split;
mod transcribe;

pub use acquire::{AcquireStep, AUDIO_SELECTOR, FULL_AUDIO_FILE, VIDEO_SELECTOR};
pub use effects::{effect_chain, EffectsStep, EFFECTED_AUDIO_FILE};
pub use export::{remixed_path, stem_output_path, stems_dir, ExportStep};
pub use mix::{mixed_chunk_name, qualifying_inputs, MixStep, MIXED_AUDIO_FILE};
pub use separate::{stem_path, SeparateStep};
pub use setup::{sanitize_title, SetupStep};
pub use split::{chunk_bounds, chunk_count, chunk_file_name, SplitStep};
pub use transcribe::{TranscribeStep, SUBTITLE_FILE};
