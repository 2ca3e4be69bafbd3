//! Audio source nodes (generators with no audio inputs)

mod buffer_source;
mod tone;

pub use buffer_source::BufferSource;
pub use tone::Tone;
