//! Audio effect nodes (processors with audio inputs and outputs)

mod gain;
mod mixer;

pub use gain::{Gain, GainMessage, GainProbe};
pub use mixer::Mixer;
