//! Lull - procedural ambient soundscapes with click-free mixing
//!
//! Design principles:
//! - One engine owns one audio graph; tracks and one-shot tones all feed a single master bus
//! - Noise is generated up front into seamless loops, one generator per soundscape
//! - Nodes receive parameters via message ring buffers, not shared state
//! - Every gain change is automated (ramps in, exponential approach, ramps out)
//! - A missing or suspended output device never surfaces as an error
//!
//! ```
//! use std::time::Duration;
//! use lull::{device::Offline, Engine};
//!
//! let output = Offline::new(8_000, 2);
//! let mut engine = Engine::new(output.clone());
//!
//! engine.start_track("rain", 0.6);
//! engine.start_track("fire", 0.4);
//! engine.render_for(Duration::from_millis(250));
//! engine.update_track_volume("rain", 0.2);
//! engine.play_complete();
//! engine.stop_all();
//! ```

extern crate alloc;

mod config;
mod engine;
mod error;
mod graph;
mod mix;
mod node;
mod track;

pub mod device;
pub mod effects;
pub mod noise;
pub mod nodes;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use graph::{AudioGraph, Handle};
pub use mix::{MixerConfig, SILENCE_ID};
pub use node::{AudioNode, NodeId, ProcessContext};
pub use noise::{NoiseBuffer, Soundscape};
pub use track::{Release, Track};
