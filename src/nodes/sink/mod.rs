//! Audio sink nodes (consumers with no audio outputs)

mod rtrb_sink;

pub use rtrb_sink::RtrbSink;
