//! FIFF streams
//!
//! Positioned reading and navigation ([`FiffStream`]), writing with block
//! and file framing ([`FiffWriter`]), and live sources with a bounded
//! blocking read ([`live`]).

mod config;
#[cfg(feature = "debug-tools")]
mod debug;
pub mod live;
mod reader;
mod writer;

pub use config::StreamConfig;
#[cfg(feature = "debug-tools")]
pub use debug::TagRecorder;
pub use live::{CancelToken, LiveReader, LiveWriter, Wait};
pub use reader::{FiffStream, Tags};
pub use writer::FiffWriter;
