//! Double-buffered GPU timestamp profiler.
//!
//! Captures are issued into one slot while the other slot, recorded a frame earlier, is read back. Reading back
//! therefore only waits on data that is at least one frame old.

#[macro_use]
extern crate log;

pub mod backend;
pub mod clock;
pub mod configuration;
mod error;
pub mod profiling;
pub mod report;
pub mod sim;

pub use backend::{Context, Device, Validity};
pub use clock::{Clock, MonotonicClock};
pub use configuration::ProfilerConfiguration;
pub use error::{Capture, ConfigurationError, ProfilerError, QueryError};
pub use profiling::{FrameProfiler, Harvest, MarkerKind, MarkerMap, RunningAverage, Slot, SlotPair};
pub use report::{FrameReport, MarkerTiming, Ms};
