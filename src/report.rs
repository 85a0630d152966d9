use crate::backend::Device;
use crate::clock::Clock;
use crate::profiling::{FrameProfiler, MarkerKind};

/// Seconds, displayed as milliseconds.
#[derive(serde::Serialize, Copy, Clone, PartialEq, PartialOrd, Default)]
pub struct Ms(pub f32);

impl std::fmt::Debug for Ms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:7.3}ms", self.0 * 1000.0)
    }
}

impl std::fmt::Display for Ms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(serde::Serialize, Debug, Copy, Clone, PartialEq)]
pub struct MarkerTiming {
    pub marker: MarkerKind,
    pub dt: Ms,
    pub dt_avg: Ms,
}

/// Snapshot of the profiler's timings, one row per marker after `FrameBegin`.
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub markers: Vec<MarkerTiming>,
    pub total: Ms,
    pub total_avg: Ms,
}

impl FrameReport {
    pub fn new<D: Device, C: Clock>(profiler: &FrameProfiler<D, C>) -> Self {
        Self {
            markers: MarkerKind::ALL[1..]
                .iter()
                .map(|&marker| MarkerTiming {
                    marker,
                    dt: Ms(profiler.dt(marker)),
                    dt_avg: Ms(profiler.dt_avg(marker)),
                })
                .collect(),
            total: Ms(profiler.dt_total()),
            total_avg: Ms(profiler.dt_avg_total()),
        }
    }
}

impl std::fmt::Display for FrameReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<16} {:>9} {:>9}", "GPU", "last", "avg")?;
        for timing in self.markers.iter() {
            writeln!(f, "{:<16} {} {}", timing.marker.name(), timing.dt, timing.dt_avg)?;
        }
        write!(f, "{:<16} {} {}", "total", self.total, self.total_avg)
    }
}
