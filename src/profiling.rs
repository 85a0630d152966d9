mod average;
mod indices;

use crate::backend::{Context, Device, Validity};
use crate::clock::{Clock, MonotonicClock};
use crate::configuration::ProfilerConfiguration;
use crate::error::{Capture, ProfilerError, QueryError};

pub use average::RunningAverage;
pub use indices::{MarkerKind, MarkerMap, Slot, SlotPair};

/// What a call to [`FrameProfiler::wait_for_data_and_update`] did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Harvest {
    /// The profiler holds no captures.
    Uninitialized,
    /// No frame has been recorded before this one, nothing to read.
    Warmup,
    /// Deltas were updated from the previous frame.
    Updated,
    /// The GPU clock was not continuous during the previous frame, its data was thrown away.
    Disjoint,
    /// Reading back a result failed, the remaining deltas keep their previous values.
    Failed,
    /// The previous frame's data did not become available within the configured number of polls.
    TimedOut,
}

struct Captures<D: Device> {
    validity: SlotPair<D::ValidityQuery>,
    timestamps: MarkerMap<SlotPair<D::TimestampQuery>>,
}

impl<D: Device> Captures<D> {
    fn new(device: &D) -> Result<Self, ProfilerError> {
        let validity = SlotPair::try_from_fn(|slot| {
            device
                .create_validity_query()
                .map_err(|source| ProfilerError::ResourceCreation {
                    capture: Capture::Validity,
                    slot,
                    source,
                })
        })?;

        let timestamps = MarkerMap::try_from_fn(|marker| {
            SlotPair::try_from_fn(|slot| {
                device
                    .create_timestamp_query()
                    .map_err(|source| ProfilerError::ResourceCreation {
                        capture: Capture::Marker(marker),
                        slot,
                        source,
                    })
            })
        })?;

        Ok(Self { validity, timestamps })
    }

    #[inline]
    fn timestamp(&self, marker: MarkerKind, slot: Slot) -> &D::TimestampQuery {
        &self.timestamps[marker][slot]
    }
}

/// Measures GPU time between the markers of a frame.
///
/// Per frame the host calls [`begin_frame`](Self::begin_frame), [`timestamp`](Self::timestamp) for every marker
/// it passes in declared order, [`end_frame`](Self::end_frame), and then exactly once
/// [`wait_for_data_and_update`](Self::wait_for_data_and_update). Captures are issued into the write slot while the
/// harvest reads the other slot, which always lags one frame behind. The profiler does not check that this cadence
/// is kept; breaking it produces meaningless numbers.
pub struct FrameProfiler<D: Device, C: Clock = MonotonicClock> {
    configuration: ProfilerConfiguration,
    clock: C,
    captures: Option<Captures<D>>,
    write_slot: Slot,
    read_slot: Option<Slot>,
    dt: MarkerMap<f32>,
    average: RunningAverage,
}

impl<D: Device> FrameProfiler<D> {
    pub fn new(configuration: ProfilerConfiguration) -> Self {
        Self::with_clock(configuration, MonotonicClock::new())
    }
}

impl<D: Device, C: Clock> FrameProfiler<D, C> {
    pub fn with_clock(configuration: ProfilerConfiguration, clock: C) -> Self {
        let average = RunningAverage::new(configuration.averaging_window(), clock.now());
        Self {
            configuration,
            clock,
            captures: None,
            write_slot: Slot::ZERO,
            read_slot: None,
            dt: Default::default(),
            average,
        }
    }

    /// Creates the validity capture and one timestamp capture per marker for both slots.
    ///
    /// Captures held from an earlier `init` are released first. On failure nothing is held and the profiler must
    /// not be used until a later `init` succeeds. Deltas and averages from before are kept.
    pub fn init(&mut self, device: &D) -> Result<(), ProfilerError> {
        self.shutdown();

        let captures = Captures::new(device).map_err(|err| {
            error!("Could not create GPU profiler captures: {}", err);
            err
        })?;

        self.captures = Some(captures);
        self.write_slot = Slot::ZERO;
        self.read_slot = None;
        self.average.restart(self.clock.now());

        debug!(
            "Created {} GPU profiler captures",
            2 * (MarkerKind::COUNT + 1)
        );

        Ok(())
    }

    /// Releases all captures. Safe to call any number of times.
    pub fn shutdown(&mut self) {
        if let Some(captures) = self.captures.take() {
            drop(captures);
            debug!("Released GPU profiler captures");
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.captures.is_some()
    }

    pub fn begin_frame(&mut self, context: &mut D::Context) {
        if let Some(captures) = self.captures.as_ref() {
            context.begin_validity(&captures.validity[self.write_slot]);
            context.write_timestamp(captures.timestamp(MarkerKind::FrameBegin, self.write_slot));
        }
    }

    pub fn timestamp(&mut self, context: &mut D::Context, marker: MarkerKind) {
        if let Some(captures) = self.captures.as_ref() {
            context.write_timestamp(captures.timestamp(marker, self.write_slot));
        }
    }

    pub fn end_frame(&mut self, context: &mut D::Context) {
        if let Some(captures) = self.captures.as_ref() {
            context.write_timestamp(captures.timestamp(MarkerKind::FrameEnd, self.write_slot));
            context.end_validity(&captures.validity[self.write_slot]);
            self.write_slot.flip();
        }
    }

    /// Reads back the frame recorded before the most recent [`end_frame`](Self::end_frame).
    ///
    /// Blocks the calling thread until that frame's validity result is available. Because the data is at least a
    /// frame old this normally returns right away.
    pub fn wait_for_data_and_update(&mut self, context: &mut D::Context) -> Harvest {
        let captures = match self.captures.as_ref() {
            Some(captures) => captures,
            None => return Harvest::Uninitialized,
        };

        let slot = match self.read_slot {
            Some(slot) => slot,
            None => {
                // Nothing has been recorded into the read slot yet.
                self.read_slot = Some(Slot::ZERO);
                return Harvest::Warmup;
            }
        };

        let validity = poll_validity::<D::Context>(&self.configuration, context, &captures.validity[slot], slot);
        self.read_slot = Some(slot.flipped());

        let validity = match validity {
            Ok(validity) => validity,
            Err(harvest) => return harvest,
        };

        if validity.disjoint {
            debug!("Timestamps disjoint in {}, discarding frame", slot);
            return Harvest::Disjoint;
        }

        if validity.frequency == 0 {
            warn!("Timestamp frequency reported as 0 in {}, discarding frame", slot);
            return Harvest::Disjoint;
        }

        let frequency = validity.frequency as f64;

        let mut previous = match read_timestamp::<D::Context>(
            context,
            captures.timestamp(MarkerKind::FrameBegin, slot),
            MarkerKind::FrameBegin,
            slot,
        ) {
            Some(timestamp) => timestamp,
            None => return Harvest::Failed,
        };

        for &marker in MarkerKind::ALL[1..].iter() {
            let timestamp = match read_timestamp::<D::Context>(context, captures.timestamp(marker, slot), marker, slot)
            {
                Some(timestamp) => timestamp,
                None => return Harvest::Failed,
            };

            // A counter that went backwards shows up as 0 rather than as a huge delta.
            let dt = (timestamp.saturating_sub(previous) as f64 / frequency) as f32;
            self.dt[marker] = dt;
            previous = timestamp;

            self.average.accumulate(marker, dt);
        }

        self.average.end_frame(self.clock.now());

        Harvest::Updated
    }

    /// Seconds between `marker` and the marker before it, in the last harvested frame.
    #[inline]
    pub fn dt(&self, marker: MarkerKind) -> f32 {
        self.dt[marker]
    }

    /// [`dt`](Self::dt) averaged over the last completed averaging window.
    #[inline]
    pub fn dt_avg(&self, marker: MarkerKind) -> f32 {
        self.average.average(marker)
    }

    /// Sum of the current per-marker [`dt`](Self::dt) values. After a [`Harvest::Failed`] these can come from two
    /// different frames.
    pub fn dt_total(&self) -> f32 {
        self.dt.iter().map(|(_, &dt)| dt).sum()
    }

    /// Sum of the per-marker [`dt_avg`](Self::dt_avg) values.
    pub fn dt_avg_total(&self) -> f32 {
        MarkerKind::ALL.iter().map(|&marker| self.average.average(marker)).sum()
    }

    #[inline]
    pub fn write_slot(&self) -> Slot {
        self.write_slot
    }

    /// The slot the next harvest reads from, `None` until the first harvest.
    #[inline]
    pub fn read_slot(&self) -> Option<Slot> {
        self.read_slot
    }

    #[inline]
    pub fn average(&self) -> &RunningAverage {
        &self.average
    }
}

impl<D: Device, C: Clock> Drop for FrameProfiler<D, C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_validity<X: Context>(
    configuration: &ProfilerConfiguration,
    context: &mut X,
    query: &X::ValidityQuery,
    slot: Slot,
) -> Result<Validity, Harvest> {
    let mut attempts: u32 = 0;
    loop {
        match context.validity_data(query) {
            Ok(Some(validity)) => return Ok(validity),
            Ok(None) => {}
            Err(err) => {
                debug!("Couldn't retrieve timestamp validity data for {}: {}", slot, err);
                return Err(Harvest::Failed);
            }
        }

        attempts += 1;
        if let Some(max_attempts) = configuration.max_poll_attempts {
            if attempts >= max_attempts {
                warn!(
                    "Timestamp validity data for {} not available after {} polls, skipping frame",
                    slot, attempts
                );
                return Err(Harvest::TimedOut);
            }
        }

        std::thread::sleep(configuration.poll_interval());
    }
}

fn read_timestamp<X: Context>(context: &mut X, query: &X::TimestampQuery, marker: MarkerKind, slot: Slot) -> Option<u64> {
    let result: Result<Option<u64>, QueryError> = context.timestamp_data(query);
    match result {
        Ok(Some(timestamp)) => Some(timestamp),
        Ok(None) => {
            debug!("Timestamp for {} in {} is not available", marker, slot);
            None
        }
        Err(err) => {
            debug!("Couldn't retrieve timestamp data for {} in {}: {}", marker, slot, err);
            None
        }
    }
}
