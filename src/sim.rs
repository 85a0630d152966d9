//! Deterministic in-process GPU used to drive the profiler without a graphics API.
//!
//! The host moves the GPU clock forward explicitly with [`SimContext::advance`]. Every command gets a submission
//! number. A validity query becomes available after `latency` unsuccessful polls and completing it completes every
//! command submitted before it, the way a real GPU retires work in order.

use crate::backend::{Context, Device, Validity};
use crate::clock::Clock;
use crate::error::QueryError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Default)]
struct TimestampRecord {
    // (submission, ticks)
    issued: Option<(u64, u64)>,
}

#[derive(Debug, Default)]
struct ValidityRecord {
    ended: Option<(u64, Validity)>,
    polls_remaining: u32,
}

#[derive(Debug)]
struct Gpu {
    ticks: u64,
    frequency: u64,
    latency: u32,
    submitted: u64,
    completed: u64,
    disjoint: bool,
    timestamps: Vec<TimestampRecord>,
    validity: Vec<ValidityRecord>,
    live_queries: usize,
    creations_left: Option<usize>,
    timestamp_failure_in: Option<u32>,
    failing_validity_reads: u32,
}

impl Gpu {
    fn submit(&mut self) -> u64 {
        self.submitted += 1;
        self.submitted
    }

    fn allocate(&mut self) -> Result<(), QueryError> {
        if let Some(left) = self.creations_left.as_mut() {
            if *left == 0 {
                return Err(QueryError::OutOfMemory);
            }
            *left -= 1;
        }
        self.live_queries += 1;
        Ok(())
    }
}

type SharedGpu = Rc<RefCell<Gpu>>;

fn release(gpu: &SharedGpu) {
    if let Ok(mut gpu) = gpu.try_borrow_mut() {
        gpu.live_queries = gpu.live_queries.saturating_sub(1);
    }
}

#[derive(Debug)]
pub struct SimTimestampQuery {
    id: usize,
    gpu: SharedGpu,
}

impl Drop for SimTimestampQuery {
    fn drop(&mut self) {
        release(&self.gpu);
    }
}

#[derive(Debug)]
pub struct SimValidityQuery {
    id: usize,
    gpu: SharedGpu,
}

impl Drop for SimValidityQuery {
    fn drop(&mut self) {
        release(&self.gpu);
    }
}

#[derive(Debug, Clone)]
pub struct SimDevice {
    gpu: SharedGpu,
}

impl SimDevice {
    pub fn new(frequency: u64) -> Self {
        Self {
            gpu: Rc::new(RefCell::new(Gpu {
                ticks: 0,
                frequency,
                latency: 0,
                submitted: 0,
                completed: 0,
                disjoint: false,
                timestamps: Vec::new(),
                validity: Vec::new(),
                live_queries: 0,
                creations_left: None,
                timestamp_failure_in: None,
                failing_validity_reads: 0,
            })),
        }
    }

    /// Number of unsuccessful polls before a validity query becomes available.
    pub fn with_latency(self, latency: u32) -> Self {
        self.gpu.borrow_mut().latency = latency;
        self
    }

    pub fn context(&self) -> SimContext {
        SimContext { gpu: Rc::clone(&self.gpu) }
    }

    /// Lets `count` more query creations succeed, every one after that fails.
    pub fn fail_after(&self, count: usize) {
        self.gpu.borrow_mut().creations_left = Some(count);
    }

    /// Queries created and not yet dropped.
    pub fn live_queries(&self) -> usize {
        self.gpu.borrow().live_queries
    }
}

impl Device for SimDevice {
    type TimestampQuery = SimTimestampQuery;
    type ValidityQuery = SimValidityQuery;
    type Context = SimContext;

    fn create_timestamp_query(&self) -> Result<SimTimestampQuery, QueryError> {
        let mut gpu = self.gpu.borrow_mut();
        gpu.allocate()?;
        gpu.timestamps.push(TimestampRecord::default());
        Ok(SimTimestampQuery {
            id: gpu.timestamps.len() - 1,
            gpu: Rc::clone(&self.gpu),
        })
    }

    fn create_validity_query(&self) -> Result<SimValidityQuery, QueryError> {
        let mut gpu = self.gpu.borrow_mut();
        gpu.allocate()?;
        gpu.validity.push(ValidityRecord::default());
        Ok(SimValidityQuery {
            id: gpu.validity.len() - 1,
            gpu: Rc::clone(&self.gpu),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SimContext {
    gpu: SharedGpu,
}

impl SimContext {
    /// Moves the GPU clock forward, standing in for the work executed between two timestamps.
    pub fn advance(&mut self, ticks: u64) {
        self.gpu.borrow_mut().ticks += ticks;
    }

    pub fn set_frequency(&mut self, frequency: u64) {
        self.gpu.borrow_mut().frequency = frequency;
    }

    /// Marks the validity period that is currently open (or the next one to end) as disjoint.
    pub fn inject_disjoint(&mut self) {
        self.gpu.borrow_mut().disjoint = true;
    }

    /// Lets `successful` more timestamp reads through and fails the one after.
    pub fn fail_timestamp_read_after(&mut self, successful: u32) {
        self.gpu.borrow_mut().timestamp_failure_in = Some(successful);
    }

    /// Makes the next `count` validity reads fail.
    pub fn fail_validity_reads(&mut self, count: u32) {
        self.gpu.borrow_mut().failing_validity_reads = count;
    }

    /// Completes every submitted command, validity queries become available without polling.
    pub fn finish(&mut self) {
        let mut gpu = self.gpu.borrow_mut();
        gpu.completed = gpu.submitted;
        for record in gpu.validity.iter_mut() {
            record.polls_remaining = 0;
        }
    }
}

impl Context for SimContext {
    type TimestampQuery = SimTimestampQuery;
    type ValidityQuery = SimValidityQuery;

    fn begin_validity(&mut self, query: &SimValidityQuery) {
        let mut gpu = self.gpu.borrow_mut();
        gpu.submit();
        gpu.validity[query.id].ended = None;
    }

    fn end_validity(&mut self, query: &SimValidityQuery) {
        let mut gpu = self.gpu.borrow_mut();
        let submission = gpu.submit();
        let validity = Validity {
            frequency: gpu.frequency,
            disjoint: gpu.disjoint,
        };
        let latency = gpu.latency;
        gpu.disjoint = false;
        let record = &mut gpu.validity[query.id];
        record.ended = Some((submission, validity));
        record.polls_remaining = latency;
    }

    fn write_timestamp(&mut self, query: &SimTimestampQuery) {
        let mut gpu = self.gpu.borrow_mut();
        let submission = gpu.submit();
        let ticks = gpu.ticks;
        gpu.timestamps[query.id].issued = Some((submission, ticks));
    }

    fn validity_data(&mut self, query: &SimValidityQuery) -> Result<Option<Validity>, QueryError> {
        let mut gpu = self.gpu.borrow_mut();
        if gpu.failing_validity_reads > 0 {
            gpu.failing_validity_reads -= 1;
            return Err(QueryError::Backend("simulated validity read failure".to_string()));
        }

        let record = &mut gpu.validity[query.id];
        let (submission, validity) = match record.ended {
            Some(ended) => ended,
            None => return Ok(None),
        };
        if record.polls_remaining > 0 {
            record.polls_remaining -= 1;
            return Ok(None);
        }

        gpu.completed = gpu.completed.max(submission);
        Ok(Some(validity))
    }

    fn timestamp_data(&mut self, query: &SimTimestampQuery) -> Result<Option<u64>, QueryError> {
        let mut gpu = self.gpu.borrow_mut();
        match gpu.timestamp_failure_in {
            Some(0) => {
                gpu.timestamp_failure_in = None;
                return Err(QueryError::Backend("simulated timestamp read failure".to_string()));
            }
            Some(left) => gpu.timestamp_failure_in = Some(left - 1),
            None => {}
        }

        match gpu.timestamps[query.id].issued {
            Some((submission, ticks)) if submission <= gpu.completed => Ok(Some(ticks)),
            _ => Ok(None),
        }
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.0.set(self.0.get() + duration);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Duration {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_complete_with_the_validity_query_after_them() {
        let device = SimDevice::new(1000).with_latency(2);
        let mut context = device.context();
        let validity = device.create_validity_query().unwrap();
        let timestamp = device.create_timestamp_query().unwrap();

        context.advance(5);
        context.begin_validity(&validity);
        context.write_timestamp(&timestamp);
        context.end_validity(&validity);

        assert_eq!(Ok(None), context.timestamp_data(&timestamp));
        assert_eq!(Ok(None), context.validity_data(&validity));
        assert_eq!(Ok(None), context.validity_data(&validity));
        assert_eq!(
            Ok(Some(Validity {
                frequency: 1000,
                disjoint: false
            })),
            context.validity_data(&validity)
        );
        assert_eq!(Ok(Some(5)), context.timestamp_data(&timestamp));
    }

    #[test]
    fn never_issued_queries_are_never_available() {
        let device = SimDevice::new(1000);
        let mut context = device.context();
        let validity = device.create_validity_query().unwrap();
        let timestamp = device.create_timestamp_query().unwrap();
        context.finish();
        assert_eq!(Ok(None), context.validity_data(&validity));
        assert_eq!(Ok(None), context.timestamp_data(&timestamp));
    }

    #[test]
    fn disjoint_applies_to_one_period() {
        let device = SimDevice::new(1000);
        let mut context = device.context();
        let validity = device.create_validity_query().unwrap();

        context.begin_validity(&validity);
        context.inject_disjoint();
        context.end_validity(&validity);
        assert_eq!(Some(true), context.validity_data(&validity).unwrap().map(|v| v.disjoint));

        context.begin_validity(&validity);
        context.end_validity(&validity);
        assert_eq!(Some(false), context.validity_data(&validity).unwrap().map(|v| v.disjoint));
    }

    #[test]
    fn creation_failures_and_live_queries() {
        let device = SimDevice::new(1000);
        device.fail_after(1);
        let first = device.create_timestamp_query().unwrap();
        assert_eq!(Err(QueryError::OutOfMemory), device.create_validity_query().map(|_| ()));
        assert_eq!(1, device.live_queries());
        drop(first);
        assert_eq!(0, device.live_queries());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(3));
        assert_eq!(Duration::from_millis(3), other.now());
    }
}
