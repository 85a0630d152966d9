//! The seam between the profiler and the graphics API.
//!
//! A backend provides two kinds of queries. Timestamp queries capture the GPU clock when the GPU reaches them in the
//! command stream. Validity queries bracket a whole frame and report whether the clock was continuous over that
//! period together with its frequency. Query handles release their GPU resource when dropped.

use crate::error::QueryError;

/// Result of a validity query.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Validity {
    /// Timestamp ticks per second.
    pub frequency: u64,
    /// The timestamps captured inside the bracketed period can not be trusted.
    pub disjoint: bool,
}

pub trait Device {
    type TimestampQuery;
    type ValidityQuery;
    type Context: Context<TimestampQuery = Self::TimestampQuery, ValidityQuery = Self::ValidityQuery>;

    fn create_timestamp_query(&self) -> Result<Self::TimestampQuery, QueryError>;

    fn create_validity_query(&self) -> Result<Self::ValidityQuery, QueryError>;
}

/// Issues and reads back queries. Issuing only enqueues commands and never blocks.
pub trait Context {
    type TimestampQuery;
    type ValidityQuery;

    fn begin_validity(&mut self, query: &Self::ValidityQuery);

    fn end_validity(&mut self, query: &Self::ValidityQuery);

    fn write_timestamp(&mut self, query: &Self::TimestampQuery);

    /// Returns `Ok(None)` while the GPU has not finished the bracketed period.
    fn validity_data(&mut self, query: &Self::ValidityQuery) -> Result<Option<Validity>, QueryError>;

    /// Returns `Ok(None)` while the GPU has not reached the timestamp.
    fn timestamp_data(&mut self, query: &Self::TimestampQuery) -> Result<Option<u64>, QueryError>;
}
