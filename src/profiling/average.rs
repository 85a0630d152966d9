use super::{MarkerKind, MarkerMap};
use std::time::Duration;

/// Averages per-marker deltas over a window of real time.
///
/// Deltas are summed until the window has been open for longer than its length. The next completed frame then
/// turns the sums into averages and opens a new window.
#[derive(Debug, Clone)]
pub struct RunningAverage {
    window: Duration,
    window_start: Duration,
    frame_count: u32,
    totals: MarkerMap<f32>,
    averages: MarkerMap<f32>,
}

impl RunningAverage {
    pub fn new(window: Duration, now: Duration) -> Self {
        Self {
            window,
            window_start: now,
            frame_count: 0,
            totals: Default::default(),
            averages: Default::default(),
        }
    }

    /// Discards the running sums and opens a new window. Averages computed so far are kept.
    pub fn restart(&mut self, now: Duration) {
        self.totals.fill(0.0);
        self.frame_count = 0;
        self.window_start = now;
    }

    #[inline]
    pub fn accumulate(&mut self, marker: MarkerKind, dt: f32) {
        self.totals[marker] += dt;
    }

    /// Counts a completed frame. Returns true when the window closed and the averages were recomputed.
    pub fn end_frame(&mut self, now: Duration) -> bool {
        self.frame_count += 1;

        let elapsed = match now.checked_sub(self.window_start) {
            Some(elapsed) => elapsed,
            None => return false,
        };

        if elapsed <= self.window {
            return false;
        }

        let frame_count = self.frame_count as f32;
        for &marker in MarkerKind::ALL.iter() {
            self.averages[marker] = self.totals[marker] / frame_count;
        }

        trace!(
            "Averaged {} frames over {:.3}s",
            self.frame_count,
            elapsed.as_secs_f32()
        );

        self.restart(now);
        true
    }

    #[inline]
    pub fn average(&self, marker: MarkerKind) -> f32 {
        self.averages[marker]
    }

    #[inline]
    pub fn total(&self, marker: MarkerKind) -> f32 {
        self.totals[marker]
    }

    #[inline]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    #[inline]
    pub fn window_start(&self) -> Duration {
        self.window_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn averages_are_zero_before_the_first_window_closes() {
        let mut average = RunningAverage::new(ms(500), ms(0));
        average.accumulate(MarkerKind::ZPass, 0.004);
        assert!(!average.end_frame(ms(100)));
        assert_eq!(0.0, average.average(MarkerKind::ZPass));
        assert_eq!(1, average.frame_count());
    }

    #[test]
    fn window_closes_strictly_after_its_length() {
        let mut average = RunningAverage::new(ms(500), ms(0));
        average.accumulate(MarkerKind::ZPass, 0.002);
        assert!(!average.end_frame(ms(500)));

        average.accumulate(MarkerKind::ZPass, 0.004);
        assert!(average.end_frame(ms(501)));

        assert!((average.average(MarkerKind::ZPass) - 0.003).abs() < 1e-7);
        assert_eq!(0.0, average.total(MarkerKind::ZPass));
        assert_eq!(0, average.frame_count());
        assert_eq!(ms(501), average.window_start());
    }

    #[test]
    fn restart_keeps_averages() {
        let mut average = RunningAverage::new(ms(0), ms(0));
        average.accumulate(MarkerKind::MainPass, 0.010);
        assert!(average.end_frame(ms(1)));
        average.accumulate(MarkerKind::MainPass, 0.5);
        average.restart(ms(2));
        assert_eq!(0.0, average.total(MarkerKind::MainPass));
        assert!((average.average(MarkerKind::MainPass) - 0.010).abs() < 1e-7);
    }
}
