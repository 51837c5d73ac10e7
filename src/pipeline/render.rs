use std::time::{Duration, Instant};

use chrono::Local;
use tracing::warn;

use crate::chart::{ChartFrame, ChartSurface};
use crate::errors::RenderError;
use crate::store::AggregateStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames:   u64,
    pub failures: u64,
    pub dropped:  u64,
}

/// Redraws the chart from a fresh snapshot of the store on every tick.
/// Only ever reads the store, and never waits on the ingestion side.
pub struct RenderTimer<C> {
    store:   AggregateStore,
    surface: C,
    period:  Duration,
    stats:   RenderStats,
}

impl<C: ChartSurface> RenderTimer<C> {
    pub fn new(store: AggregateStore, surface: C, period: Duration) -> RenderTimer<C> {
        RenderTimer { store: store, surface: surface, period: period, stats: RenderStats::default() }
    }

    pub fn period(&self) -> Duration { self.period }

    pub fn stats(&self) -> &RenderStats { &self.stats }

    pub fn into_surface(self) -> C { self.surface }

    /// Snapshot the store and draw it.
    pub fn fire(&mut self) -> Result<(), RenderError> {
        let frame = ChartFrame::from_snapshot(&self.store.snapshot(), Local::now());
        self.surface.draw(&frame)?;
        self.stats.frames += 1;
        Ok(())
    }

    /// Like [`RenderTimer::fire`], but a failed draw is only logged.
    pub fn tick(&mut self) {
        if let Err(err) = self.fire() {
            self.stats.failures += 1;
            warn!(error = %err, "render failed, frame skipped");
        }
    }

    pub fn record_dropped(&mut self, dropped: u32) {
        if dropped > 0 {
            self.stats.dropped += dropped as u64;
            warn!(dropped = dropped, period_ms = self.period.as_millis() as u64, "render overran its period, frames dropped");
        }
    }
}

/// Deadline following `deadline`, given that the tick due at `deadline` finished at `now`.
/// Ticks whose deadline already passed are skipped rather than queued; their number is returned.
pub fn next_deadline(deadline: Instant, period: Duration, now: Instant) -> (Instant, u32) {
    let next = deadline + period;
    if next > now || period == Duration::from_nanos(0) {
        return (next, 0);
    }

    let behind = now.duration_since(next).as_nanos() / period.as_nanos();
    let missed = (behind + 1).min(u32::MAX as u128) as u32;
    (next + period * missed, missed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<ChartFrame>,
    }

    impl ChartSurface for Recorder {
        fn draw(&mut self, frame: &ChartFrame) -> Result<(), RenderError> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    struct Broken;

    impl ChartSurface for Broken {
        fn draw(&mut self, _frame: &ChartFrame) -> Result<(), RenderError> {
            Err(RenderError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "display gone")))
        }
    }

    #[test]
    fn each_tick_draws_the_current_counts() {
        let store = AggregateStore::new();
        let mut timer = RenderTimer::new(store.clone(), Recorder::default(), Duration::from_millis(10));

        timer.tick();
        store.increment("cats");
        store.increment("cats");
        timer.tick();

        let frames = timer.into_surface().frames;
        assert_eq!(frames.len(), 2);
        assert!(frames[0].bars.is_empty());
        assert_eq!(frames[1].bars.len(), 1);
        assert_eq!(frames[1].bars[0].label, "cats");
        assert_eq!(frames[1].bars[0].count, 2);
    }

    #[test]
    fn render_failures_are_counted_not_raised() {
        let store = AggregateStore::new();
        store.increment("cats");
        let mut timer = RenderTimer::new(store.clone(), Broken, Duration::from_millis(10));

        assert!(timer.fire().is_err());
        timer.tick();
        timer.tick();

        assert_eq!(timer.stats(), &RenderStats { frames: 0, failures: 2, dropped: 0 });
        // the store is untouched by failing renders
        assert_eq!(store.snapshot().get("cats"), Some(1));
    }

    #[test]
    fn on_time_ticks_advance_by_one_period() {
        let start = Instant::now();
        let period = Duration::from_millis(100);
        let (next, dropped) = next_deadline(start, period, start + Duration::from_millis(30));
        assert_eq!(next, start + period);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn overruns_drop_missed_ticks() {
        let start = Instant::now();
        let period = Duration::from_millis(100);

        // finished 250ms late: the ticks due at +100 and +200 are gone
        let (next, dropped) = next_deadline(start, period, start + Duration::from_millis(250));
        assert_eq!(next, start + Duration::from_millis(300));
        assert_eq!(dropped, 2);

        // finishing exactly on the next deadline drops that tick as well
        let (next, dropped) = next_deadline(start, period, start + Duration::from_millis(100));
        assert_eq!(next, start + Duration::from_millis(200));
        assert_eq!(dropped, 1);
    }
}
