//! Shared animation clock and pulse sampling.
//!
//! One [`AnimationClock`] drives every pulse on the map. It is owned by the
//! engine and passed by reference to whatever needs elapsed time; nothing else
//! can start or stop it. Ticks are delivered by the owner's frame loop through
//! [`AnimationClock::tick`], which runs the registered callback synchronously.
//! Callbacks are plain `FnMut(f64)` so they cannot suspend.
//!
//! Starting a running clock is a no-op reported as [`CoreError::ClockMisuse`]:
//! the existing ramp keeps its start time and callback, so there is never more
//! than one ramp.

use std::time::Instant;

use serde::Serialize;

use crate::error::CoreError;

// ---

pub type TickCallback = Box<dyn FnMut(f64) + Send>;

struct Ramp {
    started_at: Instant,
    on_tick: TickCallback,
}

/// Snapshot of clock state for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClockStatus {
    pub running: bool,
    pub elapsed_secs: f64,
    pub frames: u64,
}

#[derive(Default)]
pub struct AnimationClock {
    // ---
    ramp: Option<Ramp>,
    elapsed_secs: f64,
    frames: u64,
}

impl std::fmt::Debug for AnimationClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationClock")
            .field("running", &self.is_running())
            .field("elapsed_secs", &self.elapsed_secs)
            .field("frames", &self.frames)
            .finish()
    }
}

impl AnimationClock {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an unbounded linear ramp at `now`.
    pub fn start(&mut self, now: Instant, on_tick: TickCallback) -> Result<(), CoreError> {
        // ---
        if self.ramp.is_some() {
            return Err(CoreError::ClockMisuse);
        }
        self.elapsed_secs = 0.0;
        self.frames = 0;
        self.ramp = Some(Ramp {
            started_at: now,
            on_tick,
        });
        tracing::info!("animation clock started");
        Ok(())
    }

    /// Cancel the ramp and reset elapsed time. The callback is dropped here,
    /// so it can never fire after `stop` returns.
    pub fn stop(&mut self) {
        // ---
        if self.ramp.take().is_some() {
            tracing::info!(frames = self.frames, "animation clock stopped");
        }
        self.elapsed_secs = 0.0;
        self.frames = 0;
    }

    /// Advance to the frame boundary at `now`.
    ///
    /// Returns the elapsed seconds since start, or `None` when stopped.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        // ---
        let ramp = self.ramp.as_mut()?;
        let elapsed = now.saturating_duration_since(ramp.started_at).as_secs_f64();
        // Instants handed in out of order must not run the ramp backwards.
        self.elapsed_secs = self.elapsed_secs.max(elapsed);
        self.frames += 1;
        (ramp.on_tick)(self.elapsed_secs);
        tracing::trace!(frame = self.frames, elapsed = self.elapsed_secs, "clock tick");
        Some(self.elapsed_secs)
    }

    pub fn is_running(&self) -> bool {
        self.ramp.is_some()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn status(&self) -> ClockStatus {
        ClockStatus {
            running: self.is_running(),
            elapsed_secs: self.elapsed_secs,
            frames: self.frames,
        }
    }
}

/// Visual state of one pulse at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PulseFrame {
    pub radius_scale: f64,
    pub opacity: f64,
}

/// Expanding-ring pulse parameters. Sampling is a pure function of the shared
/// elapsed time, so pulses with equal periods are always in phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub period_secs: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Pulse {
    // ---
    pub const fn new(period_secs: f64, min_scale: f64, max_scale: f64) -> Self {
        Self {
            period_secs,
            min_scale,
            max_scale,
        }
    }

    pub fn phase(&self, elapsed_secs: f64) -> f64 {
        if self.period_secs <= 0.0 || !elapsed_secs.is_finite() {
            return 0.0;
        }
        (elapsed_secs / self.period_secs).fract()
    }

    pub fn sample(&self, elapsed_secs: f64) -> PulseFrame {
        // ---
        let phase = self.phase(elapsed_secs);
        PulseFrame {
            radius_scale: self.min_scale + (self.max_scale - self.min_scale) * phase,
            opacity: 1.0 - phase,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn counting_callback() -> (TickCallback, Arc<AtomicUsize>) {
        // ---
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        let callback = Box::new(move |_elapsed: f64| {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (callback, count)
    }

    #[test]
    fn test_tick_reports_elapsed_since_start() {
        // ---
        let t0 = Instant::now();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut clock = AnimationClock::new();
        clock
            .start(t0, Box::new(move |e| sink.lock().unwrap().push(e)))
            .unwrap();

        assert_eq!(clock.tick(t0 + Duration::from_millis(500)), Some(0.5));
        assert_eq!(clock.tick(t0 + Duration::from_secs(2)), Some(2.0));
        assert_eq!(*seen.lock().unwrap(), vec![0.5, 2.0]);
        assert_eq!(clock.status().frames, 2);
    }

    #[test]
    fn test_double_start_keeps_single_ramp() {
        // ---
        let t0 = Instant::now();
        let (first, first_count) = counting_callback();
        let (second, second_count) = counting_callback();
        let mut clock = AnimationClock::new();

        clock.start(t0, first).unwrap();
        let again = clock.start(t0 + Duration::from_secs(5), second);
        assert_eq!(again, Err(CoreError::ClockMisuse));

        // Original start time is kept.
        assert_eq!(clock.tick(t0 + Duration::from_secs(6)), Some(6.0));
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_then_start_resets_elapsed() {
        // ---
        let t0 = Instant::now();
        let (callback, count) = counting_callback();
        let mut clock = AnimationClock::new();
        clock.start(t0, callback).unwrap();
        clock.tick(t0 + Duration::from_secs(3));

        clock.stop();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_secs(), 0.0);
        assert_eq!(clock.tick(t0 + Duration::from_secs(4)), None);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let (callback, _) = counting_callback();
        let t1 = t0 + Duration::from_secs(10);
        clock.start(t1, callback).unwrap();
        assert_eq!(clock.elapsed_secs(), 0.0);
        assert_eq!(clock.tick(t1 + Duration::from_millis(250)), Some(0.25));
    }

    #[test]
    fn test_stale_instant_does_not_rewind() {
        // ---
        let t0 = Instant::now();
        let (callback, _) = counting_callback();
        let mut clock = AnimationClock::new();
        clock.start(t0, callback).unwrap();
        clock.tick(t0 + Duration::from_secs(2));
        assert_eq!(clock.tick(t0 + Duration::from_secs(1)), Some(2.0));
    }

    #[test]
    fn test_pulses_share_phase() {
        // ---
        let a = Pulse::new(2.0, 1.0, 3.0);
        let b = Pulse::new(2.0, 0.5, 1.5);
        for elapsed in [0.0, 0.5, 1.0, 3.7] {
            assert_eq!(a.phase(elapsed), b.phase(elapsed));
            assert_eq!(a.sample(elapsed).opacity, b.sample(elapsed).opacity);
        }
        assert_eq!(a.sample(1.0), PulseFrame { radius_scale: 2.0, opacity: 0.5 });
        assert_eq!(a.sample(0.0), PulseFrame { radius_scale: 1.0, opacity: 1.0 });
    }
}
