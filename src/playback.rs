use std::collections::HashMap;
use std::time::Instant;

/// Time source for the output audio timeline, in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Monotonic wall clock anchored at scheduler creation.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Destination for scheduled samples: a ring-buffer producer feeding the
/// output device in production, a recording sink in tests.
pub trait PlaybackSink {
    fn play(&mut self, samples: &[f32]);

    /// Discard everything queued but not yet played.
    fn clear(&mut self);
}

/// A buffer admitted to the output timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduled {
    pub id: u64,
    pub starts_at: f64,
    pub duration: f64,
}

/// Owns the output audio timeline.
///
/// Decoded buffers arrive in separate network messages at irregular
/// intervals; each is scheduled at `max(cursor, now)` and the cursor advances
/// by its duration, so playback is strictly sequential with no gaps or
/// overlaps. `stop_all` is the hard interrupt: every active handle is
/// dropped, the sink is flushed, and the cursor resets to zero. Interrupts
/// always win over in-flight scheduling.
pub struct PlaybackScheduler<S: PlaybackSink, C: Clock = MonotonicClock> {
    sink: S,
    clock: C,
    sample_rate: f64,
    cursor: f64,
    active: HashMap<u64, Scheduled>,
    next_id: u64,
}

impl<S: PlaybackSink> PlaybackScheduler<S> {
    pub fn new(sink: S, sample_rate: f64) -> Self {
        Self::with_clock(sink, sample_rate, MonotonicClock::new())
    }
}

impl<S: PlaybackSink, C: Clock> PlaybackScheduler<S, C> {
    pub fn with_clock(sink: S, sample_rate: f64, clock: C) -> Self {
        Self {
            sink,
            clock,
            sample_rate,
            cursor: 0.0,
            active: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, samples: &[f32]) -> Scheduled {
        let now = self.clock.now();
        // Handles whose playback window has passed have ended.
        self.active.retain(|_, s| s.starts_at + s.duration > now);

        let duration = samples.len() as f64 / self.sample_rate;
        let starts_at = self.cursor.max(now);
        self.cursor = starts_at + duration;

        self.next_id += 1;
        let scheduled = Scheduled {
            id: self.next_id,
            starts_at,
            duration,
        };
        self.active.insert(scheduled.id, scheduled);
        self.sink.play(samples);
        scheduled
    }

    /// Removes a finished handle. Unknown or already-stopped handles are a
    /// no-op.
    pub fn on_ended(&mut self, id: u64) {
        self.active.remove(&id);
    }

    pub fn stop_all(&mut self) {
        let dropped = self.active.len();
        if dropped > 0 {
            tracing::debug!("interrupting {dropped} scheduled buffer(s)");
        }
        self.sink.clear();
        self.active.clear();
        self.cursor = 0.0;
    }

    pub fn active_handles(&self) -> usize {
        self.active.len()
    }

    pub fn next_start(&self) -> f64 {
        self.cursor
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{ManualClock, RecordingSink};
    use super::*;

    const RATE: f64 = 24000.0;

    fn scheduler() -> (PlaybackScheduler<RecordingSink, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let scheduler = PlaybackScheduler::with_clock(RecordingSink::default(), RATE, clock.clone());
        (scheduler, clock)
    }

    #[test]
    fn buffers_play_back_to_back_without_gaps_or_overlap() {
        let (mut scheduler, _clock) = scheduler();
        let chunk = vec![0.0f32; 2400]; // 100ms at 24kHz

        let mut expected_start = 0.0;
        for _ in 0..5 {
            let scheduled = scheduler.schedule(&chunk);
            assert!((scheduled.starts_at - expected_start).abs() < 1e-9);
            expected_start = scheduled.starts_at + scheduled.duration;
        }
        assert_eq!(scheduler.active_handles(), 5);
    }

    #[test]
    fn late_arrival_starts_at_current_time() {
        let (mut scheduler, clock) = scheduler();
        let chunk = vec![0.0f32; 2400];

        let first = scheduler.schedule(&chunk);
        assert_eq!(first.starts_at, 0.0);

        // Playback drained long before the next chunk arrives.
        clock.advance_to(1.0);
        let second = scheduler.schedule(&chunk);
        assert_eq!(second.starts_at, 1.0);
        assert!((scheduler.next_start() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn stop_all_clears_handles_and_resets_cursor() {
        let (mut scheduler, clock) = scheduler();
        let chunk = vec![0.0f32; 4800];
        for _ in 0..3 {
            scheduler.schedule(&chunk);
        }
        assert_eq!(scheduler.active_handles(), 3);

        scheduler.stop_all();
        assert_eq!(scheduler.active_handles(), 0);
        assert_eq!(scheduler.next_start(), 0.0);
        assert_eq!(scheduler.sink_mut().clears, 1);

        // The next buffer starts at/after current time, not behind it.
        clock.advance_to(2.5);
        let scheduled = scheduler.schedule(&chunk);
        assert_eq!(scheduled.starts_at, 2.5);
    }

    #[test]
    fn ending_an_already_stopped_handle_is_harmless() {
        let (mut scheduler, _clock) = scheduler();
        let scheduled = scheduler.schedule(&[0.0f32; 240]);
        scheduler.stop_all();
        scheduler.on_ended(scheduled.id);
        assert_eq!(scheduler.active_handles(), 0);
    }

    #[test]
    fn handles_expire_once_their_window_has_passed() {
        let (mut scheduler, clock) = scheduler();
        scheduler.schedule(&[0.0f32; 2400]); // ends at 0.1
        clock.advance_to(1.0);
        let scheduled = scheduler.schedule(&[0.0f32; 2400]);
        assert_eq!(scheduler.active_handles(), 1);
        assert_eq!(scheduled.starts_at, 1.0);
    }

    #[test]
    fn on_ended_releases_only_that_handle() {
        let (mut scheduler, _clock) = scheduler();
        let first = scheduler.schedule(&[0.0f32; 240]);
        let second = scheduler.schedule(&[0.0f32; 240]);
        scheduler.on_ended(first.id);
        assert_eq!(scheduler.active_handles(), 1);
        scheduler.on_ended(second.id);
        assert_eq!(scheduler.active_handles(), 0);
    }
}
