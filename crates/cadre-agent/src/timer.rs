//! One-shot interval timers owned by the reactor.

use std::time::Duration;

use tokio::time::Instant;

use crate::event::Event;

/// Handle for a live timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// A payload to queue once `interval` has elapsed.
#[derive(Debug, Clone)]
pub struct Timer {
    pub interval: Duration,
    pub payload: Event,
}

impl Timer {
    pub fn new(interval: Duration, payload: Event) -> Self {
        Timer { interval, payload }
    }
}

struct Entry {
    id: TimerId,
    deadline: Instant,
    payload: Event,
    running: bool,
}

/// The reactor's collection of pending timers.
///
/// Timers fire once. Stopping a timer is logical: the entry stays until
/// the next [`poll_expired`](TimerSet::poll_expired) sweep reaps it, so
/// stopping is safe from any point, including mid-dispatch.
#[derive(Default)]
pub struct TimerSet {
    entries: Vec<Entry>,
    next_id: u64,
}

impl TimerSet {
    pub fn new() -> Self {
        TimerSet::default()
    }

    /// Start a timer now; it expires at `now + interval`.
    pub fn add(&mut self, timer: Timer) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline: Instant::now() + timer.interval,
            payload: timer.payload,
            running: true,
        });
        id
    }

    /// Mark a timer stopped. Unknown ids are ignored.
    pub fn stop(&mut self, id: TimerId) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.running = false;
        }
    }

    /// Time until the nearest running deadline, or `None` when no timer
    /// is running. Zero when a deadline has already passed.
    pub fn next_timeout(&self) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| e.running)
            .map(|e| e.deadline.saturating_duration_since(now))
            .min()
    }

    /// Collect payloads of every timer expired at `now`, in creation
    /// order, and reap stopped entries.
    pub fn poll_expired(&mut self, now: Instant) -> Vec<Event> {
        let mut fired = Vec::new();
        let mut keep = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if !entry.running {
                continue;
            }
            if now >= entry.deadline {
                fired.push(entry.payload);
            } else {
                keep.push(entry);
            }
        }
        self.entries = keep;
        fired
    }

    /// Number of running timers.
    pub fn running(&self) -> usize {
        self.entries.iter().filter(|e| e.running).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, EventSource, ListenerId};

    fn marker(n: u64) -> Event {
        Event::new(EventSource::Reactor, EventKind::RunListener { listener: ListenerId(n) })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_exactly_at_deadline() {
        let mut timers = TimerSet::new();
        timers.add(Timer::new(Duration::from_secs(5), marker(1)));

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert!(timers.poll_expired(Instant::now()).is_empty());

        tokio::time::advance(Duration::from_millis(1)).await;
        let fired = timers.poll_expired(Instant::now());
        assert_eq!(fired, vec![marker(1)]);
        assert_eq!(timers.running(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn next_timeout_is_the_minimum() {
        let mut timers = TimerSet::new();
        timers.add(Timer::new(Duration::from_secs(9), marker(1)));
        let near = timers.add(Timer::new(Duration::from_secs(2), marker(2)));
        assert_eq!(timers.next_timeout(), Some(Duration::from_secs(2)));

        timers.stop(near);
        assert_eq!(timers.next_timeout(), Some(Duration::from_secs(9)));
    }

    #[tokio::test(start_paused = true)]
    async fn no_running_timers_means_no_timeout() {
        let mut timers = TimerSet::new();
        assert_eq!(timers.next_timeout(), None);
        let id = timers.add(Timer::new(Duration::from_secs(1), marker(1)));
        timers.stop(id);
        assert_eq!(timers.next_timeout(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timer_never_fires_and_is_reaped() {
        let mut timers = TimerSet::new();
        let id = timers.add(Timer::new(Duration::from_secs(1), marker(1)));
        timers.stop(id);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(timers.poll_expired(Instant::now()).is_empty());
        assert!(timers.entries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn several_expired_fire_in_creation_order() {
        let mut timers = TimerSet::new();
        timers.add(Timer::new(Duration::from_secs(2), marker(1)));
        timers.add(Timer::new(Duration::from_secs(1), marker(2)));
        timers.add(Timer::new(Duration::from_secs(3), marker(3)));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(
            timers.poll_expired(Instant::now()),
            vec![marker(1), marker(2), marker(3)]
        );
    }
}
