//! Slot scheduler for rate-limited platform calls.
//!
//! The platform penalises bursts, so calls that fan out over many surfaces
//! (campaign fetches, ballot deletions, seed reactions) take a slot from a
//! shared [`Pacer`] first. Slots are handed out at least `gap` apart, in the
//! order they were reserved. Time comes from tokio's clock, so tests can run
//! with a paused runtime.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

pub struct Pacer {
    gap: Duration,
    /// Earliest instant the next slot may be handed out.
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(gap: Duration) -> Self {
        Self {
            gap,
            next_slot: Mutex::new(None),
        }
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }

    /// Reserve the next free slot and return when it opens.
    ///
    /// An idle pacer hands out `now`; a busy one queues behind the last slot.
    pub fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next = self.next_slot.lock().unwrap_or_else(|e| e.into_inner());
        let slot = match *next {
            Some(at) if at > now => at,
            _ => now,
        };
        *next = Some(slot + self.gap);
        slot
    }

    /// Wait for a slot.
    pub async fn ready(&self) {
        let slot = self.reserve();
        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_pacer_grants_immediately() {
        let pacer = Pacer::new(Duration::from_millis(666));
        let start = Instant::now();
        pacer.ready().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_slots_are_spaced_by_gap() {
        let pacer = Pacer::new(Duration::from_millis(666));
        let start = Instant::now();
        let slots: Vec<Duration> = (0..4).map(|_| pacer.reserve() - start).collect();
        assert_eq!(
            slots,
            vec![
                Duration::ZERO,
                Duration::from_millis(666),
                Duration::from_millis(1332),
                Duration::from_millis(1998),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_recovers_after_idle_period() {
        let pacer = Pacer::new(Duration::from_millis(100));
        pacer.ready().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        let before = Instant::now();
        pacer.ready().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_are_staggered() {
        let pacer = std::sync::Arc::new(Pacer::new(Duration::from_millis(500)));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let pacer = std::sync::Arc::clone(&pacer);
            handles.push(tokio::spawn(async move {
                pacer.ready().await;
                start.elapsed()
            }));
        }
        let mut waited = Vec::new();
        for handle in handles {
            waited.push(handle.await.unwrap());
        }
        waited.sort();
        assert_eq!(
            waited,
            vec![
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_millis(1000)
            ]
        );
    }
}
