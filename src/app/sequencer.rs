// SPDX-License-Identifier: GPL-3.0-only

//! Countdown and flash timing for one shot
//!
//! The sequence is a stream of phases. Each phase is yielded as it begins and
//! the stream then waits out that phase's duration before yielding the next.
//! Nothing advances while the consumer is busy, so capturing on
//! [`ShotPhase::ShotReady`] naturally holds the inter-shot delay back until
//! the still is taken.

use crate::constants::timing;
use futures::Stream;
use std::time::Duration;

/// A timed step of a single shot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotPhase {
    /// Show this countdown value for one tick
    Tick(u8),
    /// Countdown cleared, flash overlay lit
    Flash,
    /// Flash over; take the still now
    ShotReady,
    /// Still taken; pause before the next shot
    InterShotDelay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotTimings {
    pub countdown_from: u8,
    pub tick: Duration,
    pub flash: Duration,
    pub inter_shot_delay: Duration,
}

impl Default for ShotTimings {
    fn default() -> Self {
        Self {
            countdown_from: timing::COUNTDOWN_FROM,
            tick: timing::TICK,
            flash: timing::FLASH,
            inter_shot_delay: timing::INTER_SHOT_DELAY,
        }
    }
}

/// Phases of one shot; ends once the inter-shot delay has elapsed
pub fn shot_sequence(timings: ShotTimings) -> impl Stream<Item = ShotPhase> {
    async_stream::stream! {
        for remaining in (1..=timings.countdown_from).rev() {
            yield ShotPhase::Tick(remaining);
            tokio::time::sleep(timings.tick).await;
        }

        yield ShotPhase::Flash;
        tokio::time::sleep(timings.flash).await;

        yield ShotPhase::ShotReady;

        yield ShotPhase::InterShotDelay;
        tokio::time::sleep(timings.inter_shot_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_phases_arrive_in_order_on_schedule() {
        let start = Instant::now();
        let phases: Vec<_> = shot_sequence(ShotTimings::default())
            .map(|phase| (phase, start.elapsed().as_millis()))
            .collect()
            .await;

        assert_eq!(
            phases,
            vec![
                (ShotPhase::Tick(3), 0),
                (ShotPhase::Tick(2), 1000),
                (ShotPhase::Tick(1), 2000),
                (ShotPhase::Flash, 3000),
                (ShotPhase::ShotReady, 3140),
                (ShotPhase::InterShotDelay, 3140),
            ]
        );
        assert_eq!(start.elapsed(), timing::shot_duration());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_shot_delay_waits_for_consumer() {
        let start = Instant::now();
        let mut phases = std::pin::pin!(shot_sequence(ShotTimings::default()));

        while let Some(phase) = phases.next().await {
            if phase == ShotPhase::ShotReady {
                // A slow capture
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
        }

        assert_eq!(start.elapsed().as_millis(), 3640 + 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timings() {
        let timings = ShotTimings {
            countdown_from: 1,
            tick: Duration::from_millis(10),
            flash: Duration::from_millis(5),
            inter_shot_delay: Duration::ZERO,
        };
        let phases: Vec<_> = shot_sequence(timings).collect().await;
        assert_eq!(
            phases,
            vec![
                ShotPhase::Tick(1),
                ShotPhase::Flash,
                ShotPhase::ShotReady,
                ShotPhase::InterShotDelay
            ]
        );
    }
}
