use chrono::{DateTime, Duration, Utc};
use medichaser_auth::Clock;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Decides when the next poll cycle is due.
///
/// Without an interval the scheduler is in one-shot mode: it is always due
/// and never reschedules, and the caller stops after the first cycle.
#[derive(Debug, Clone)]
pub struct NextRun {
    interval_minutes: Option<NonZeroU32>,
    next_run: DateTime<Utc>,
    clock: Arc<dyn Clock>,
}

impl NextRun {
    pub fn new(interval_minutes: Option<NonZeroU32>, clock: Arc<dyn Clock>) -> Self {
        Self {
            interval_minutes,
            next_run: clock.now(),
            clock,
        }
    }

    pub fn interval_minutes(&self) -> Option<NonZeroU32> {
        self.interval_minutes
    }

    pub fn next_run(&self) -> DateTime<Utc> {
        self.next_run
    }

    pub fn is_one_shot(&self) -> bool {
        self.interval_minutes.is_none()
    }

    pub fn is_time_to_run(&self) -> bool {
        match self.interval_minutes {
            None => true,
            Some(_) => self.clock.now() >= self.next_run,
        }
    }

    pub fn set_next_run(&mut self) {
        if let Some(minutes) = self.interval_minutes {
            self.next_run = self.clock.now() + Duration::minutes(i64::from(minutes.get()));
        }
    }

    /// How long to sleep before the next cycle is due (zero if already due)
    pub fn time_until_next_run(&self) -> std::time::Duration {
        if self.is_one_shot() {
            return std::time::Duration::ZERO;
        }
        (self.next_run - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use medichaser_auth::testing::ManualClock;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap())
    }

    fn every(minutes: u32, clock: &ManualClock) -> NextRun {
        NextRun::new(NonZeroU32::new(minutes), Arc::new(clock.clone()))
    }

    #[test]
    fn starts_due_immediately() {
        let clock = clock();
        let next_run = every(30, &clock);

        assert_eq!(next_run.next_run(), clock.now());
        assert!(next_run.is_time_to_run());
    }

    #[test]
    fn one_shot_is_always_due() {
        let clock = clock();
        let mut next_run = NextRun::new(None, Arc::new(clock.clone()));

        assert!(next_run.is_one_shot());
        assert!(next_run.is_time_to_run());
        next_run.set_next_run();
        assert!(next_run.is_time_to_run());
    }

    #[test]
    fn one_shot_never_reschedules() {
        let clock = clock();
        let mut next_run = NextRun::new(None, Arc::new(clock.clone()));
        let original = next_run.next_run();

        clock.advance(Duration::minutes(5));
        next_run.set_next_run();

        assert_eq!(next_run.next_run(), original);
    }

    #[test]
    fn not_due_while_next_run_is_in_the_future() {
        let clock = clock();
        let mut next_run = every(30, &clock);
        next_run.set_next_run();

        clock.advance(Duration::minutes(29));
        assert!(!next_run.is_time_to_run());

        clock.advance(Duration::minutes(1));
        assert!(next_run.is_time_to_run());

        clock.advance(Duration::minutes(30));
        assert!(next_run.is_time_to_run());
    }

    #[test]
    fn set_next_run_adds_interval_to_now() {
        let clock = clock();
        let mut next_run = every(30, &clock);
        let before = next_run.next_run();

        next_run.set_next_run();

        assert_eq!(next_run.next_run(), before + Duration::minutes(30));
        assert!(next_run.next_run() > before);
    }

    #[test]
    fn time_until_next_run_counts_down() {
        let clock = clock();
        let mut next_run = every(10, &clock);
        next_run.set_next_run();

        assert_eq!(
            next_run.time_until_next_run(),
            std::time::Duration::from_secs(600)
        );

        clock.advance(Duration::minutes(15));
        assert_eq!(next_run.time_until_next_run(), std::time::Duration::ZERO);
    }
}
