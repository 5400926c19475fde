use chrono::{DateTime, SubsecRound, Utc};

/// Hands out creation timestamps that never go backwards.
///
/// Timestamps are truncated to microseconds, the precision they are stored
/// with, so a value read back from the database compares equal to the one
/// returned on insert. If the wall clock steps back, the last issued value is
/// reused.
#[derive(Debug, Default)]
pub(crate) struct Clock {
    last: Option<DateTime<Utc>>,
}

impl Clock {
    pub(crate) fn now(&mut self) -> DateTime<Utc> {
        self.stamp(Utc::now())
    }

    fn stamp(&mut self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let wall = wall.trunc_subsecs(6);
        let stamp = match self.last {
            Some(last) if last > wall => last,
            _ => wall,
        };
        self.last = Some(stamp);
        stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stamps_follow_the_wall_clock_forward() {
        let mut clock = Clock::default();
        let t0 = Utc::now().trunc_subsecs(6);
        let t1 = t0 + Duration::milliseconds(5);

        assert_eq!(clock.stamp(t0), t0);
        assert_eq!(clock.stamp(t1), t1);
    }

    #[test]
    fn stamps_never_go_backwards() {
        let mut clock = Clock::default();
        let t0 = Utc::now().trunc_subsecs(6);

        clock.stamp(t0);
        assert_eq!(clock.stamp(t0 - Duration::seconds(30)), t0);
    }

    #[test]
    fn stamps_are_truncated_to_microseconds() {
        let mut clock = Clock::default();
        let stamp = clock.now();
        assert_eq!(stamp.timestamp_subsec_nanos() % 1_000, 0);
    }
}
