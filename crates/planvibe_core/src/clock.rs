use time::{Duration, OffsetDateTime};

pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Returns a stamp strictly later than `previous`, using the clock when it
/// has moved on and the next nanosecond otherwise.
pub fn next_stamp(clock: &dyn Clock, previous: OffsetDateTime) -> OffsetDateTime {
    let now = clock.now();
    if now > previous {
        now
    } else {
        previous + Duration::nanoseconds(1)
    }
}
