use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// source of the current time in milliseconds since the unix epoch
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// clock that only moves when told to
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    now: std::cell::Cell<u64>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(now: u64) -> Rc<Self> {
        Rc::new(Self {
            now: std::cell::Cell::new(now),
        })
    }

    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
