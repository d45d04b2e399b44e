//! Edge side of the fuel alert interrupt.
//!
//! The edge handler runs in interrupt context and must not touch the bus. It only keeps track of
//! the line state, holds the wake lock while the battery is low, and queues work for the alert
//! worker, which talks to the chip.

use core::{
    cell::RefCell,
    sync::atomic::{AtomicBool, Ordering},
};

use embassy_sync::{
    blocking_mutex::{raw::RawMutex, Mutex},
    channel::Channel,
};

const EVENT_QUEUE_DEPTH: usize = 4;

/// Keeps the system awake while a low battery alert is being handled.
pub trait WakeLock {
    fn acquire(&mut self);
    fn release(&mut self);
}

pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn acquire(&mut self) {}
    fn release(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlertEvent {
    pub alerted: bool,
}

pub struct AlertLine<M, W>
where
    M: RawMutex,
{
    enabled: bool,
    repeated: bool,
    alerted: AtomicBool,
    wake_lock: Mutex<M, RefCell<W>>,
    events: Channel<M, AlertEvent, EVENT_QUEUE_DEPTH>,
}

impl<M, W> AlertLine<M, W>
where
    M: RawMutex,
    W: WakeLock,
{
    /// A disabled line ignores every edge.
    pub const fn new(wake_lock: W, enabled: bool, repeated: bool) -> Self {
        Self {
            enabled,
            repeated,
            alerted: AtomicBool::new(false),
            wake_lock: Mutex::new(RefCell::new(wake_lock)),
            events: Channel::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    /// Handles an edge on the alert line. Returns whether the worker was notified.
    pub fn on_edge(&self, alerted: bool) -> bool {
        if !self.is_enabled() {
            return false;
        }

        info!("Fuel alert {}", if alerted { "asserted" } else { "released" });

        if alerted == self.is_alerted() && !self.repeated {
            debug!("Fuel alert repeated ({})", alerted);
            return false;
        }

        self.wake_lock.lock(|lock| {
            let mut lock = lock.borrow_mut();
            if alerted {
                lock.acquire();
            } else {
                lock.release();
            }
        });

        let queued = self.events.try_send(AlertEvent { alerted }).is_ok();
        if !queued {
            warn!("Alert queue full, dropping event");
        }

        self.alerted.store(alerted, Ordering::Release);

        queued
    }

    /// Lets the system sleep again. Called once the reported capacity recovered.
    pub(crate) fn release_wake_lock(&self) {
        self.wake_lock.lock(|lock| lock.borrow_mut().release());
    }

    pub(crate) async fn next_event(&self) -> AlertEvent {
        self.events.receive().await
    }

    #[cfg(test)]
    pub(crate) fn try_next_event(&self) -> Option<AlertEvent> {
        self.events.try_receive().ok()
    }

    pub fn with_wake_lock<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        self.wake_lock.lock(|lock| f(&mut lock.borrow_mut()))
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::WakeLock;

    #[derive(Default, Debug)]
    pub struct CountingWakeLock {
        pub held: bool,
        pub acquired: usize,
        pub released: usize,
    }

    impl WakeLock for CountingWakeLock {
        fn acquire(&mut self) {
            self.held = true;
            self.acquired += 1;
        }

        fn release(&mut self) {
            self.held = false;
            self.released += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::{test_utils::CountingWakeLock, *};

    type Line = AlertLine<NoopRawMutex, CountingWakeLock>;

    #[test]
    fn state_changes_are_forwarded() {
        let line = Line::new(CountingWakeLock::default(), true, false);

        assert!(line.on_edge(true));
        assert!(line.is_alerted());
        assert!(line.with_wake_lock(|lock| lock.held));

        assert!(line.on_edge(false));
        assert!(!line.is_alerted());
        assert!(line.with_wake_lock(|lock| !lock.held));

        assert_eq!(line.try_next_event(), Some(AlertEvent { alerted: true }));
        assert_eq!(line.try_next_event(), Some(AlertEvent { alerted: false }));
        assert_eq!(line.try_next_event(), None);
    }

    #[test]
    fn repeated_edges_are_dropped_by_default() {
        let line = Line::new(CountingWakeLock::default(), true, false);

        assert!(line.on_edge(true));
        assert!(!line.on_edge(true));

        assert_eq!(line.with_wake_lock(|lock| lock.acquired), 1);
        assert!(line.try_next_event().is_some());
        assert!(line.try_next_event().is_none());

        // The initial state is "not alerted".
        let line = Line::new(CountingWakeLock::default(), true, false);
        assert!(!line.on_edge(false));
    }

    #[test]
    fn repeated_edges_can_be_forwarded() {
        let line = Line::new(CountingWakeLock::default(), true, true);

        assert!(line.on_edge(true));
        assert!(line.on_edge(true));

        assert_eq!(line.with_wake_lock(|lock| lock.acquired), 2);
    }

    #[test]
    fn disabled_line_ignores_edges() {
        let line = Line::new(CountingWakeLock::default(), false, true);

        assert!(!line.on_edge(true));
        assert!(!line.is_alerted());
        assert_eq!(line.with_wake_lock(|lock| lock.acquired), 0);
        assert!(line.try_next_event().is_none());
    }

    #[test]
    fn full_queue_still_tracks_line_state() {
        let line = Line::new(CountingWakeLock::default(), true, true);

        for _ in 0..EVENT_QUEUE_DEPTH {
            assert!(line.on_edge(true));
        }
        assert!(!line.on_edge(false));

        assert!(!line.is_alerted());
        assert!(line.with_wake_lock(|lock| !lock.held));
    }
}
