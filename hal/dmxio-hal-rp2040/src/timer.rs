//! TIMER alarms and the microsecond counter
//!
//! The RP2040 TIMER counts microseconds and compares its low 32 bits against
//! four alarms. Alarm 0 drives the embassy time driver, which leaves alarms
//! 1 to 3 for port timers and the statistics tick.

use portable_atomic::{AtomicU32, Ordering};

use dmxio_hal::{MicrosClock, OneShotTimer, PeriodicTimer};
use embassy_rp::pac;

/// Alarms free for this crate
pub const FIRST_ALARM: usize = 1;
pub const ALARM_COUNT: usize = 4;

/// Low word of the free-running microsecond counter
#[derive(Debug, Clone, Copy, Default)]
pub struct Micros;

impl MicrosClock for Micros {
    fn now_micros(&self) -> u32 {
        pac::TIMER.timerawl().read()
    }
}

/// One TIMER alarm
#[derive(Debug)]
pub struct Alarm {
    index: usize,
}

impl Alarm {
    /// `None` for alarm 0 and out-of-range indices
    pub fn new(index: usize) -> Option<Self> {
        (FIRST_ALARM..ALARM_COUNT)
            .contains(&index)
            .then_some(Self { index })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Acknowledge the alarm interrupt; call first thing in `TIMER_IRQ_n`
    pub fn clear(&self) {
        pac::TIMER.intf().modify(|w| w.set_alarm(self.index, false));
        pac::TIMER.intr().write(|w| w.set_alarm(self.index, true));
    }

    /// Fire at absolute counter value `target`
    fn schedule(&self, target: u32) {
        let timer = pac::TIMER;
        timer.inte().modify(|w| w.set_alarm(self.index, true));
        timer.alarm(self.index).write_value(target);

        // Target already behind us: the compare would only match after the
        // counter wraps
        if (timer.timerawl().read().wrapping_sub(target) as i32) >= 0 {
            timer.intf().modify(|w| w.set_alarm(self.index, true));
        }
    }
}

impl OneShotTimer for Alarm {
    fn arm(&self, micros: u32) {
        self.schedule(Micros.now_micros().wrapping_add(micros));
    }

    fn disarm(&self) {
        pac::TIMER
            .armed()
            .write(|w| w.set_armed(1 << self.index as u8));
        self.clear();
    }
}

/// Alarm re-armed from its own interrupt for a fixed-rate tick
#[derive(Debug)]
pub struct StatisticsTimer {
    alarm: Alarm,
    period: AtomicU32,
    next: AtomicU32,
}

impl StatisticsTimer {
    pub fn new(alarm: Alarm) -> Self {
        Self {
            alarm,
            period: AtomicU32::new(0),
            next: AtomicU32::new(0),
        }
    }

    /// Acknowledge and schedule the next tick; call from the alarm's
    /// interrupt before running the statistics tick
    pub fn on_interrupt(&self) {
        self.alarm.clear();

        let period = self.period.load(Ordering::Relaxed);
        if period == 0 {
            return;
        }
        let next = self.next.load(Ordering::Relaxed).wrapping_add(period);
        self.next.store(next, Ordering::Relaxed);
        self.alarm.schedule(next);
    }
}

impl PeriodicTimer for StatisticsTimer {
    fn start_periodic(&mut self, period_us: u32) {
        let next = Micros.now_micros().wrapping_add(period_us);
        self.period.store(period_us, Ordering::Relaxed);
        self.next.store(next, Ordering::Relaxed);
        self.alarm.schedule(next);
    }
}
