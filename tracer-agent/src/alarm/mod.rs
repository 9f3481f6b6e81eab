//! Recurring alarms driven by tokio tasks.
//!
//! `RecurringAlarm` fires on a fixed interval; `IrregularRecurringAlarm` asks
//! its schedule for the next delay on every firing. Both stop on `stop()` or
//! drop. A firing already in progress when the alarm is stopped runs to
//! completion, so owners must tolerate one callback after a stop.

mod irregular;
mod recurring;

pub use irregular::{IrregularRecurringAlarm, IrregularSchedule};
pub use recurring::{AlarmHandler, RecurringAlarm};

use serde::{Deserialize, Serialize};

/// Whether an alarm may wake a suspended host to fire.
///
/// The tokio timer runs on the monotonic clock, which does not advance while
/// the host is suspended; a `Wake` alarm is recorded and reported but fires on
/// resume like a `NoWake` one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakePolicy {
    Wake,
    #[default]
    NoWake,
}

impl WakePolicy {
    pub fn from_flag(wake: bool) -> Self {
        if wake { WakePolicy::Wake } else { WakePolicy::NoWake }
    }

    pub fn wakes(&self) -> bool {
        matches!(self, WakePolicy::Wake)
    }
}
