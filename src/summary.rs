//! System wide summary over the last known values of all batteries.

use crate::battery::LastKnownState;
use crate::publish::{Channel, ChannelSet, Publisher, Reading, Target};
use std::fmt;

#[cfg(feature = "protocol_serde")]
use serde::{Deserialize, Serialize};

/// Net current in A above which the stack counts as charging (and below the
/// negative of which as discharging).
pub const STATUS_CURRENT_THRESHOLD: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "protocol_serde", derive(Serialize, Deserialize))]
pub enum SummaryStatus {
    Idle,
    Charge,
    Discharge,
}

impl SummaryStatus {
    pub fn from_current(current: Option<f32>) -> Self {
        match current {
            Some(i) if i > STATUS_CURRENT_THRESHOLD => SummaryStatus::Charge,
            Some(i) if i < -STATUS_CURRENT_THRESHOLD => SummaryStatus::Discharge,
            _ => SummaryStatus::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Idle => "Idle",
            SummaryStatus::Charge => "Charge",
            SummaryStatus::Discharge => "Discharge",
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "protocol_serde", derive(Serialize, Deserialize))]
pub struct SystemSummary {
    /// Mean voltage
    pub voltage: Option<f32>,
    /// Sum of all currents
    pub current: Option<f32>,
    /// Mean temperature in °F
    pub temperature: Option<f32>,
    /// Mean SOC, rounded
    pub soc: Option<f32>,
    pub status: SummaryStatus,
}

#[derive(Default)]
struct Accumulator {
    sum: f32,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, value: Option<f32>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn sum(&self) -> Option<f32> {
        (self.count > 0).then_some(self.sum)
    }

    fn mean(&self) -> Option<f32> {
        (self.count > 0).then(|| self.sum / self.count as f32)
    }
}

impl SystemSummary {
    pub fn compute<'a>(states: impl IntoIterator<Item = &'a LastKnownState>) -> Self {
        let mut voltage = Accumulator::default();
        let mut current = Accumulator::default();
        let mut temperature = Accumulator::default();
        let mut soc = Accumulator::default();

        for state in states {
            voltage.add(state.voltage);
            current.add(state.current);
            temperature.add(state.temperature);
            soc.add(state.soc);
        }

        Self {
            voltage: voltage.mean(),
            current: current.sum(),
            temperature: temperature.mean(),
            soc: soc.mean().map(f32::round),
            status: SummaryStatus::from_current(current.sum()),
        }
    }

    pub fn publish(&self, channels: ChannelSet, publisher: &mut impl Publisher) {
        let numbers = [
            (Channel::Voltage, self.voltage),
            (Channel::Temperature, self.temperature),
            (Channel::Soc, self.soc),
            (Channel::Current, self.current),
        ];
        for (channel, value) in numbers {
            if let Some(v) = value {
                if channels.contains(channel) {
                    publisher.publish(Target::System, channel, Reading::Number(v));
                }
            }
        }
        if channels.contains(Channel::BasicStatus) {
            publisher.publish(
                Target::System,
                Channel::BasicStatus,
                Reading::Text(self.status.as_str()),
            );
        }
    }
}
