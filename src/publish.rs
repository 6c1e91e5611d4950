//! Output channels and the publisher seam.

use std::fmt;

#[cfg(feature = "protocol_serde")]
use serde::{Deserialize, Serialize};

/// One telemetry channel, per battery or for the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "protocol_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "protocol_serde", serde(rename_all = "snake_case"))]
pub enum Channel {
    Voltage,
    SocVoltage,
    Current,
    /// Temperature in °F.
    Temperature,
    /// State of charge in percent.
    #[cfg_attr(feature = "protocol_serde", serde(alias = "coulomb"))]
    Soc,
    Barcode,
    Devtype,
    FirmVersion,
    BasicStatus,
    VoltStatus,
}

impl Channel {
    pub const NUMERIC: [Channel; 5] = [
        Channel::Voltage,
        Channel::SocVoltage,
        Channel::Current,
        Channel::Temperature,
        Channel::Soc,
    ];

    pub const TEXT: [Channel; 5] = [
        Channel::Barcode,
        Channel::Devtype,
        Channel::FirmVersion,
        Channel::BasicStatus,
        Channel::VoltStatus,
    ];

    /// Channels published for the system summary.
    pub const SUMMARY: [Channel; 5] = [
        Channel::Voltage,
        Channel::Current,
        Channel::Temperature,
        Channel::Soc,
        Channel::BasicStatus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Voltage => "voltage",
            Channel::SocVoltage => "soc_voltage",
            Channel::Current => "current",
            Channel::Temperature => "temperature",
            Channel::Soc => "soc",
            Channel::Barcode => "barcode",
            Channel::Devtype => "devtype",
            Channel::FirmVersion => "firm_version",
            Channel::BasicStatus => "basic_status",
            Channel::VoltStatus => "volt_status",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of enabled channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSet(u16);

impl ChannelSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Channel::NUMERIC.into_iter().chain(Channel::TEXT).collect()
    }

    pub fn summary() -> Self {
        Channel::SUMMARY.into_iter().collect()
    }

    pub fn insert(&mut self, channel: Channel) {
        self.0 |= channel.bit();
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut set = ChannelSet::empty();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

/// Where a reading belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Battery index, 1-based.
    Battery(usize),
    System,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Battery(n) => write!(f, "battery{n}"),
            Target::System => f.write_str("system"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading<'a> {
    Number(f32),
    Text(&'a str),
}

impl fmt::Display for Reading<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(n) => write!(f, "{n}"),
            Reading::Text(s) => f.write_str(s),
        }
    }
}

/// Sink for resolved readings. Publishing cannot fail from the caller's
/// point of view; implementations log their own errors.
pub trait Publisher {
    fn publish(&mut self, target: Target, channel: Channel, reading: Reading<'_>);

    /// Called once after the summary of a poll cycle has been published.
    fn end_cycle(&mut self) {}
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish(&mut self, target: Target, channel: Channel, reading: Reading<'_>) {
        (**self).publish(target, channel, reading)
    }

    fn end_cycle(&mut self) {
        (**self).end_cycle()
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, target: Target, channel: Channel, reading: Reading<'_>) {
        (**self).publish(target, channel, reading)
    }

    fn end_cycle(&mut self) {
        (**self).end_cycle()
    }
}
