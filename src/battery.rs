//! Per battery state: fallback to the last known values and derived
//! quantities (°F, SOC from charge, current sign).

use crate::extract::ExtractedFields;
use crate::publish::{Channel, ChannelSet, Publisher, Reading, Target};

/// Most recently resolved values of one battery. `None` and empty strings
/// mean unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastKnownState {
    pub voltage: Option<f32>,
    pub soc_voltage: Option<f32>,
    pub current: Option<f32>,
    /// °F
    pub temperature: Option<f32>,
    pub soc: Option<f32>,
    pub barcode: String,
    pub devtype: String,
    pub firm_version: String,
    pub basic_status: String,
    pub volt_status: String,
}

impl LastKnownState {
    pub fn number(&self, channel: Channel) -> Option<f32> {
        match channel {
            Channel::Voltage => self.voltage,
            Channel::SocVoltage => self.soc_voltage,
            Channel::Current => self.current,
            Channel::Temperature => self.temperature,
            Channel::Soc => self.soc,
            _ => None,
        }
    }

    pub fn text(&self, channel: Channel) -> &str {
        match channel {
            Channel::Barcode => &self.barcode,
            Channel::Devtype => &self.devtype,
            Channel::FirmVersion => &self.firm_version,
            Channel::BasicStatus => &self.basic_status,
            Channel::VoltStatus => &self.volt_status,
            _ => "",
        }
    }

    fn publish(&self, index: usize, channels: ChannelSet, publisher: &mut impl Publisher) {
        let target = Target::Battery(index);
        for channel in Channel::NUMERIC {
            if let Some(value) = self.number(channel).filter(|v| !v.is_nan()) {
                if channels.contains(channel) {
                    publisher.publish(target, channel, Reading::Number(value));
                }
            }
        }
        for channel in Channel::TEXT {
            let value = self.text(channel);
            if !value.is_empty() && channels.contains(channel) {
                publisher.publish(target, channel, Reading::Text(value));
            }
        }
    }
}

pub fn celsius_to_fahrenheit(c: f32) -> f32 {
    c * 9.0 / 5.0 + 32.0
}

/// SOC in whole percent from remaining charge and nominal capacity.
pub fn soc_from_charge(charge_ah: f32, capacity_ah: f32) -> Option<f32> {
    if capacity_ah > 0.0 {
        Some((charge_ah / capacity_ah * 100.0).clamp(0.0, 100.0).round())
    } else {
        None
    }
}

/// Forces the sign of `current` from the battery's basic status text.
///
/// Discharge statuses are matched before charge statuses on purpose:
/// "discharge" contains "charge", so the other order would turn a
/// `Discharge` status into a positive current.
pub fn signed_current(current: f32, basic_status: &str) -> f32 {
    let status = basic_status.to_ascii_lowercase();
    if status.starts_with("dis") || status.starts_with("dsg") || status.contains("discharge") {
        -current.abs()
    } else if status.starts_with("chg") || status.contains("charge") {
        current.abs()
    } else if status.starts_with("idle") {
        0.0
    } else {
        current
    }
}

fn text_or_last(fresh: String, last: &str) -> String {
    if fresh.is_empty() {
        last.to_string()
    } else {
        fresh
    }
}

/// One polled battery.
#[derive(Debug, Clone, Default)]
pub struct Battery {
    pub channels: ChannelSet,
    pub last: LastKnownState,
}

impl Battery {
    /// Combines freshly extracted fields with the last known state.
    pub fn resolve(&self, fields: ExtractedFields, capacity_ah: f32) -> LastKnownState {
        let last = &self.last;

        let temperature = fields
            .temperature_c
            .map(celsius_to_fahrenheit)
            .or(last.temperature);

        let soc = fields
            .soc_percent
            .or_else(|| {
                fields
                    .charge_ah
                    .and_then(|ah| soc_from_charge(ah, capacity_ah))
            })
            .or(last.soc);

        let basic_status = text_or_last(fields.basic_status, &last.basic_status);
        let current = fields.current.or(last.current).map(|i| {
            if basic_status.is_empty() {
                i
            } else {
                signed_current(i, &basic_status)
            }
        });

        LastKnownState {
            voltage: fields.voltage.or(last.voltage),
            soc_voltage: fields.soc_voltage.or(last.soc_voltage),
            current,
            temperature,
            soc,
            barcode: text_or_last(fields.barcode, &last.barcode),
            devtype: text_or_last(fields.devtype, &last.devtype),
            firm_version: text_or_last(fields.firm_version, &last.firm_version),
            basic_status,
            volt_status: text_or_last(fields.volt_status, &last.volt_status),
        }
    }
}

/// All batteries of the stack, addressed by their 1-based index.
#[derive(Debug, Clone)]
pub struct BatteryBank {
    batteries: Vec<Battery>,
    capacity_ah: f32,
}

impl BatteryBank {
    /// Creates `count` batteries with every channel enabled.
    pub fn new(count: usize, capacity_ah: f32) -> Self {
        let battery = Battery {
            channels: ChannelSet::all(),
            last: LastKnownState::default(),
        };
        Self {
            batteries: vec![battery; count],
            capacity_ah,
        }
    }

    pub fn len(&self) -> usize {
        self.batteries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batteries.is_empty()
    }

    pub fn capacity_ah(&self) -> f32 {
        self.capacity_ah
    }

    pub fn get(&self, index: usize) -> Option<&Battery> {
        index.checked_sub(1).and_then(|i| self.batteries.get(i))
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Battery> {
        index.checked_sub(1).and_then(|i| self.batteries.get_mut(i))
    }

    pub fn last_known(&self, index: usize) -> Option<&LastKnownState> {
        self.get(index).map(|b| &b.last)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Battery> {
        self.batteries.iter()
    }

    /// Selects the published channels of one battery; ignored for an
    /// unknown index.
    pub fn set_channels(&mut self, index: usize, channels: ChannelSet) {
        match self.get_mut(index) {
            Some(battery) => battery.channels = channels,
            None => log::debug!("set_channels: no battery {index}"),
        }
    }

    /// Resolves `fields` against battery `index`, publishes the result and
    /// stores it as the new last known state. Ignored for an unknown index.
    pub fn derive_and_publish(
        &mut self,
        index: usize,
        fields: ExtractedFields,
        publisher: &mut impl Publisher,
    ) {
        let capacity_ah = self.capacity_ah;
        let Some(battery) = self.get_mut(index) else {
            log::debug!("derive_and_publish: no battery {index}");
            return;
        };

        let resolved = battery.resolve(fields, capacity_ah);
        log::debug!("battery {index}: {resolved:?}");
        resolved.publish(index, battery.channels, publisher);
        battery.last = resolved;
    }
}
