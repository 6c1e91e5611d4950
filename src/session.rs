//! Poll cycle over all batteries of the stack.

use crate::battery::BatteryBank;
use crate::extract;
use crate::protocol::{self, Command};
use crate::publish::{ChannelSet, Publisher};
use crate::reader::ResponseReader;
use crate::summary::SystemSummary;
use crate::transport::{Clock, Transport};
use crate::Error;
use std::time::Duration;

/// Startup configuration of a poll session.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    num_batteries: usize,
    capacity_ah: f32,
    /// Ceiling for one reply block.
    pub max_duration: Duration,
    /// Silence that ends a reply block.
    pub idle_gap: Duration,
    /// Pause after each successfully polled battery.
    pub unit_delay: Duration,
}

impl Settings {
    pub fn new(num_batteries: usize, capacity_ah: f32) -> Result<Self, Error> {
        if !(1..=protocol::MAX_NUM_BATTERIES).contains(&num_batteries) {
            return Err(Error::range("num_batteries", num_batteries));
        }
        if !(protocol::MIN_CAPACITY_AH..=protocol::MAX_CAPACITY_AH).contains(&capacity_ah) {
            return Err(Error::range("capacity_ah", capacity_ah));
        }
        Ok(Self {
            num_batteries,
            capacity_ah,
            max_duration: protocol::DEFAULT_MAX_DURATION,
            idle_gap: protocol::DEFAULT_IDLE_GAP,
            unit_delay: protocol::DEFAULT_UNIT_DELAY,
        })
    }

    pub fn num_batteries(&self) -> usize {
        self.num_batteries
    }

    pub fn capacity_ah(&self) -> f32 {
        self.capacity_ah
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            num_batteries: protocol::DEFAULT_NUM_BATTERIES,
            capacity_ah: protocol::DEFAULT_CAPACITY_AH,
            max_duration: protocol::DEFAULT_MAX_DURATION,
            idle_gap: protocol::DEFAULT_IDLE_GAP,
            unit_delay: protocol::DEFAULT_UNIT_DELAY,
        }
    }
}

/// Owns the link to the console and the state of every battery.
#[derive(Debug)]
pub struct PollSession<T, C, P> {
    reader: ResponseReader<T, C>,
    publisher: P,
    bank: BatteryBank,
    summary_channels: ChannelSet,
    settings: Settings,
}

impl<T: Transport, C: Clock, P: Publisher> PollSession<T, C, P> {
    pub fn new(transport: T, clock: C, publisher: P, settings: Settings) -> Self {
        log::info!(
            "Polling {} batteries, capacity {:.1} Ah",
            settings.num_batteries,
            settings.capacity_ah
        );
        Self {
            reader: ResponseReader::new(transport, clock),
            publisher,
            bank: BatteryBank::new(settings.num_batteries, settings.capacity_ah),
            summary_channels: ChannelSet::summary(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn bank(&self) -> &BatteryBank {
        &self.bank
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn set_battery_channels(&mut self, index: usize, channels: ChannelSet) {
        self.bank.set_channels(index, channels);
    }

    pub fn set_summary_channels(&mut self, channels: ChannelSet) {
        self.summary_channels = channels;
    }

    /// Sends an arbitrary console command and returns its reply block.
    pub fn query(&mut self, command: &Command) -> Result<Vec<String>, Error> {
        Ok(self
            .reader
            .query(command, self.settings.max_duration, self.settings.idle_gap)?)
    }

    /// Polls one battery. Returns false if it did not answer.
    pub fn poll_battery(&mut self, index: usize) -> bool {
        let lines = match self.query(&Command::Power(index)) {
            Ok(lines) => lines,
            Err(err) => {
                log::warn!("Communication with battery {index} failed: {err}");
                return false;
            }
        };
        if lines.is_empty() {
            log::warn!("No data for battery {index}");
            return false;
        }

        let fields = extract::extract(&lines);
        self.bank
            .derive_and_publish(index, fields, &mut self.publisher);
        true
    }

    /// Polls every battery in order, then publishes the system summary.
    pub fn run_cycle(&mut self) -> SystemSummary {
        for index in 1..=self.bank.len() {
            if self.poll_battery(index) {
                self.reader.clock().sleep(self.settings.unit_delay);
            }
        }
        self.publish_summary()
    }

    /// Computes and publishes the summary over the last known values.
    pub fn publish_summary(&mut self) -> SystemSummary {
        let summary = SystemSummary::compute(self.bank.iter().map(|b| &b.last));
        log::debug!("summary: {summary:?}");
        summary.publish(self.summary_channels, &mut self.publisher);
        self.publisher.end_cycle();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::{Channel, Target};
    use crate::summary::SummaryStatus;
    use crate::testing::{FakeClock, RecordingPublisher, ScriptedTransport};

    const BATTERY_1: &[u8] = b"pwr 1\r\n@\r\nVoltage : 52000 mV\r\nCurrent : 1500 mA\r\n\
Temperature : 20000 mC\r\nCoulomb : 80% 80000 mAh\r\nBasic Status : Charge\r\n\
Barcode : B1\r\nCommand completed successfully\r\n$$\r\n";
    const BATTERY_2: &[u8] = b"Voltage : 54000 mV\r\nCurrent : 500 mA\r\nBasic Status : Dischg\r\n\
Coulomb : 30000 mAh\r\n";

    fn session(
        replies: &[&[u8]],
    ) -> PollSession<ScriptedTransport, FakeClock, RecordingPublisher> {
        let clock = FakeClock::new();
        let mut transport = ScriptedTransport::new(clock.clone(), &[]);
        for reply in replies {
            transport.reply(reply);
        }
        let settings = Settings::new(3, 100.0).unwrap();
        PollSession::new(transport, clock, RecordingPublisher::default(), settings)
    }

    #[test]
    fn settings_ranges() {
        assert!(Settings::new(0, 100.0).is_err());
        assert!(Settings::new(17, 100.0).is_err());
        assert!(Settings::new(16, 2000.0).is_ok());
        assert!(Settings::new(1, 0.5).is_err());
        assert!(matches!(
            Settings::new(6, 5000.0),
            Err(Error::RangeError {
                name: "capacity_ah",
                ..
            })
        ));
        let default = Settings::default();
        assert_eq!(default.num_batteries(), 6);
        assert_eq!(default.capacity_ah(), 100.0);
    }

    #[test]
    fn full_cycle() {
        let mut session = session(&[BATTERY_1, BATTERY_2, b""]);
        let summary = session.run_cycle();

        let transport = session.reader.transport_mut();
        assert_eq!(transport.written(), b"pwr 1\r\npwr 2\r\npwr 3\r\n");

        let b1 = session.bank().last_known(1).unwrap();
        assert_eq!(b1.voltage, Some(52.0));
        assert_eq!(b1.current, Some(1.5));
        assert_eq!(b1.temperature, Some(68.0));
        assert_eq!(b1.soc, Some(80.0));
        assert_eq!(b1.barcode, "B1");

        let b2 = session.bank().last_known(2).unwrap();
        assert_eq!(b2.current, Some(-0.5));
        assert_eq!(b2.soc, Some(30.0));

        assert_eq!(session.bank().last_known(3), Some(&Default::default()));

        assert_eq!(summary.voltage, Some(53.0));
        assert_eq!(summary.current, Some(1.0));
        assert_eq!(summary.soc, Some(55.0));
        assert_eq!(summary.temperature, Some(68.0));
        assert_eq!(summary.status, SummaryStatus::Charge);

        let publisher = session.publisher();
        assert_eq!(publisher.cycles.get(), 1);
        assert_eq!(
            publisher.last_number(Target::System, Channel::Voltage),
            Some(53.0)
        );
        assert_eq!(
            publisher.last_text(Target::System, Channel::BasicStatus),
            Some("Charge".to_string())
        );
        assert!(publisher.get(Target::Battery(3), Channel::Voltage).is_empty());
    }

    #[test]
    fn silent_battery_keeps_its_state() {
        let mut session = session(&[BATTERY_1, b"", b"", b"", b"", b""]);
        session.run_cycle();
        let before = session.bank().last_known(1).cloned();

        session.run_cycle();
        assert_eq!(session.bank().last_known(1).cloned(), before);
        assert_eq!(session.publisher().cycles.get(), 2);
        assert_eq!(
            session
                .publisher()
                .get(Target::Battery(1), Channel::Voltage)
                .len(),
            1
        );
        // the summary still reports the stale value
        assert_eq!(
            session
                .publisher()
                .get(Target::System, Channel::Voltage)
                .len(),
            2
        );
    }

    #[test]
    fn summary_channels_can_be_disabled() {
        let mut session = session(&[BATTERY_1]);
        session.set_summary_channels(ChannelSet::empty());
        session.set_battery_channels(1, [Channel::Voltage].into_iter().collect());
        session.run_cycle();
        let published = session.publisher().published.borrow();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, Target::Battery(1));
    }

    #[test]
    fn raw_query() {
        let mut session = session(&[b"info 1\r\nDevice address : 1\r\nCommand completed\r\n"]);
        let lines = session.query(&Command::Raw("info 1".into())).unwrap();
        assert_eq!(
            lines,
            vec!["info 1", "Device address : 1", "Command completed"]
        );
    }
}
