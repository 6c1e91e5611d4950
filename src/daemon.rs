use anyhow::{Context, Result};
use log::info;
use pytesbms_lib::publish::Publisher;
use pytesbms_lib::serialport::SerialTransport;
use pytesbms_lib::session::{PollSession, Settings};
use pytesbms_lib::transport::{Clock, SystemClock};

use crate::config::ChannelConfig;
use crate::output::{ConsolePublisher, MqttJsonPublisher, MqttSimplePublisher};
use crate::{commandline, mqtt};

pub fn create_publisher(output: &commandline::DaemonOutput) -> Result<Box<dyn Publisher>> {
    let publisher: Box<dyn Publisher> = match output {
        commandline::DaemonOutput::Console => Box::new(ConsolePublisher::new(true)),
        commandline::DaemonOutput::Mqtt {
            config_file,
            format,
        } => {
            let config = mqtt::MqttConfig::load(config_file)
                .with_context(|| format!("Failed to open MQTT config file at '{config_file}'"))?;
            info!("Successfully loaded MQTT config from {config_file}: {config:?}");
            let publisher = mqtt::MqttPublisher::new(config)
                .with_context(|| "Failed to create MQTT publisher")?;
            info!("MQTT Publisher created successfully.");
            match format {
                commandline::MqttFormat::Simple => Box::new(MqttSimplePublisher::new(publisher)),
                commandline::MqttFormat::Json => Box::new(MqttJsonPublisher::new(publisher)),
            }
        }
    };
    Ok(publisher)
}

pub fn build_session<P: Publisher>(
    transport: SerialTransport,
    publisher: P,
    settings: Settings,
    channels: &ChannelConfig,
) -> PollSession<SerialTransport, SystemClock, P> {
    let num_batteries = settings.num_batteries();
    let mut session = PollSession::new(transport, SystemClock::new(), publisher, settings);
    for index in 1..=num_batteries {
        session.set_battery_channels(index, channels.battery(index));
    }
    session.set_summary_channels(channels.summary());
    session
}

pub fn run(
    transport: SerialTransport,
    settings: Settings,
    channels: &ChannelConfig,
    output: commandline::DaemonOutput,
    interval: std::time::Duration,
) -> Result<()> {
    info!("Starting daemon mode: output={output:?}, interval={interval:?}");
    let publisher = create_publisher(&output)?;
    let mut session = build_session(transport, publisher, settings, channels);
    let clock = SystemClock::new();

    loop {
        let started = clock.now();
        let summary = session.run_cycle();
        info!(
            "Cycle done in {:?}: status={}, voltage={:?}, current={:?}",
            clock.now() - started,
            summary.status,
            summary.voltage,
            summary.current
        );
        // Keep the cycle start times aligned to the interval
        let elapsed = clock.now() - started;
        clock.sleep(interval.saturating_sub(elapsed));
    }
}
