use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use pytesbms_lib::protocol::Command;
use pytesbms_lib::serialport::SerialTransport;
use pytesbms_lib::session::Settings;
use std::{ops::Deref, panic};

mod commandline;
mod config;
mod daemon;
mod mqtt;
mod output;

use commandline::{CliArgs, CliCommands};
use config::ChannelConfig;
use output::ConsolePublisher;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown>", 0, 0));
        let cause = panic_info
            .payload()
            .downcast_ref::<String>()
            .map(String::deref);
        let cause = cause.unwrap_or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("<cause unknown>")
        });

        error!(
            "Thread '{}' panicked at {}:{}:{}: {}",
            std::thread::current().name().unwrap_or("<unknown>"),
            filename,
            line,
            column,
            cause
        );
    }));
    log_handle
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());

    let mut settings = Settings::new(args.batteries, args.capacity_ah)
        .with_context(|| "Invalid battery configuration")?;
    settings.max_duration = args.timeout;
    settings.idle_gap = args.idle_gap;
    settings.unit_delay = args.delay;

    let channels = match &args.channels {
        Some(path) => ChannelConfig::load(path)?,
        None => ChannelConfig::default(),
    };

    let transport = SerialTransport::new(&args.device, args.baud_rate)
        .with_context(|| format!("Cannot open serial port '{}'", args.device))?;

    match args.command {
        CliCommands::Poll => {
            let mut session =
                daemon::build_session(transport, ConsolePublisher::new(false), settings, &channels);
            let summary = session.run_cycle();
            debug!("Summary: {summary:?}");
        }
        CliCommands::Raw { command } => {
            let mut session =
                daemon::build_session(transport, ConsolePublisher::new(false), settings, &channels);
            let command = Command::Raw(command.join(" "));
            let lines = session
                .query(&command)
                .with_context(|| format!("Cannot send command '{command}'"))?;
            if lines.is_empty() {
                warn!("No reply to '{command}'");
            }
            for line in lines {
                println!("{line}");
            }
        }
        CliCommands::Daemon { output, interval } => {
            daemon::run(transport, settings, &channels, output, interval)?
        }
    }

    Ok(())
}
