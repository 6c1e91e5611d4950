use crate::mqtt;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use pytesbms_lib::protocol;
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Poll every battery once and show per battery values and the system summary
    Poll,
    /// Send a raw console command (e.g. "bat 1", "info 1") and print the reply
    Raw {
        /// The console command, words are joined with a space
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// Run in daemon mode, periodically polling all batteries and outputting the values
    Daemon {
        /// Output destination for the values
        #[command(subcommand)]
        output: DaemonOutput,
        /// Interval between poll cycles (e.g., "30s", "1m")
        #[clap(long, short, value_parser = humantime::parse_duration, default_value = "30s")]
        interval: Duration,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, PartialEq)]
pub enum MqttFormat {
    Simple,
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DaemonOutput {
    /// Continuously poll and print the values to the standard output (console).
    Console,
    /// Continuously poll and publish the values to an MQTT broker.
    Mqtt {
        /// The configuration file for the MQTT broker
        #[arg(long, default_value_t = mqtt::MqttConfig::DEFAULT_CONFIG_FILE.to_string())]
        config_file: String,
        /// Output format for MQTT messages
        #[arg(long, value_enum, default_value_t = MqttFormat::Simple)]
        format: MqttFormat,
    },
}

const fn about_text() -> &'static str {
    "pytes battery console command line tool"
}

#[derive(Parser, Debug)]
#[command(version, about=about_text(), long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Serial port device path (e.g., /dev/ttyUSB0 on Linux, COM1 on Windows)
    #[arg(short, long, default_value_t = default_device_name())]
    pub device: String,

    /// Baud rate of the console port
    #[arg(long, default_value_t = pytesbms_lib::serialport::DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    #[command(subcommand)]
    pub command: CliCommands,

    /// Number of batteries in the stack (1-16)
    #[arg(short, long, default_value_t = protocol::DEFAULT_NUM_BATTERIES)]
    pub batteries: usize,

    /// Nominal capacity of one battery in Ah, used to derive the SOC from the coulomb counter
    #[arg(long, default_value_t = protocol::DEFAULT_CAPACITY_AH)]
    pub capacity_ah: f32,

    /// YAML file selecting the published channels per battery and for the summary
    #[arg(long)]
    pub channels: Option<String>,

    /// Maximum time to wait for one reply (e.g., "5s", "2s 500ms")
    #[arg(value_parser = humantime::parse_duration, long, default_value = "5s")]
    pub timeout: Duration,

    /// Silence after which a reply is considered complete (e.g., "350ms")
    #[arg(value_parser = humantime::parse_duration, long, default_value = "350ms")]
    pub idle_gap: Duration,

    /// Delay between polling two batteries (e.g., "50ms", "100ms")
    #[arg(value_parser = humantime::parse_duration, long, default_value = "50ms")]
    pub delay: Duration,
}
