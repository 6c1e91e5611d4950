//! Pytes console protocol: commands, reply terminators and timing.
//!
//! The console speaks plain ASCII. A command is one line terminated with
//! CR LF, and the reply is a block of free-form lines that usually, but not
//! always, ends with a `Command completed` line.

use std::fmt;
use std::time::Duration;

/// Ceiling for reading one reply block.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_millis(5000);
/// Silence after which a reply block is considered complete.
pub const DEFAULT_IDLE_GAP: Duration = Duration::from_millis(350);
/// Pause between two polled batteries, the console needs some turnaround time.
pub const DEFAULT_UNIT_DELAY: Duration = Duration::from_millis(50);
/// Sleep between two polls of an empty receive buffer.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Number of batteries polled if nothing else is configured.
pub const DEFAULT_NUM_BATTERIES: usize = 6;
/// Nominal capacity of one battery in Ah.
pub const DEFAULT_CAPACITY_AH: f32 = 100.0;

pub const MAX_NUM_BATTERIES: usize = 16;
pub const MIN_CAPACITY_AH: f32 = 1.0;
pub const MAX_CAPACITY_AH: f32 = 2000.0;

const LINE_ENDING: &[u8] = b"\r\n";
const COMMAND_COMPLETED: &str = "command completed";
const OK: &str = "ok";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `pwr <n>`: power and status overview of battery `n` (1-based).
    Power(usize),
    /// Any other console command, sent verbatim.
    Raw(String),
}

impl Command {
    /// Encodes the command as it goes over the wire, including CR LF.
    pub fn request(&self) -> Vec<u8> {
        let mut tx_buffer = self.to_string().into_bytes();
        tx_buffer.extend_from_slice(LINE_ENDING);
        tx_buffer
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Power(unit) => write!(f, "pwr {unit}"),
            Command::Raw(cmd) => write!(f, "{}", cmd.trim()),
        }
    }
}

/// Returns true if `line` closes a reply block.
pub fn is_terminator(line: &str) -> bool {
    let low = line.to_ascii_lowercase();
    low.contains(COMMAND_COMPLETED) || low == OK
}

/// Keeps printable bytes and tab, drops every other control byte.
pub fn is_printable(byte: u8) -> bool {
    byte >= 32 || byte == b'\t'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_request_is_crlf_terminated() {
        assert_eq!(Command::Power(3).request(), b"pwr 3\r\n".to_vec());
    }

    #[test]
    fn raw_request_is_trimmed() {
        assert_eq!(
            Command::Raw("  bat 1 \n".to_string()).request(),
            b"bat 1\r\n".to_vec()
        );
    }

    #[test]
    fn terminators() {
        assert!(is_terminator("Command completed successfully"));
        assert!(is_terminator("COMMAND COMPLETED"));
        assert!(is_terminator("OK"));
        assert!(is_terminator("ok"));
        assert!(!is_terminator("ok then"));
        assert!(!is_terminator("Voltage : 53000 mV"));
    }

    #[test]
    fn printable_filter() {
        assert!(is_printable(b'A'));
        assert!(is_printable(b' '));
        assert!(is_printable(b'\t'));
        assert!(!is_printable(0x07));
        assert!(!is_printable(0x00));
    }
}
