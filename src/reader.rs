//! Reassembles reply blocks from the raw byte stream.

use crate::protocol::{self, Command, POLL_INTERVAL};
use crate::transport::{Clock, Transport};
use std::io;
use std::time::Duration;

/// Sends commands and collects their reply blocks.
#[derive(Debug)]
pub struct ResponseReader<T, C> {
    transport: T,
    clock: C,
}

impl<T: Transport, C: Clock> ResponseReader<T, C> {
    pub fn new(transport: T, clock: C) -> Self {
        Self { transport, clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Flushes stale input and writes `command`.
    pub fn send(&mut self, command: &Command) -> io::Result<()> {
        self.transport.flush_input()?;
        log::trace!("send: {command}");
        self.transport.write_all(&command.request())
    }

    /// Reads one reply block as a list of trimmed, non-empty lines.
    ///
    /// Returns as soon as a terminator line is seen, after `idle_gap`
    /// without any byte, or at the latest after `max_duration`.
    pub fn read_block(&mut self, max_duration: Duration, idle_gap: Duration) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut line: Vec<u8> = Vec::new();
        let start = self.clock.now();
        let mut last_byte = start;

        'outer: while self.clock.now() - start < max_duration {
            let mut got = false;

            while self.transport.bytes_available()? > 0 {
                let Some(byte) = self.transport.read_byte()? else {
                    break;
                };
                got = true;
                last_byte = self.clock.now();

                match byte {
                    b'\r' => {}
                    b'\n' => {
                        if let Some(complete) = take_line(&mut line) {
                            log::trace!("recv: {complete:?}");
                            let done = protocol::is_terminator(&complete);
                            lines.push(complete);
                            if done {
                                return Ok(lines);
                            }
                        }
                    }
                    b if protocol::is_printable(b) => line.push(b),
                    _ => {}
                }

                if last_byte - start >= max_duration {
                    break 'outer;
                }
            }

            if !got {
                if self.clock.now() - last_byte >= idle_gap {
                    log::trace!("Reply idle for {idle_gap:?}, closing block");
                    break;
                }
                self.clock.sleep(POLL_INTERVAL);
            }
        }

        if let Some(partial) = take_line(&mut line) {
            log::trace!("recv (partial): {partial:?}");
            lines.push(partial);
        }
        Ok(lines)
    }

    /// Sends `command` and reads its reply block.
    pub fn query(
        &mut self,
        command: &Command,
        max_duration: Duration,
        idle_gap: Duration,
    ) -> io::Result<Vec<String>> {
        self.send(command)?;
        self.read_block(max_duration, idle_gap)
    }
}

fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    let line = String::from_utf8_lossy(buffer).trim().to_string();
    buffer.clear();
    (!line.is_empty()).then_some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DEFAULT_IDLE_GAP, DEFAULT_MAX_DURATION};
    use crate::testing::{FakeClock, ScriptedTransport};

    fn reader(script: &[(u64, &[u8])]) -> ResponseReader<ScriptedTransport, FakeClock> {
        let clock = FakeClock::new();
        let transport = ScriptedTransport::new(clock.clone(), script);
        ResponseReader::new(transport, clock)
    }

    #[test]
    fn stops_at_command_completed() {
        let mut reader = reader(&[(0, b"FOO\r\nCommand completed\r\nBAR\r\n")]);
        let lines = reader
            .read_block(DEFAULT_MAX_DURATION, DEFAULT_IDLE_GAP)
            .unwrap();
        assert_eq!(lines, vec!["FOO", "Command completed"]);
        assert!(reader.clock().now() < DEFAULT_MAX_DURATION);
    }

    #[test]
    fn stops_at_ok() {
        let mut reader = reader(&[(0, b"Voltage: 1 mV\nOK\nleftover\n")]);
        let lines = reader
            .read_block(DEFAULT_MAX_DURATION, DEFAULT_IDLE_GAP)
            .unwrap();
        assert_eq!(lines, vec!["Voltage: 1 mV", "OK"]);
    }

    #[test]
    fn idle_gap_ends_block_with_partial_line() {
        let mut reader = reader(&[(0, b"first\r\n"), (100, b"second\r\nthird")]);
        let lines = reader
            .read_block(DEFAULT_MAX_DURATION, DEFAULT_IDLE_GAP)
            .unwrap();
        assert_eq!(lines, vec!["first", "second", "third"]);
        let elapsed = reader.clock().now();
        assert!(elapsed >= Duration::from_millis(450));
        assert!(elapsed < Duration::from_millis(600));
    }

    #[test]
    fn silent_device_returns_empty_block() {
        let mut reader = reader(&[]);
        let lines = reader
            .read_block(DEFAULT_MAX_DURATION, DEFAULT_IDLE_GAP)
            .unwrap();
        assert!(lines.is_empty());
        assert!(reader.clock().now() >= DEFAULT_IDLE_GAP);
        assert!(reader.clock().now() < DEFAULT_MAX_DURATION);
    }

    #[test]
    fn chatty_device_is_cut_at_max_duration() {
        let script: Vec<(u64, &[u8])> = (0..100).map(|i| (i * 100, &b"noise\r\n"[..])).collect();
        let mut reader = reader(&script);
        let lines = reader
            .read_block(Duration::from_millis(1000), DEFAULT_IDLE_GAP)
            .unwrap();
        assert!(!lines.is_empty());
        assert!(lines.len() <= 11);
        assert!(reader.clock().now() <= Duration::from_millis(1010));
    }

    #[test]
    fn control_bytes_are_dropped() {
        let mut reader = reader(&[(0, b"\x1b[0mBasic\tStatus\x07 : Idle\r\n\r\n\r\nok\r\n")]);
        let lines = reader
            .read_block(DEFAULT_MAX_DURATION, DEFAULT_IDLE_GAP)
            .unwrap();
        assert_eq!(lines, vec!["[0mBasic\tStatus : Idle", "ok"]);
    }

    #[test]
    fn send_flushes_stale_bytes() {
        let mut reader = reader(&[(0, b"stale reply\r\n")]);
        reader.send(&Command::Power(2)).unwrap();
        assert_eq!(reader.transport_mut().written(), b"pwr 2\r\n");
        let lines = reader
            .read_block(DEFAULT_MAX_DURATION, DEFAULT_IDLE_GAP)
            .unwrap();
        assert!(lines.is_empty());
    }
}
