//! Serial transport using the `serialport` crate.
//!
//! The Pytes console port runs at 115200 baud 8N1 without flow control
//! (older US2000 units ship with 9600 baud).

use crate::transport::Transport;
use crate::Error;
use std::io::{self, Read, Write};
use std::time::Duration;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

pub struct SerialTransport {
    serial: Box<dyn serialport::SerialPort>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.serial.name())
            .finish()
    }
}

impl SerialTransport {
    pub fn new(port: &str, baud_rate: u32) -> Result<Self, Error> {
        let serial = serialport::new(port, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(io::Error::from)?;
        log::info!("Opened serial port '{port}' at {baud_rate} baud");
        Ok(Self { serial })
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.serial.write_all(bytes)?;
        self.serial.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.serial.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.serial.bytes_to_read()? == 0 {
            return Ok(None);
        }
        let mut buf = [0u8; 1];
        match self.serial.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn flush_input(&mut self) -> io::Result<usize> {
        let pending = self.serial.bytes_to_read()? as usize;
        if pending > 0 {
            log::trace!("Discarding {pending} pending bytes");
            self.serial.clear(serialport::ClearBuffer::Input)?;
        }
        Ok(pending)
    }
}
