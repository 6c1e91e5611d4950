#![cfg_attr(docsrs, feature(doc_cfg))]
//! # pytesbms_lib
//!
//! This crate polls Pytes (and compatible Pylontech style) battery stacks over
//! their RS232 console. The console answers human readable text, so the
//! library reads reply blocks, extracts telemetry from loosely formatted
//! lines and keeps the last known value of every channel so a missed reply
//! does not blank out a battery.
//!
//! ## Features
//!
//! - `default`: Enables `bin-dependencies`, which is intended for compiling the `pytesbms` command-line tool.
//! - `serialport`: Enables the serial transport using the `serialport` crate.
//! - `protocol_serde`: Enables `serde` support for the channel and summary types.
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "serialport")]
//! # fn main() -> Result<(), pytesbms_lib::Error> {
//! use pytesbms_lib::publish::{Channel, Publisher, Reading, Target};
//! use pytesbms_lib::serialport::SerialTransport;
//! use pytesbms_lib::session::{PollSession, Settings};
//! use pytesbms_lib::transport::SystemClock;
//!
//! struct Print;
//!
//! impl Publisher for Print {
//!     fn publish(&mut self, target: Target, channel: Channel, reading: Reading<'_>) {
//!         println!("{target}/{channel}: {reading}");
//!     }
//! }
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", 115_200)?;
//! let mut session = PollSession::new(transport, SystemClock::new(), Print, Settings::new(2, 100.0)?);
//! let summary = session.run_cycle();
//! println!("{summary:?}");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serialport"))]
//! # fn main() {}
//! ```

/// Contains error types for the library.
mod error;
/// Per battery last known state, fallback and derived values.
pub mod battery;
/// Classifies reply lines and parses unit tagged numbers.
pub mod extract;
/// Defines the console protocol: commands, terminators and timing.
pub mod protocol;
/// Output channels and the publisher trait.
pub mod publish;
/// Reassembles reply blocks from the byte stream.
pub mod reader;
/// Poll cycle over all batteries and its settings.
pub mod session;
/// System wide summary over all batteries.
pub mod summary;
/// Transport and clock abstractions.
pub mod transport;

pub use error::Error;

/// Serial transport for the battery console.
#[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
#[cfg(feature = "serialport")]
pub mod serialport;

#[cfg(test)]
mod testing;
