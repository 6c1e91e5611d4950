/// Errors raised while setting up a poll session.
///
/// Once a session runs, communication problems are logged and absorbed,
/// so these only surface from construction and configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value lies outside its accepted range.
    #[error("Value out of range: {name} = {value}")]
    RangeError { name: &'static str, value: String },
    /// An I/O error from the transport, serial port errors included.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn range(name: &'static str, value: impl ToString) -> Self {
        Error::RangeError {
            name,
            value: value.to_string(),
        }
    }
}
