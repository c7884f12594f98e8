use std::fmt;

use dlna::DlnaError;

/// Errors that can occur during command execution
#[derive(Debug)]
pub enum CommandError {
    /// A control command was issued before any device was found
    NoDevices,
    /// The selected index does not name a discovered device
    InvalidIndex { index: usize, available: usize },
    /// A value on the command line could not be used
    InvalidArgument(String),
    /// Error from the protocol library
    Dlna(DlnaError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::NoDevices => {
                write!(f, "No compatible devices found.")
            }
            CommandError::InvalidIndex { index, available } => {
                write!(f, "No device with index {} ({} discovered)", index, available)
            }
            CommandError::InvalidArgument(msg) => {
                write!(f, "Invalid argument: {}", msg)
            }
            CommandError::Dlna(DlnaError::Unsupported { device, service }) => {
                write!(f, "Device {} is unable to do this: it has no {} service", device, service)
            }
            CommandError::Dlna(err) => {
                write!(f, "{}", err)
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl From<DlnaError> for CommandError {
    fn from(err: DlnaError) -> Self {
        CommandError::Dlna(err)
    }
}

/// Result type for command execution
pub type CommandResult = Result<String, CommandError>;
