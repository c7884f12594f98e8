use crate::xml::XmlError;

/// Errors produced by the DLNA protocol core
#[derive(Debug, thiserror::Error)]
pub enum DlnaError {
  #[error("network error: {0}")]
  Network(String),

  #[error("parse error: {0}")]
  Parse(String),

  #[error("device reported a fault: {0}")]
  ProtocolFault(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("device {device} has no {service} control endpoint")]
  Unsupported { device: String, service: String },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl From<XmlError> for DlnaError {
  fn from(error: XmlError) -> Self {
    match error {
      XmlError::NotFound(path) => DlnaError::NotFound(path),
      other => DlnaError::Parse(other.to_string()),
    }
  }
}

impl From<reqwest::Error> for DlnaError {
  fn from(error: reqwest::Error) -> Self {
    DlnaError::Network(error.to_string())
  }
}

pub type Result<T> = std::result::Result<T, DlnaError>;
