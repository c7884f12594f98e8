//! Discovery and control of DLNA/UPnP media renderers.
//!
//! Devices are found with an SSDP M-SEARCH, resolved from their description
//! documents, and driven through AVTransport and RenderingControl SOAP actions.

pub mod config;
pub mod error;
pub mod renderer;
pub mod session;
pub mod transport;
pub mod xml;

// Re-export key types for easier access
pub use config::{DlnaConfig, SearchTarget};
pub use error::{DlnaError, Result};
pub use renderer::{Action, Renderer};
pub use session::Session;
pub use transport::device::{DescriptionFetcher, Device, HttpFetcher, Resolver};
pub use transport::discovery::{CancelToken, Discovery, DiscoveryOptions, Outcome};
pub use transport::soap::{ServiceKind, SoapClient, SoapRequest, SoapResponse};
pub use transport::ssdp::{SsdpClient, UdpSocketTrait};
pub use xml::{XmlNode, XmlValue};
