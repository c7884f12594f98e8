//! Protocol constants and tunables.

use std::time::Duration;

/// SSDP multicast group and port
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Search target matching every UPnP device
pub const SSDP_ALL: &str = "ssdp:all";

/// AVTransport service type as listed in device descriptions
pub const AV_TRANSPORT_URN: &str = "urn:schemas-upnp-org:service:AVTransport:1";

/// RenderingControl service type as listed in device descriptions
pub const RENDERING_CONTROL_URN: &str = "urn:schemas-upnp-org:service:RenderingControl:1";

pub const USER_AGENT: &str = concat!("dlnap/", env!("CARGO_PKG_VERSION"), " UPnP/1.0");

/// Versioned AVTransport service type
pub fn av_transport_urn(version: u8) -> String {
    format!("urn:schemas-upnp-org:service:AVTransport:{}", version)
}

/// Versioned RenderingControl service type
pub fn rendering_control_urn(version: u8) -> String {
    format!("urn:schemas-upnp-org:service:RenderingControl:{}", version)
}

/// What an M-SEARCH asks for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchTarget {
    /// Only devices offering AVTransport at the configured protocol version
    #[default]
    AvTransport,
    /// Every UPnP device (`ssdp:all`)
    All,
    /// A custom ST value; `{version}` is replaced by the protocol version
    Template(String),
}

impl SearchTarget {
    /// The ST header value for `version`
    pub fn resolve(&self, version: u8) -> String {
        match self {
            SearchTarget::AvTransport => av_transport_urn(version),
            SearchTarget::All => SSDP_ALL.to_string(),
            SearchTarget::Template(template) => template.replace("{version}", &version.to_string()),
        }
    }
}

/// Tunables shared by discovery, resolution and control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlnaConfig {
    /// Overall discovery window
    pub discovery_timeout: Duration,
    /// Granularity at which the discovery loop checks its deadline and cancellation
    pub poll_interval: Duration,
    /// MX header: maximum seconds a device may wait before answering
    pub mx: u8,
    /// SSDP/UPnP service version used in search targets and SOAP namespaces
    pub ssdp_version: u8,
    pub search_target: SearchTarget,
    /// Upper bound on receiving a SOAP reply
    pub soap_timeout: Duration,
    /// Upper bound on fetching a description document
    pub http_timeout: Duration,
}

impl Default for DlnaConfig {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            mx: 3,
            ssdp_version: 1,
            search_target: SearchTarget::AvTransport,
            soap_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(5),
        }
    }
}
