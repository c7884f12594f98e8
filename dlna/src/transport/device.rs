use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::time::Duration;

use log::{debug, info, warn};

use super::soap::ServiceKind;
use super::ssdp::{self, DEFAULT_HTTP_PORT};
use crate::config::{AV_TRANSPORT_URN, RENDERING_CONTROL_URN};
use crate::error::{DlnaError, Result};
use crate::xml::{self, XmlError, XmlNode};

pub const FRIENDLY_NAME_PATH: &str = "root/device/friendlyName";
pub const UNKNOWN_NAME: &str = "Unknown";

/// A discovered UPnP device.
///
/// Identity is `(name, ip)`. A device whose description could not be resolved keeps
/// whatever was learned before the failure and has no control endpoints.
#[derive(Debug, Clone)]
pub struct Device {
  pub name: String,
  pub ip: IpAddr,
  pub port: u16,
  pub location: Option<String>,
  pub ssdp_version: u8,
  pub av_transport_url: Option<String>,
  pub rendering_control_url: Option<String>,
  pub has_av_transport: bool,
}

impl Device {
  /// A device known only by the address it answered from
  pub fn unresolved(ip: IpAddr, ssdp_version: u8) -> Self {
    Self {
      name: UNKNOWN_NAME.to_string(),
      ip,
      port: DEFAULT_HTTP_PORT,
      location: None,
      ssdp_version,
      av_transport_url: None,
      rendering_control_url: None,
      has_av_transport: false,
    }
  }

  pub fn base_url(&self) -> String {
    match self.ip {
      IpAddr::V4(ip) => format!("http://{}:{}", ip, self.port),
      IpAddr::V6(ip) => format!("http://[{}]:{}", ip, self.port),
    }
  }

  /// Absolute control URL for `service`, joining relative paths onto the device address
  pub fn control_url(&self, service: ServiceKind) -> Result<String> {
    let path = match service {
      ServiceKind::AvTransport => self.av_transport_url.as_deref(),
      ServiceKind::RenderingControl => self.rendering_control_url.as_deref(),
    }
    .ok_or_else(|| DlnaError::Unsupported {
      device: self.to_string(),
      service: service.name().to_string(),
    })?;

    if path.starts_with("http://") || path.starts_with("https://") {
      Ok(path.to_string())
    } else if path.starts_with('/') {
      Ok(format!("{}{}", self.base_url(), path))
    } else {
      Ok(format!("{}/{}", self.base_url(), path))
    }
  }

  /// Host header value for control requests
  pub fn host(&self) -> String {
    self.base_url().trim_start_matches("http://").to_string()
  }

  fn mark_unusable(&mut self) {
    self.av_transport_url = None;
    self.rendering_control_url = None;
    self.has_av_transport = false;
  }
}

impl PartialEq for Device {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name && self.ip == other.ip
  }
}

impl Eq for Device {}

impl Hash for Device {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.name.hash(state);
    self.ip.hash(state);
  }
}

impl fmt::Display for Device {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} @ {}", self.name, self.ip)
  }
}

/// Source of device description documents
pub trait DescriptionFetcher {
  fn fetch(&self, location: &str) -> Result<String>;
}

/// Fetches descriptions with a blocking HTTP GET
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  client: reqwest::blocking::Client,
}

impl HttpFetcher {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .no_proxy()
      .build()
      .map_err(|e| DlnaError::Network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { client })
  }
}

impl DescriptionFetcher for HttpFetcher {
  fn fetch(&self, location: &str) -> Result<String> {
    let response = self
      .client
      .get(location)
      .send()
      .map_err(|e| DlnaError::Network(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(DlnaError::Network(format!(
        "HTTP request failed with status: {}",
        response.status()
      )));
    }

    response
      .text()
      .map_err(|e| DlnaError::Network(format!("Failed to read response body: {}", e)))
  }
}

/// Turns discovery responses into [`Device`]s
#[derive(Debug, Clone)]
pub struct Resolver<F = HttpFetcher> {
  fetcher: F,
}

impl Resolver<HttpFetcher> {
  pub fn http(timeout: Duration) -> Result<Self> {
    Ok(Self::new(HttpFetcher::new(timeout)?))
  }
}

impl<F: DescriptionFetcher> Resolver<F> {
  pub fn new(fetcher: F) -> Self {
    Self { fetcher }
  }

  /// Resolve a raw discovery response from `sender`.
  ///
  /// Never fails: on any error the device is returned without control endpoints.
  pub fn resolve(&self, raw: &[u8], sender: IpAddr, ssdp_version: u8) -> Device {
    info!("=> New device (ip = {}) initialization..", sender);

    let mut device = Device::unresolved(sender, ssdp_version);
    match self.try_resolve(raw, &mut device) {
      Ok(()) => info!("=> Initialization of {} completed", device),
      Err(e) => {
        warn!("Device (ip = {}) could not be resolved: {}", sender, e);
        device.mark_unusable();
      }
    }
    device
  }

  fn try_resolve(&self, raw: &[u8], device: &mut Device) -> Result<()> {
    let response = std::str::from_utf8(raw)
      .map_err(|e| DlnaError::Parse(format!("discovery response is not UTF-8: {}", e)))?;

    let location = ssdp::location(response)
      .ok_or_else(|| DlnaError::NotFound("LOCATION header".to_string()))?
      .to_string();
    info!("location: {}", location);

    device.port = ssdp::port_from_location(&location);
    device.location = Some(location.clone());
    info!("port: {}", device.port);

    let body = self.fetcher.fetch(&location)?;
    let description = xml::parse(&body)?;
    debug!("description xml:\n{}", description);

    apply_description(device, &description);
    Ok(())
  }
}

/// Copy name and control endpoints out of a parsed description
pub fn apply_description(device: &mut Device, description: &XmlNode) {
  device.name = description
    .text_at(FRIENDLY_NAME_PATH)
    .unwrap_or(UNKNOWN_NAME)
    .to_string();
  info!("friendlyName: {}", device.name);

  device.av_transport_url = control_url(description, AV_TRANSPORT_URN);
  info!("control_url: {:?}", device.av_transport_url);

  device.rendering_control_url = control_url(description, RENDERING_CONTROL_URN);
  info!("rendering_control_url: {:?}", device.rendering_control_url);

  device.has_av_transport = device.av_transport_url.is_some();
}

/// Control URL of the service of type `urn`, if the description lists one
pub fn control_url(description: &XmlNode, urn: &str) -> Option<String> {
  let path = format!("root/device/serviceList/service@serviceType={}/controlURL", urn);
  match description.text_at(&path) {
    Ok(url) => Some(url.to_string()),
    Err(XmlError::NotFound(_)) => None,
    Err(e) => {
      warn!("Invalid control URL query {}: {}", path, e);
      None
    }
  }
}
