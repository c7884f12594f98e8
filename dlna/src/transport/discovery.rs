use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use super::device::{DescriptionFetcher, Device, HttpFetcher, Resolver};
use super::ssdp::{DiscoveryRecord, SearchRequest, SsdpClient, UdpSocketTrait};
use crate::config::{DlnaConfig, SearchTarget};
use crate::error::{DlnaError, Result};

/// Cooperative cancellation flag shared between a discovery loop and, say, a Ctrl-C handler
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  /// Re-arm the token for the next search
  pub fn reset(&self) {
    self.0.store(false, Ordering::SeqCst);
  }
}

/// Parameters of one discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
  /// Case-insensitive substring the friendly name must contain
  pub name_filter: Option<String>,
  /// Only accept answers from this address, and stop at its first capable device
  pub ip_filter: Option<IpAddr>,
  pub timeout: Duration,
  pub search_target: SearchTarget,
  pub mx: u8,
  pub ssdp_version: u8,
  pub poll_interval: Duration,
}

impl DiscoveryOptions {
  pub fn from_config(config: &DlnaConfig) -> Self {
    Self {
      name_filter: None,
      ip_filter: None,
      timeout: config.discovery_timeout,
      search_target: config.search_target.clone(),
      mx: config.mx,
      ssdp_version: config.ssdp_version,
      poll_interval: config.poll_interval,
    }
  }

  pub fn with_name_filter(mut self, name: impl Into<String>) -> Self {
    let name = name.into();
    self.name_filter = if name.is_empty() { None } else { Some(name) };
    self
  }

  pub fn with_ip_filter(mut self, ip: IpAddr) -> Self {
    self.ip_filter = Some(ip);
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_search_target(mut self, search_target: SearchTarget) -> Self {
    self.search_target = search_target;
    self
  }

  pub fn with_ssdp_version(mut self, version: u8) -> Self {
    self.ssdp_version = version;
    self
  }

  pub fn with_mx(mut self, mx: u8) -> Self {
    self.mx = mx;
    self
  }

  pub fn search_request(&self) -> SearchRequest {
    SearchRequest::new(self.search_target.resolve(self.ssdp_version), self.mx)
  }

  fn accepts_sender(&self, sender: IpAddr) -> bool {
    self.ip_filter.map_or(true, |ip| ip == sender)
  }

  fn accepts_name(&self, name: &str) -> bool {
    self
      .name_filter
      .as_ref()
      .map_or(true, |filter| name.to_lowercase().contains(&filter.to_lowercase()))
  }
}

impl Default for DiscoveryOptions {
  fn default() -> Self {
    Self::from_config(&DlnaConfig::default())
  }
}

/// What happened to one received datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// Stored at this index of the device list
  Added(usize),
  /// Added, and the ip-targeted search needs nothing more
  Satisfied(usize),
  Duplicate,
  Filtered,
}

/// SSDP search for media renderers
pub struct Discovery<F = HttpFetcher> {
  options: DiscoveryOptions,
  resolver: Resolver<F>,
}

impl Discovery<HttpFetcher> {
  /// Discovery resolving descriptions over HTTP with `http_timeout`
  pub fn new(options: DiscoveryOptions, http_timeout: Duration) -> Result<Self> {
    Ok(Self::with_resolver(options, Resolver::http(http_timeout)?))
  }
}

impl<F: DescriptionFetcher> Discovery<F> {
  pub fn with_resolver(options: DiscoveryOptions, resolver: Resolver<F>) -> Self {
    Self { options, resolver }
  }

  pub fn options(&self) -> &DiscoveryOptions {
    &self.options
  }

  /// Run a search and return the devices found
  pub fn discover(&self, cancel: &CancelToken) -> Result<Vec<Device>> {
    let mut devices = Vec::new();
    self.discover_into(&mut devices, cancel, |_, _| {})?;
    Ok(devices)
  }

  /// Run a search, appending new devices to `devices` and reporting each through `on_found`.
  ///
  /// Ends at the deadline, on cancellation, or once an ip-targeted search finds a
  /// capable device. Returns how many devices were added. Failing to open the socket
  /// is `DlnaError::Io`; send and receive failures abort the search as
  /// `DlnaError::Network`.
  ///
  /// Cancellation is checked between polls, so it takes effect within one poll
  /// interval plus the description fetch of a datagram already being resolved
  /// (bounded by the HTTP timeout).
  pub fn discover_into<C>(&self, devices: &mut Vec<Device>, cancel: &CancelToken, on_found: C) -> Result<usize>
  where
    C: FnMut(usize, &Device),
  {
    let mut client = SsdpClient::new(self.options.poll_interval)?;
    self.discover_with(&mut client, devices, cancel, on_found)
  }

  /// Same as [`Discovery::discover_into`] over an already opened client
  pub fn discover_with<S, C>(
    &self,
    client: &mut SsdpClient<S>,
    devices: &mut Vec<Device>,
    cancel: &CancelToken,
    mut on_found: C,
  ) -> Result<usize>
  where
    S: UdpSocketTrait,
    C: FnMut(usize, &Device),
  {
    client
      .search(&self.options.search_request())
      .map_err(|e| DlnaError::Network(format!("SSDP search failed: {}", e)))?;

    let start = Instant::now();
    let mut added = 0;

    loop {
      if cancel.is_cancelled() {
        info!("Discovery cancelled after {:?}", start.elapsed());
        break;
      }
      if start.elapsed() > self.options.timeout {
        debug!("Discovery window of {:?} elapsed", self.options.timeout);
        break;
      }

      let record = client
        .poll()
        .map_err(|e| DlnaError::Network(format!("Getting response failed: {}", e)))?;
      let Some(record) = record else {
        continue;
      };

      match self.process(&record, devices) {
        Outcome::Added(index) => {
          added += 1;
          on_found(index, &devices[index]);
        }
        Outcome::Satisfied(index) => {
          added += 1;
          on_found(index, &devices[index]);
          info!("Found {} by ip, stopping search", devices[index]);
          break;
        }
        Outcome::Duplicate | Outcome::Filtered => {}
      }
    }

    Ok(added)
  }

  /// Resolve one datagram and merge it into `devices`
  pub fn process(&self, record: &DiscoveryRecord, devices: &mut Vec<Device>) -> Outcome {
    let sender = record.sender.ip();
    if !self.options.accepts_sender(sender) {
      debug!("Ignoring response from {}", sender);
      return Outcome::Filtered;
    }

    let device = self
      .resolver
      .resolve(&record.raw, sender, self.options.ssdp_version);

    if devices.contains(&device) {
      return Outcome::Duplicate;
    }
    if !self.options.accepts_name(&device.name) {
      debug!("{} does not match the name filter", device);
      return Outcome::Filtered;
    }

    let satisfied = self.options.ip_filter.is_some() && device.has_av_transport;
    devices.push(device);
    let index = devices.len() - 1;

    if satisfied {
      Outcome::Satisfied(index)
    } else {
      Outcome::Added(index)
    }
  }
}
