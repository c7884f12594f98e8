use std::io::{Error, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::{SSDP_MULTICAST_ADDR, USER_AGENT};

lazy_static! {
  static ref PORT_PATTERN: Regex = Regex::new(r"(?i)https?://[^/]*?:(\d+)").unwrap();
}

/// Port used when a location URL does not name one
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// A datagram received in answer to an M-SEARCH
#[derive(Debug, Clone)]
pub struct DiscoveryRecord {
  pub raw: Vec<u8>,
  pub sender: SocketAddr,
  pub received_at: Instant,
}

/// An M-SEARCH request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
  pub search_target: String,
  pub mx: u8,
}

impl SearchRequest {
  pub fn new(search_target: impl Into<String>, mx: u8) -> Self {
    Self {
      search_target: search_target.into(),
      mx,
    }
  }

  /// Render the request as sent on the wire
  pub fn to_payload(&self) -> String {
    format!(
      "M-SEARCH * HTTP/1.1\r\n\
        HOST: {}\r\n\
        MAN: \"ssdp:discover\"\r\n\
        ST: {}\r\n\
        MX: {}\r\n\
        USER-AGENT: {}\r\n\
        \r\n",
      SSDP_MULTICAST_ADDR, self.search_target, self.mx, USER_AGENT
    )
  }
}

/// The socket operations a search needs
pub trait UdpSocketTrait {
  fn send_to(&mut self, buf: &[u8], addr: &str) -> Result<usize, Error>;
  fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), Error>;
}

impl UdpSocketTrait for UdpSocket {
  fn send_to(&mut self, buf: &[u8], addr: &str) -> Result<usize, Error> {
    UdpSocket::send_to(self, buf, addr)
  }

  fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), Error> {
    UdpSocket::recv_from(self, buf)
  }
}

/// SSDP client owning one socket for the duration of a search.
///
/// The socket closes when the client is dropped.
pub struct SsdpClient<S = UdpSocket> {
  socket: S,
  buffer: [u8; 2048],
}

impl SsdpClient<UdpSocket> {
  /// Bind an ephemeral socket whose reads give up after `poll_interval`
  pub fn new(poll_interval: Duration) -> Result<Self, Error> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_read_timeout(Some(poll_interval.max(Duration::from_millis(1))))?;
    socket.set_multicast_loop_v4(true)?;

    Ok(Self::with_socket(socket))
  }
}

impl<S: UdpSocketTrait> SsdpClient<S> {
  /// Wrap a socket that already has its read timeout configured
  pub fn with_socket(socket: S) -> Self {
    Self {
      socket,
      buffer: [0; 2048],
    }
  }

  pub fn socket(&self) -> &S {
    &self.socket
  }

  /// Multicast the request once to the SSDP group
  pub fn search(&mut self, request: &SearchRequest) -> Result<(), Error> {
    let payload = request.to_payload();
    log::debug!("Sending M-SEARCH:\n{}", payload);
    self.socket.send_to(payload.as_bytes(), SSDP_MULTICAST_ADDR)?;
    Ok(())
  }

  /// Wait up to one poll interval for a datagram.
  ///
  /// `Ok(None)` means nothing arrived in time; any other socket failure is an error.
  pub fn poll(&mut self) -> Result<Option<DiscoveryRecord>, Error> {
    match self.socket.recv_from(&mut self.buffer) {
      Ok((size, sender)) => Ok(Some(DiscoveryRecord {
        raw: self.buffer[..size].to_vec(),
        sender,
        received_at: Instant::now(),
      })),
      Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => Ok(None),
      Err(e) => Err(e),
    }
  }
}

/// Scripted socket: replays datagrams and errors in order, then times out on every read
#[cfg(test)]
pub(crate) struct MockUdpSocket {
  pub(crate) replies: std::collections::VecDeque<Result<(Vec<u8>, SocketAddr), ErrorKind>>,
  pub(crate) send_error: Option<ErrorKind>,
  pub(crate) read_timeout: Duration,
  pub(crate) sent: Vec<String>,
  pub(crate) reads: usize,
}

#[cfg(test)]
impl MockUdpSocket {
  pub(crate) fn new(read_timeout: Duration) -> Self {
    Self {
      replies: std::collections::VecDeque::new(),
      send_error: None,
      read_timeout,
      sent: Vec::new(),
      reads: 0,
    }
  }

  pub(crate) fn reply(mut self, raw: &str, sender: SocketAddr) -> Self {
    self.replies.push_back(Ok((raw.as_bytes().to_vec(), sender)));
    self
  }

  pub(crate) fn fail(mut self, kind: ErrorKind) -> Self {
    self.replies.push_back(Err(kind));
    self
  }
}

#[cfg(test)]
impl UdpSocketTrait for MockUdpSocket {
  fn send_to(&mut self, buf: &[u8], _addr: &str) -> Result<usize, Error> {
    if let Some(kind) = self.send_error {
      return Err(Error::new(kind, "send failed"));
    }
    self.sent.push(String::from_utf8_lossy(buf).to_string());
    Ok(buf.len())
  }

  fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), Error> {
    self.reads += 1;
    match self.replies.pop_front() {
      Some(Ok((raw, sender))) => {
        buf[..raw.len()].copy_from_slice(&raw);
        Ok((raw.len(), sender))
      }
      Some(Err(kind)) => Err(Error::new(kind, "recv failed")),
      None => {
        std::thread::sleep(self.read_timeout);
        Err(Error::from(ErrorKind::WouldBlock))
      }
    }
  }
}

/// Find a header value in an HTTP-like response, matching the name case-insensitively
pub fn header_value<'a>(response: &'a str, header: &str) -> Option<&'a str> {
  response
    .lines()
    .skip(1)
    .map(str::trim)
    .take_while(|line| !line.is_empty())
    .find_map(|line| extract_header_value(line, header))
}

/// The description URL advertised by a discovery response
pub fn location(response: &str) -> Option<&str> {
  header_value(response, "LOCATION").filter(|value| !value.is_empty())
}

/// Port named in a location URL such as `http://192.168.1.20:49152/description.xml`
pub fn port_from_location(location: &str) -> u16 {
  PORT_PATTERN
    .captures(location)
    .and_then(|captures| captures[1].parse().ok())
    .unwrap_or(DEFAULT_HTTP_PORT)
}

/// Extract header value from a line like "HEADER: value"
fn extract_header_value<'a>(line: &'a str, header: &str) -> Option<&'a str> {
  let (name, value) = line.split_once(':')?;
  if name.trim().eq_ignore_ascii_case(header) {
    Some(value.trim())
  } else {
    None
  }
}
