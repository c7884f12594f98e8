use std::time::Duration;

use log::{debug, error, warn};

use super::device::Device;
use crate::config::{av_transport_urn, rendering_control_urn};
use crate::error::{DlnaError, Result};
use crate::xml::{self, ParseOptions, XmlNode};

pub const FAULT_DESCRIPTION_PATH: &str =
  "s:Envelope/s:Body/s:Fault/detail/UPnPError/errorDescription";

/// The UPnP service an action belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
  AvTransport,
  RenderingControl,
}

impl ServiceKind {
  /// Volume and mute actions go to RenderingControl, everything else to AVTransport
  pub fn for_action(action: &str) -> Self {
    match action {
      "SetVolume" | "SetMute" | "GetVolume" => ServiceKind::RenderingControl,
      _ => ServiceKind::AvTransport,
    }
  }

  pub fn urn(self, version: u8) -> String {
    match self {
      ServiceKind::AvTransport => av_transport_urn(version),
      ServiceKind::RenderingControl => rendering_control_urn(version),
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      ServiceKind::AvTransport => "AVTransport",
      ServiceKind::RenderingControl => "RenderingControl",
    }
  }
}

/// One control action addressed to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapRequest {
  pub action: String,
  pub url: String,
  pub host: String,
  pub urn: String,
  pub fields: Vec<(String, String)>,
}

impl SoapRequest {
  /// Address `action` to the endpoint of `device` that serves it
  pub fn for_device<K, V>(device: &Device, action: &str, fields: Vec<(K, V)>) -> Result<Self>
  where
    K: Into<String>,
    V: ToString,
  {
    let service = ServiceKind::for_action(action);

    Ok(Self {
      action: action.to_string(),
      url: device.control_url(service)?,
      host: device.host(),
      urn: service.urn(device.ssdp_version),
      fields: fields
        .into_iter()
        .map(|(name, value)| (name.into(), value.to_string()))
        .collect(),
    })
  }

  /// SOAP 1.1 envelope with the fields in insertion order.
  ///
  /// Values are inserted verbatim; callers must not pass `<` or `&` in them.
  pub fn body(&self) -> String {
    let mut fields = String::new();
    for (name, value) in &self.fields {
      fields.push_str(&format!("<{}>{}</{}>", name, value, name));
    }

    format!(
      "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
        <s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" \
        s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
        <s:Body>\
        <u:{} xmlns:u=\"{}\">\
        {}\
        </u:{}>\
        </s:Body>\
        </s:Envelope>",
      self.action, self.urn, fields, self.action
    )
  }

  /// Value of the SOAPACTION header, quotes included
  pub fn soap_action(&self) -> String {
    format!("\"{}#{}\"", self.urn, self.action)
  }

  /// HTTP headers for a request carrying `body`
  pub fn headers(&self, body: &str) -> Vec<(&'static str, String)> {
    vec![
      ("HOST", self.host.clone()),
      ("CONTENT-TYPE", "text/xml; charset=\"utf-8\"".to_string()),
      ("CONTENT-LENGTH", body.len().to_string()),
      ("SOAPACTION", self.soap_action()),
      ("CONNECTION", "close".to_string()),
    ]
  }

  /// The full HTTP request as text
  pub fn to_packet(&self) -> String {
    let body = self.body();
    let mut packet = format!("POST {} HTTP/1.1\r\n", self.url);
    for (name, value) in self.headers(&body) {
      packet.push_str(&format!("{}: {}\r\n", name, value));
    }
    packet.push_str("\r\n");
    packet.push_str(&body);
    packet
  }
}

/// A device's reply to a control action.
///
/// A failed exchange yields an empty response; a SOAP fault is recorded but still
/// carries the parsed document.
#[derive(Debug, Clone, Default)]
pub struct SoapResponse {
  pub body: String,
  document: Option<XmlNode>,
  fault: Option<String>,
}

impl SoapResponse {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Unescape and parse a reply body, logging any fault it carries
  pub fn from_body(body: String) -> Self {
    let unescaped = xml::unescape(&body);
    let document = match xml::parse_with(&unescaped, ParseOptions::lenient()) {
      Ok(document) => Some(document),
      Err(e) => {
        warn!("Failed to parse SOAP response: {}", e);
        None
      }
    };

    let fault = document
      .as_ref()
      .and_then(|document| document.text_at(FAULT_DESCRIPTION_PATH).ok())
      .map(str::to_string);
    if let Some(description) = &fault {
      error!("{}", description);
    }

    Self {
      body,
      document,
      fault,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.body.is_empty()
  }

  /// Parsed reply, if it was XML
  pub fn document(&self) -> Option<&XmlNode> {
    self.document.as_ref()
  }

  /// `errorDescription` of a UPnP fault
  pub fn fault(&self) -> Option<&str> {
    self.fault.as_deref()
  }

  /// Output argument `name` of `<u:{action}Response>`, whatever the namespace prefixes
  pub fn action_value(&self, action: &str, name: &str) -> Option<&str> {
    let response = format!("{}Response", action);
    self
      .document()?
      .find_local("Envelope")?
      .as_node()?
      .find_local("Body")?
      .as_node()?
      .find_local(&response)?
      .as_node()?
      .get(name)?
      .first()?
      .as_text()
  }

  /// Turn a recorded fault into an error
  pub fn check(self) -> Result<Self> {
    match self.fault {
      Some(description) => Err(DlnaError::ProtocolFault(description)),
      None => Ok(self),
    }
  }
}

/// Sends control actions, one connection per call
pub struct SoapClient {
  http_client: reqwest::blocking::Client,
}

impl SoapClient {
  pub fn new(timeout: Duration) -> Result<Self> {
    let http_client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .no_proxy()
      .pool_max_idle_per_host(0)
      .build()
      .map_err(|e| DlnaError::Network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { http_client })
  }

  /// Send `request` and wait for the reply.
  ///
  /// Network failures and timeouts are logged and produce [`SoapResponse::empty`].
  pub fn send(&self, request: &SoapRequest) -> SoapResponse {
    debug!("{}", request.to_packet());

    match self.exchange(request) {
      Ok(body) => SoapResponse::from_body(body),
      Err(e) => {
        error!("{} to {} failed: {}", request.action, request.url, e);
        SoapResponse::empty()
      }
    }
  }

  fn exchange(&self, request: &SoapRequest) -> Result<String> {
    let body = request.body();

    let mut builder = self.http_client.post(&request.url);
    for (name, value) in request.headers(&body) {
      builder = builder.header(name, value);
    }

    let response = builder.body(body).send()?;
    Ok(response.text()?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::net::{IpAddr, Ipv4Addr};

  fn renderer() -> Device {
    let mut device = Device::unresolved(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)), 1);
    device.name = "TV".to_string();
    device.port = 49152;
    device.av_transport_url = Some("/AVTransport/control".to_string());
    device.rendering_control_url = Some("/RenderingControl/control".to_string());
    device.has_av_transport = true;
    device
  }

  #[test]
  fn test_service_kind_for_action() {
    assert_eq!(ServiceKind::for_action("SetVolume"), ServiceKind::RenderingControl);
    assert_eq!(ServiceKind::for_action("SetMute"), ServiceKind::RenderingControl);
    assert_eq!(ServiceKind::for_action("GetVolume"), ServiceKind::RenderingControl);
    assert_eq!(ServiceKind::for_action("Play"), ServiceKind::AvTransport);
    assert_eq!(ServiceKind::for_action("GetMediaInfo"), ServiceKind::AvTransport);
  }

  #[test]
  fn test_play_body_field_order_and_content_length() {
    let request =
      SoapRequest::for_device(&renderer(), "Play", vec![("InstanceID", 0), ("Speed", 1)]).unwrap();

    let body = request.body();
    assert!(body.contains("<InstanceID>0</InstanceID><Speed>1</Speed>"));
    assert!(body.contains("<u:Play xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\">"));
    assert!(body.contains("</u:Play>"));

    let headers = request.headers(&body);
    let length = headers
      .iter()
      .find(|(name, _)| *name == "CONTENT-LENGTH")
      .map(|(_, value)| value.clone())
      .unwrap();
    assert_eq!(length, body.as_bytes().len().to_string());
  }

  #[test]
  fn test_volume_targets_rendering_control() {
    let request = SoapRequest::for_device(
      &renderer(),
      "SetVolume",
      vec![("InstanceID", "0"), ("DesiredVolume", "30"), ("Channel", "Master")],
    )
    .unwrap();

    assert_eq!(request.url, "http://192.168.1.50:49152/RenderingControl/control");
    assert_eq!(request.urn, "urn:schemas-upnp-org:service:RenderingControl:1");
    assert_eq!(
      request.soap_action(),
      "\"urn:schemas-upnp-org:service:RenderingControl:1#SetVolume\""
    );
  }

  #[test]
  fn test_urn_follows_device_protocol_version() {
    let mut device = renderer();
    device.ssdp_version = 2;
    let request = SoapRequest::for_device(&device, "Stop", vec![("InstanceID", 0)]).unwrap();
    assert_eq!(request.urn, "urn:schemas-upnp-org:service:AVTransport:2");
  }

  #[test]
  fn test_packet_layout() {
    let request = SoapRequest::for_device(&renderer(), "Pause", vec![("InstanceID", 0), ("Speed", 1)]).unwrap();
    let packet = request.to_packet();

    assert!(packet.starts_with("POST http://192.168.1.50:49152/AVTransport/control HTTP/1.1\r\n"));
    assert!(packet.contains("HOST: 192.168.1.50:49152\r\n"));
    assert!(packet.contains("CONTENT-TYPE: text/xml; charset=\"utf-8\"\r\n"));
    assert!(packet.contains("SOAPACTION: \"urn:schemas-upnp-org:service:AVTransport:1#Pause\"\r\n"));
    assert!(packet.contains("CONNECTION: close\r\n"));
    assert!(packet.ends_with("</s:Envelope>"));
  }

  #[test]
  fn test_unusable_device_is_rejected() {
    let device = Device::unresolved(IpAddr::V4(Ipv4Addr::LOCALHOST), 1);
    let result = SoapRequest::for_device(&device, "Play", vec![("InstanceID", 0)]);
    assert!(matches!(result, Err(DlnaError::Unsupported { .. })));
  }

  #[test]
  fn test_fault_is_recorded_not_raised() {
    let body = include_str!("../../tests/fixtures/soap_fault.xml").to_string();
    let response = SoapResponse::from_body(body);

    assert!(response.document().is_some());
    assert_eq!(response.fault(), Some("Transition not available"));
    assert!(matches!(response.check(), Err(DlnaError::ProtocolFault(ref d)) if d == "Transition not available"));
  }

  #[test]
  fn test_action_value() {
    let body = include_str!("../../tests/fixtures/get_volume_response.xml").to_string();
    let response = SoapResponse::from_body(body);

    assert_eq!(response.fault(), None);
    assert_eq!(response.action_value("GetVolume", "CurrentVolume"), Some("42"));
    assert_eq!(response.action_value("GetVolume", "Missing"), None);
    assert!(response.check().is_ok());
  }

  #[test]
  fn test_escaped_metadata_parses_as_structure() {
    let body = include_str!("../../tests/fixtures/get_media_info_response.xml").to_string();
    let response = SoapResponse::from_body(body);

    let title = response
      .document()
      .unwrap()
      .text_at("s:Envelope/s:Body/u:GetMediaInfoResponse/CurrentURIMetaData/DIDL-Lite/item/dc:title")
      .unwrap();
    assert_eq!(title, "Big Buck Bunny");
  }

  #[test]
  fn test_empty_response() {
    let response = SoapResponse::empty();
    assert!(response.is_empty());
    assert!(response.document().is_none());
    assert!(response.fault().is_none());
  }
}
