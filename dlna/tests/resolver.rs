mod common;

use std::time::Duration;

use common::{closed_port, localhost, server_addr, ssdp_response};
use dlna::{Renderer, Resolver, SoapClient};
use mockito::{Matcher, Server};

const MEDIA_RENDERER: &str = include_str!("fixtures/media_renderer_device.xml");
const ROUTER: &str = include_str!("fixtures/router_device.xml");

fn resolver() -> Resolver {
  Resolver::http(Duration::from_secs(5)).unwrap()
}

#[test]
fn test_resolve_media_renderer_over_http() {
  let mut server = Server::new();
  let mock = server
    .mock("GET", "/description.xml")
    .with_status(200)
    .with_header("content-type", "text/xml")
    .with_body(MEDIA_RENDERER)
    .expect(1)
    .create();
  let location = format!("{}/description.xml", server.url());

  let device = resolver().resolve(&ssdp_response(&location), localhost(), 1);

  mock.assert();
  assert_eq!(device.name, "Living Room TV");
  assert_eq!(device.ip, localhost());
  assert_eq!(device.port, server_addr(&server).port());
  assert!(device.has_av_transport);
  assert_eq!(device.av_transport_url.as_deref(), Some("/AVTransport/ctrl"));
  assert_eq!(device.rendering_control_url.as_deref(), Some("/RenderingControl/ctrl"));
  assert_eq!(device.to_string(), "Living Room TV @ 127.0.0.1");
}

#[test]
fn test_router_is_not_a_renderer() {
  let mut server = Server::new();
  let _mock = server.mock("GET", "/rootDesc.xml").with_body(ROUTER).create();
  let location = format!("{}/rootDesc.xml", server.url());

  let device = resolver().resolve(&ssdp_response(&location), localhost(), 1);

  assert_eq!(device.name, "Home Router");
  assert!(!device.has_av_transport);
  assert_eq!(device.av_transport_url, None);
}

#[test]
fn test_http_error_status_marks_device_unusable() {
  let mut server = Server::new();
  let mock = server.mock("GET", "/missing.xml").with_status(404).create();
  let location = format!("{}/missing.xml", server.url());

  let device = resolver().resolve(&ssdp_response(&location), localhost(), 1);

  mock.assert();
  assert!(!device.has_av_transport);
  assert_eq!(device.name, "Unknown");
  assert_eq!(device.port, server_addr(&server).port());
}

#[test]
fn test_unreachable_location_marks_device_unusable() {
  let location = format!("http://127.0.0.1:{}/description.xml", closed_port());

  let device = resolver().resolve(&ssdp_response(&location), localhost(), 1);

  assert!(!device.has_av_transport);
  assert_eq!(device.location.as_deref(), Some(location.as_str()));
}

#[test]
fn test_resolved_device_is_controllable() {
  let mut server = Server::new();
  let description = server
    .mock("GET", "/description.xml")
    .with_body(MEDIA_RENDERER)
    .expect(1)
    .create();
  let seek = server
    .mock("POST", "/AVTransport/ctrl")
    .match_header("soapaction", "\"urn:schemas-upnp-org:service:AVTransport:1#Seek\"")
    .match_body(Matcher::Regex(
      "<InstanceID>0</InstanceID><Unit>REL_TIME</Unit><Target>00:02:00</Target>".to_string(),
    ))
    .with_status(200)
    .expect(1)
    .create();
  let location = format!("{}/description.xml", server.url());

  let device = resolver().resolve(&ssdp_response(&location), localhost(), 1);
  let client = SoapClient::new(Duration::from_secs(5)).unwrap();
  Renderer::new(&device, &client).seek("00:02:00").unwrap();

  description.assert();
  seek.assert();
}
