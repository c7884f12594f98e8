//! Helpers shared by the HTTP-level tests. Device endpoints are served by `mockito`.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};

use dlna::Device;
use mockito::ServerGuard;

pub fn localhost() -> IpAddr {
  IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Address the mock server listens on
pub fn server_addr(server: &ServerGuard) -> SocketAddr {
  server.host_with_port().parse().unwrap()
}

/// A resolved renderer whose control endpoints live on `server`
pub fn renderer_on(server: &ServerGuard) -> Device {
  let addr = server_addr(server);
  let mut device = Device::unresolved(addr.ip(), 1);
  device.name = "Loopback Renderer".to_string();
  device.port = addr.port();
  device.av_transport_url = Some("/AVTransport/ctrl".to_string());
  device.rendering_control_url = Some("/RenderingControl/ctrl".to_string());
  device.has_av_transport = true;
  device
}

/// A port nothing is listening on
pub fn closed_port() -> u16 {
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  listener.local_addr().unwrap().port()
}

pub fn ssdp_response(location: &str) -> Vec<u8> {
  format!(
    "HTTP/1.1 200 OK\r\nCACHE-CONTROL: max-age=1800\r\nLOCATION: {}\r\nST: urn:schemas-upnp-org:service:AVTransport:1\r\n\r\n",
    location
  )
  .into_bytes()
}
