use log::{debug, info};

use crate::error::Result;
use crate::transport::device::Device;
use crate::transport::soap::{SoapClient, SoapRequest, SoapResponse};

/// Control actions understood by a media renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetAvTransportUri(String),
    Play,
    Pause,
    Stop,
    /// Relative seek to an `HH:MM:SS` position
    Seek(String),
    SetVolume(u8),
    GetVolume,
    SetMute(bool),
    GetTransportInfo,
    GetMediaInfo,
    GetPositionInfo,
}

impl Action {
    /// SOAP action name
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetAvTransportUri(_) => "SetAVTransportURI",
            Action::Play => "Play",
            Action::Pause => "Pause",
            Action::Stop => "Stop",
            Action::Seek(_) => "Seek",
            Action::SetVolume(_) => "SetVolume",
            Action::GetVolume => "GetVolume",
            Action::SetMute(_) => "SetMute",
            Action::GetTransportInfo => "GetTransportInfo",
            Action::GetMediaInfo => "GetMediaInfo",
            Action::GetPositionInfo => "GetPositionInfo",
        }
    }

    /// Arguments in the order the device expects them
    pub fn fields(&self, instance_id: u32) -> Vec<(&'static str, String)> {
        let mut fields = vec![("InstanceID", instance_id.to_string())];
        match self {
            Action::SetAvTransportUri(uri) => {
                fields.push(("CurrentURI", uri.clone()));
                fields.push(("CurrentURIMetaData", String::new()));
            }
            Action::Play | Action::Pause | Action::Stop => fields.push(("Speed", "1".to_string())),
            Action::Seek(target) => {
                fields.push(("Unit", "REL_TIME".to_string()));
                fields.push(("Target", target.clone()));
            }
            Action::SetVolume(volume) => {
                fields.push(("DesiredVolume", volume.to_string()));
                fields.push(("Channel", "Master".to_string()));
            }
            Action::GetVolume => fields.push(("Channel", "Master".to_string())),
            Action::SetMute(muted) => {
                fields.push(("DesiredMute", if *muted { "1" } else { "0" }.to_string()));
                fields.push(("Channel", "Master".to_string()));
            }
            Action::GetTransportInfo | Action::GetMediaInfo | Action::GetPositionInfo => {}
        }
        fields
    }
}

/// Controls one resolved device for the duration of a command
pub struct Renderer<'a> {
    device: &'a Device,
    client: &'a SoapClient,
    instance_id: u32,
}

impl<'a> Renderer<'a> {
    pub fn new(device: &'a Device, client: &'a SoapClient) -> Self {
        Self {
            device,
            client,
            instance_id: 0,
        }
    }

    pub fn with_instance_id(mut self, instance_id: u32) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn device(&self) -> &Device {
        self.device
    }

    /// Build the request for `action` without sending it
    pub fn request(&self, action: &Action) -> Result<SoapRequest> {
        SoapRequest::for_device(self.device, action.name(), action.fields(self.instance_id))
    }

    /// Send `action` and return whatever the device answered.
    ///
    /// Fails only when the device has no endpoint for the action's service.
    pub fn send(&self, action: &Action) -> Result<SoapResponse> {
        let request = self.request(action)?;
        debug!("{} -> {}", action.name(), self.device);
        Ok(self.client.send(&request))
    }

    /// Set the media to play back
    pub fn set_current_media(&self, url: &str) -> Result<()> {
        info!("Setting media on {}: {}", self.device, url);
        self.send(&Action::SetAvTransportUri(url.to_string()))?;
        Ok(())
    }

    pub fn play(&self) -> Result<()> {
        self.send(&Action::Play)?;
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.send(&Action::Pause)?;
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.send(&Action::Stop)?;
        Ok(())
    }

    /// Seek to `position` (`HH:MM:SS`), passed to the device as given
    pub fn seek(&self, position: &str) -> Result<()> {
        self.send(&Action::Seek(position.to_string()))?;
        Ok(())
    }

    pub fn set_volume(&self, volume: u8) -> Result<()> {
        self.send(&Action::SetVolume(volume))?;
        Ok(())
    }

    /// Current master volume, if the device reported a readable one
    pub fn get_volume(&self) -> Result<Option<u8>> {
        let response = self.send(&Action::GetVolume)?;
        Ok(response
            .action_value("GetVolume", "CurrentVolume")
            .and_then(|volume| volume.trim().parse().ok()))
    }

    pub fn mute(&self) -> Result<()> {
        self.send(&Action::SetMute(true))?;
        Ok(())
    }

    pub fn unmute(&self) -> Result<()> {
        self.send(&Action::SetMute(false))?;
        Ok(())
    }

    /// Transport state (`GetTransportInfo`)
    pub fn info(&self) -> Result<SoapResponse> {
        self.send(&Action::GetTransportInfo)
    }

    pub fn media_info(&self) -> Result<SoapResponse> {
        self.send(&Action::GetMediaInfo)
    }

    pub fn position_info(&self) -> Result<SoapResponse> {
        self.send(&Action::GetPositionInfo)
    }

    /// Stop whatever is playing, load `url` and start it
    pub fn play_url(&self, url: &str) -> Result<()> {
        self.stop()?;
        self.set_current_media(url)?;
        self.play()
    }
}
