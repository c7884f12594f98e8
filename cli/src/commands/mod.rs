pub mod error;

pub use error::{CommandError, CommandResult};

use dlna::{Renderer, SoapResponse};

/// An action the shell can run
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Search for this many seconds
    Search(f64),
    List,
    /// Play a new URL, or resume when `None`
    Play(Option<String>),
    Pause,
    Stop,
    Volume(u8),
    Seek(String),
    Mute,
    Unmute,
    Info,
    MediaInfo,
    PositionInfo,
}

impl Command {
    /// Run a device command against `renderer`
    pub fn execute(&self, renderer: &Renderer<'_>) -> CommandResult {
        let device = renderer.device();
        match self {
            Command::Play(Some(url)) => {
                renderer.play_url(url)?;
                Ok(format!("Playing {} on {}", url, device))
            }
            Command::Play(None) => {
                renderer.play()?;
                Ok(format!("Resumed playback on {}", device))
            }
            Command::Pause => {
                renderer.pause()?;
                Ok(format!("Paused {}", device))
            }
            Command::Stop => {
                renderer.stop()?;
                Ok(format!("Stopped {}", device))
            }
            Command::Volume(volume) => {
                renderer.set_volume(*volume)?;
                Ok(format!("Volume of {} set to {}", device, volume))
            }
            Command::Seek(position) => {
                validate_position(position)?;
                renderer.seek(position)?;
                Ok(format!("Seeked {} to {}", device, position))
            }
            Command::Mute => {
                renderer.mute()?;
                Ok(format!("Muted {}", device))
            }
            Command::Unmute => {
                renderer.unmute()?;
                Ok(format!("Unmuted {}", device))
            }
            Command::Info => Ok(render_response(&renderer.info()?)),
            Command::MediaInfo => Ok(render_response(&renderer.media_info()?)),
            Command::PositionInfo => Ok(render_response(&renderer.position_info()?)),
            Command::Search(_) | Command::List => Err(CommandError::InvalidArgument(
                "search and list do not target a device".to_string(),
            )),
        }
    }
}

/// Positions are `HH:MM:SS`, optionally with a fractional part
fn validate_position(position: &str) -> Result<(), CommandError> {
    let whole = position.split('.').next().unwrap_or_default();
    let parts: Vec<&str> = whole.split(':').collect();
    let valid = parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));

    if valid {
        Ok(())
    } else {
        Err(CommandError::InvalidArgument(format!(
            "seek position `{}` is not HH:MM:SS",
            position
        )))
    }
}

fn render_response(response: &SoapResponse) -> String {
    match response.document() {
        Some(document) => document.to_string(),
        None if response.is_empty() => "No response from device".to_string(),
        None => response.body.clone(),
    }
}
