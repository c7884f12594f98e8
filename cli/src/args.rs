use std::net::IpAddr;

use clap::{ArgGroup, Parser, ValueEnum};
use log::LevelFilter;

use crate::commands::Command;

/// One command line, either from the process arguments or typed at the prompt.
///
/// Settings (`--device`, `--ip`, `--all`, `--ssdp-version`, `--index`, `--log`) persist
/// for later commands; at most one action runs per line.
#[derive(Parser, Debug, Default)]
#[command(name = "dlnap")]
#[command(about = "Discover DLNA media renderers and control playback")]
#[command(version)]
#[command(group(ArgGroup::new("action").multiple(false)))]
pub struct Args {
    /// Search for devices for <TIMEOUT> seconds; Ctrl-C stops searching early
    #[arg(short, long, value_name = "TIMEOUT", group = "action")]
    pub search: Option<f64>,

    /// List the devices found so far
    #[arg(short, long, group = "action")]
    pub list: bool,

    /// Address of a known device, for faster access; also searches for all device types
    #[arg(short, long)]
    pub ip: Option<IpAddr>,

    /// Only accept devices whose name contains this text
    #[arg(short, long, value_name = "NAME")]
    pub device: Option<String>,

    /// Discover every UPnP device, not only those with AVTransport
    #[arg(long)]
    pub all: bool,

    /// UPnP service version to search for and address
    #[arg(long, value_name = "VERSION")]
    pub ssdp_version: Option<u8>,

    /// Use the <INDEX>th device of the device list
    #[arg(long, value_name = "INDEX")]
    pub index: Option<usize>,

    /// Play <URL>, or resume the current media when no URL is given
    #[arg(long, value_name = "URL", num_args = 0..=1, group = "action")]
    pub play: Option<Option<String>>,

    /// Pause playback
    #[arg(long, group = "action")]
    pub pause: bool,

    /// Stop playback
    #[arg(long, group = "action")]
    pub stop: bool,

    /// Set the master volume
    #[arg(long, value_name = "VOLUME", group = "action")]
    pub volume: Option<u8>,

    /// Seek to a position given as HH:MM:SS
    #[arg(long, value_name = "POSITION", group = "action")]
    pub seek: Option<String>,

    #[arg(long, group = "action")]
    pub mute: bool,

    #[arg(long, group = "action")]
    pub unmute: bool,

    /// Show transport info
    #[arg(long, group = "action")]
    pub info: bool,

    /// Show media info
    #[arg(long, group = "action")]
    pub media_info: bool,

    /// Show position info
    #[arg(long, group = "action")]
    pub position_info: bool,

    /// Log level
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log: Option<LogLevel>,
}

impl Args {
    /// Parse a line typed at the prompt
    pub fn from_line(line: &str) -> Result<Self, clap::Error> {
        Self::try_parse_from(std::iter::once("dlnap").chain(line.split_whitespace()))
    }

    /// The action requested on this line, if any
    pub fn action(&self) -> Option<Command> {
        if let Some(timeout) = self.search {
            return Some(Command::Search(timeout));
        }
        if self.list {
            return Some(Command::List);
        }
        if let Some(url) = &self.play {
            return Some(Command::Play(url.clone().filter(|url| !url.is_empty())));
        }
        if let Some(volume) = self.volume {
            return Some(Command::Volume(volume));
        }
        if let Some(position) = &self.seek {
            return Some(Command::Seek(position.clone()));
        }

        [
            (self.pause, Command::Pause),
            (self.stop, Command::Stop),
            (self.mute, Command::Mute),
            (self.unmute, Command::Unmute),
            (self.info, Command::Info),
            (self.media_info, Command::MediaInfo),
            (self.position_info, Command::PositionInfo),
        ]
        .into_iter()
        .find_map(|(set, command)| set.then_some(command))
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_search_with_settings() {
        let args = Args::from_line("--search 3 -d living --all --ssdp-version 2").unwrap();
        assert_eq!(args.action(), Some(Command::Search(3.0)));
        assert_eq!(args.device.as_deref(), Some("living"));
        assert!(args.all);
        assert_eq!(args.ssdp_version, Some(2));
    }

    #[test]
    fn test_play_with_and_without_url() {
        let args = Args::from_line("--play http://192.168.1.10/movie.mp4").unwrap();
        assert_eq!(
            args.action(),
            Some(Command::Play(Some("http://192.168.1.10/movie.mp4".to_string())))
        );

        let args = Args::from_line("--play").unwrap();
        assert_eq!(args.action(), Some(Command::Play(None)));
    }

    #[test]
    fn test_flag_actions() {
        assert_eq!(Args::from_line("--pause").unwrap().action(), Some(Command::Pause));
        assert_eq!(Args::from_line("--mute").unwrap().action(), Some(Command::Mute));
        assert_eq!(Args::from_line("--media-info").unwrap().action(), Some(Command::MediaInfo));
        assert_eq!(Args::from_line("--position-info").unwrap().action(), Some(Command::PositionInfo));
        assert_eq!(Args::from_line("--volume 25").unwrap().action(), Some(Command::Volume(25)));
        assert_eq!(
            Args::from_line("--seek 00:01:00").unwrap().action(),
            Some(Command::Seek("00:01:00".to_string()))
        );
    }

    #[test]
    fn test_settings_only_line_has_no_action() {
        let args = Args::from_line("--index 1 --ip 192.168.1.50 --log debug").unwrap();
        assert_eq!(args.action(), None);
        assert_eq!(args.index, Some(1));
        assert_eq!(args.ip, Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50))));
        assert_eq!(args.log, Some(LogLevel::Debug));
    }

    #[test]
    fn test_two_actions_are_rejected() {
        assert!(Args::from_line("--pause --stop").is_err());
        assert!(Args::from_line("--volume 300").is_err());
        assert!(Args::from_line("--log verbose").is_err());
    }

    #[test]
    fn test_empty_line() {
        let args = Args::from_line("   ").unwrap();
        assert_eq!(args.action(), None);
    }
}
