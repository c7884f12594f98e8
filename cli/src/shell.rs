use std::io::{self, BufRead, Write};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dlna::{CancelToken, Device, Discovery, DiscoveryOptions, DlnaConfig, Renderer, SearchTarget, Session, SoapClient};
use log::{debug, LevelFilter};

use crate::args::Args;
use crate::commands::{Command, CommandError, CommandResult};

/// Search window used when a device is addressed by ip
const IP_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings that carry over from one command line to the next
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub name_filter: Option<String>,
    pub ip: Option<IpAddr>,
    pub compatible_only: bool,
    pub ssdp_version: u8,
    pub index: usize,
    pub timeout: Duration,
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn from_config(config: &DlnaConfig) -> Self {
        Self {
            name_filter: None,
            ip: None,
            compatible_only: true,
            ssdp_version: config.ssdp_version,
            index: 0,
            timeout: config.discovery_timeout,
            log_level: LevelFilter::Warn,
        }
    }

    /// Fold the settings given on `args` into the current ones
    pub fn apply(&mut self, args: &Args) -> Result<(), CommandError> {
        if let Some(level) = args.log {
            self.log_level = level.into();
        }
        if args.all {
            self.compatible_only = false;
        }
        if let Some(name) = &args.device {
            self.name_filter = Some(name.clone());
        }
        if let Some(version) = args.ssdp_version {
            self.ssdp_version = version;
        }
        if let Some(index) = args.index {
            self.index = index;
        }
        if let Some(ip) = args.ip {
            self.ip = Some(ip);
            self.compatible_only = false;
            self.timeout = IP_SEARCH_TIMEOUT;
        }
        if let Some(seconds) = args.search {
            self.timeout = Duration::try_from_secs_f64(seconds).map_err(|_| {
                CommandError::InvalidArgument(format!("search timeout `{}` is not a duration", seconds))
            })?;
        }
        Ok(())
    }

    pub fn discovery_options(&self, config: &DlnaConfig) -> DiscoveryOptions {
        let target = if self.compatible_only {
            SearchTarget::AvTransport
        } else {
            SearchTarget::All
        };

        let mut options = DiscoveryOptions::from_config(config)
            .with_timeout(self.timeout)
            .with_search_target(target)
            .with_ssdp_version(self.ssdp_version);
        if let Some(name) = &self.name_filter {
            options = options.with_name_filter(name.clone());
        }
        if let Some(ip) = self.ip {
            options = options.with_ip_filter(ip);
        }
        options
    }
}

/// Interactive command loop over one session
pub struct Shell {
    config: DlnaConfig,
    settings: Settings,
    session: Session,
    client: SoapClient,
    cancel: CancelToken,
    searching: Arc<AtomicBool>,
}

impl Shell {
    pub fn new(config: DlnaConfig) -> dlna::Result<Self> {
        let client = SoapClient::new(config.soap_timeout)?;
        Ok(Self {
            settings: Settings::from_config(&config),
            config,
            session: Session::new(),
            client,
            cancel: CancelToken::new(),
            searching: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Stop a running search on Ctrl-C, otherwise exit
    pub fn install_interrupt_handler(&self) -> Result<(), ctrlc::Error> {
        let cancel = self.cancel.clone();
        let searching = Arc::clone(&self.searching);

        ctrlc::set_handler(move || {
            if searching.load(Ordering::SeqCst) {
                cancel.cancel();
            } else {
                println!();
                std::process::exit(130);
            }
        })
    }

    /// Read command lines until end of input or `exit`
    pub fn run<R: BufRead>(&mut self, input: R) -> io::Result<()> {
        let mut lines = input.lines();
        loop {
            print!("Command: ");
            io::stdout().flush()?;

            let Some(line) = lines.next() else {
                println!();
                return Ok(());
            };
            let line = line?;
            let trimmed = line.trim();
            if trimmed == "exit" || trimmed == "quit" {
                return Ok(());
            }

            match Args::from_line(trimmed) {
                Ok(args) => {
                    let result = self.execute(&args);
                    report(result);
                }
                Err(e) => {
                    let _ = e.print();
                }
            }
        }
    }

    /// Apply the settings of one command line and run its action
    pub fn execute(&mut self, args: &Args) -> CommandResult {
        self.settings.apply(args)?;
        log::set_max_level(self.settings.log_level);

        let Some(command) = args.action() else {
            return Ok(String::new());
        };
        debug!("Running {:?} with {:?}", command, self.settings);

        match command {
            Command::Search(_) => self.search(),
            Command::List => Ok(self.list()),
            command => {
                self.select_target()?;
                let device = self.session.selected().ok_or(CommandError::NoDevices)?;
                let renderer = Renderer::new(device, &self.client);
                command.execute(&renderer)
            }
        }
    }

    fn search(&mut self) -> CommandResult {
        let discovery = Discovery::new(self.settings.discovery_options(&self.config), self.config.http_timeout)?;

        self.cancel.reset();
        self.searching.store(true, Ordering::SeqCst);
        let result = self
            .session
            .discover(&discovery, &self.cancel, |index, device| println!("{} {}", index, device));
        self.searching.store(false, Ordering::SeqCst);

        result?;
        if self.session.is_empty() {
            return Err(CommandError::NoDevices);
        }
        Ok(String::new())
    }

    /// The device list with capability markers
    pub fn list(&self) -> String {
        let mut output = String::from("Discovered devices:");
        for (index, device) in self.session.devices().iter().enumerate() {
            output.push_str(&format!("\n{}", list_entry(index, device)));
        }
        output
    }

    fn select_target(&mut self) -> Result<(), CommandError> {
        if self.session.is_empty() {
            return Err(CommandError::NoDevices);
        }
        let available = self.session.devices().len();
        let index = self.settings.index;
        self.session
            .select(index)
            .map_err(|_| CommandError::InvalidIndex { index, available })?;
        Ok(())
    }
}

/// Print the outcome of one command
pub fn report(result: CommandResult) {
    match result {
        Ok(output) if output.is_empty() => {}
        Ok(output) => println!("{}", output),
        Err(e) => println!("{}", e),
    }
}

fn list_entry(index: usize, device: &Device) -> String {
    let marker = if device.has_av_transport { "[a]" } else { "[x]" };
    format!("{} {} {}", index, marker, device)
}
