//! Connection Orchestrator
//!
//! Owns the relay catalog and the selection sweep, drives the VPN
//! client through its connect sequence, and confirms the result with
//! the identity probe.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut control = MullControl::from_config(&ControlConfig::default())?;
//!
//! // Visit every Swedish relay once, in random order
//! loop {
//!     match control.iterate_random(Some("se")) {
//!         Ok(relay) => println!("connected via {}", relay),
//!         Err(ControlError::ExhaustedPool) => break,
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

use crate::account::AccountInfo;
use crate::command::{CommandError, CommandRunner, MullvadCli};
use crate::config::ControlConfig;
use crate::probe::{HttpProber, IdentityProbe, IdentitySnapshot, ProbeError};
use crate::relay::{Catalog, Relay};
use crate::selection::{RelaySelector, SelectionError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Orchestrator errors
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Command failed: {0}")]
    Command(#[from] CommandError),

    #[error("Selection pool is empty")]
    EmptyPool,

    #[error("All servers have been selected")]
    ExhaustedPool,

    #[error("Failed to connect to {0}")]
    ConnectFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Identity check failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Unexpected client output: {0}")]
    UnexpectedOutput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<SelectionError> for ControlError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::EmptyPool => ControlError::EmptyPool,
            SelectionError::InvalidArgument(msg) => ControlError::InvalidArgument(msg),
        }
    }
}

/// VPN client controller
///
/// Not internally synchronized; one instance drives one client.
pub struct MullControl {
    /// VPN client commands
    runner: Box<dyn CommandRunner>,
    /// Egress identity source
    probe: Box<dyn IdentityProbe>,
    /// Relay catalog (lazy loaded)
    catalog: Option<Catalog>,
    /// Current sweep
    selector: RelaySelector,
    /// Pause after every client command
    settle_delay: Duration,
}

impl MullControl {
    /// Create a controller from its collaborators
    pub fn new(
        runner: Box<dyn CommandRunner>,
        probe: Box<dyn IdentityProbe>,
        selector: RelaySelector,
        settle_delay: Duration,
    ) -> Self {
        Self {
            runner,
            probe,
            catalog: None,
            selector,
            settle_delay,
        }
    }

    /// Create a controller for the installed client
    pub fn from_config(config: &ControlConfig) -> Result<Self, ControlError> {
        config.validate()?;
        let runner = MullvadCli::new(config.binary.clone());
        let probe = HttpProber::new(&config.probe)?;

        info!(
            "Controller ready (binary: {}, probe: {}, settle: {:?})",
            config.binary,
            probe.url(),
            config.settle_delay()
        );

        Ok(Self::new(
            Box::new(runner),
            Box::new(probe),
            RelaySelector::new(),
            config.settle_delay(),
        ))
    }

    /// Loaded catalog, if any
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Relays left in the current sweep
    pub fn remaining(&self) -> Option<usize> {
        self.selector.remaining()
    }

    /// Run an action command, then let the client settle
    fn run(&self, args: &[&str]) -> Result<(), ControlError> {
        debug!("mullvad {}", args.join(" "));
        self.runner.run(args)?;
        self.settle();
        Ok(())
    }

    /// Run a read command, then let the client settle
    fn output(&self, args: &[&str]) -> Result<String, ControlError> {
        debug!("mullvad {}", args.join(" "));
        let out = self.runner.output(args)?;
        self.settle();
        Ok(out)
    }

    fn settle(&self) {
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
    }

    /// Run `relay list` and parse it
    fn fetch_catalog(&self) -> Result<Catalog, ControlError> {
        let listing = self.output(&["relay", "list"])?;
        let catalog = Catalog::parse(&listing);
        if catalog.fallbacks() > 0 {
            warn!(
                "Relay listing had {} unparenthesized fields",
                catalog.fallbacks()
            );
        }
        Ok(catalog)
    }

    /// Reload the relay catalog from the client
    ///
    /// The current sweep is left untouched.
    pub fn get_servers(&mut self) -> Result<&Catalog, ControlError> {
        let catalog = self.fetch_catalog()?;
        Ok(&*self.catalog.insert(catalog))
    }

    /// Current catalog, fetched on first use
    fn take_catalog(&mut self) -> Result<Catalog, ControlError> {
        match self.catalog.take() {
            Some(catalog) => Ok(catalog),
            None => self.fetch_catalog(),
        }
    }

    /// Create the sweep pool if none exists
    pub fn populate(&mut self, country_short: Option<&str>) -> Result<(), ControlError> {
        if let Some("") = country_short {
            return Err(ControlError::InvalidArgument(
                "country code must not be empty".into(),
            ));
        }
        if self.selector.has_pool() {
            return Ok(());
        }

        let catalog = self.take_catalog()?;
        let catalog = &*self.catalog.insert(catalog);
        self.selector.populate(catalog, country_short)?;
        Ok(())
    }

    /// Restart the sweep over the whole catalog
    pub fn reset(&mut self) -> Result<(), ControlError> {
        let catalog = self.take_catalog()?;
        let catalog = &*self.catalog.insert(catalog);
        self.selector.reset(catalog);
        info!("Sweep reset: {} relays", catalog.len());
        Ok(())
    }

    /// Draw the next relay of the sweep
    pub fn next_relay(&mut self) -> Result<Relay, ControlError> {
        Ok(self.selector.next_relay()?)
    }

    /// Connect to a randomly chosen, not yet visited relay
    ///
    /// The relay leaves the pool before the attempt, so a failed
    /// connection is not retried within the sweep.
    pub fn iterate_random(&mut self, country_short: Option<&str>) -> Result<Relay, ControlError> {
        self.populate(country_short)?;

        let relay = match self.next_relay() {
            Ok(relay) => relay,
            Err(ControlError::EmptyPool) => return Err(ControlError::ExhaustedPool),
            Err(e) => return Err(e),
        };

        self.connect_to_server(&relay)?;
        Ok(relay)
    }

    /// Point the client at `relay`, reconnect and verify
    pub fn connect_to_server(&self, relay: &Relay) -> Result<(), ControlError> {
        info!("Connecting to {}", relay);

        self.run(&["disconnect"])?;
        self.run(&["relay", "set", "tunnel-protocol", "any"])?;
        self.run(&["relay", "set", "tunnel", relay.vpn_type.as_str()])?;
        self.run(&[
            "relay",
            "set",
            "location",
            &relay.country_short,
            &relay.city_short,
            &relay.server,
        ])?;
        self.run(&["connect"])?;

        if !self.is_connected() {
            warn!("{} did not come up as a provider exit", relay.server);
            return Err(ControlError::ConnectFailed(relay.server.clone()));
        }

        info!("Connected via {}", relay.server);
        Ok(())
    }

    /// Fetch the current egress identity
    pub fn get_status(&self) -> Result<IdentitySnapshot, ControlError> {
        Ok(self.probe.check_status()?)
    }

    /// Is traffic leaving through a provider exit?
    pub fn is_connected(&self) -> bool {
        self.probe.is_connected()
    }

    /// Account number and expiry
    pub fn get_account(&self) -> Result<AccountInfo, ControlError> {
        let output = self.output(&["account", "get"])?;
        AccountInfo::parse(&output).ok_or(ControlError::UnexpectedOutput(output))
    }
}
