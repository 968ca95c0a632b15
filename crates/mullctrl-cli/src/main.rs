//! mullctrl: rotate a Mullvad client across exit relays
//!
//! Entry point. Sets up the allocator and logging, loads the config
//! and dispatches one subcommand.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mullctrl::{ControlConfig, ControlError, MullControl};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "mullctrl", version, about = "Rotate a Mullvad client across exit relays")]
struct Cli {
    /// Config file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current egress identity
    Status,

    /// List relays known to the client
    Servers {
        /// Only relays in this country (short code, e.g. "se")
        #[arg(long)]
        country: Option<String>,
    },

    /// Connect to one relay by server identifier
    Connect {
        server: String,
    },

    /// Connect to relays in random order, each at most once
    Sweep {
        /// Only relays in this country (short code)
        #[arg(long)]
        country: Option<String>,

        /// Stop after this many verified connections
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show account number and expiry
    Account,
}

fn main() -> Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = ControlConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let mut control = MullControl::from_config(&config)?;

    match cli.command {
        Commands::Status => {
            let status = control.get_status().context("identity check")?;
            println!("{}", status.summary());
            if status.blacklisted.blacklisted {
                for hit in status.blacklisted.results.iter().filter(|r| r.blacklisted) {
                    println!("  blacklisted by {} ({})", hit.name, hit.link);
                }
            }
        }
        Commands::Servers { country } => {
            let catalog = control.get_servers()?;
            let relays: Vec<_> = match country.as_deref() {
                Some(cc) => catalog.in_country(cc).collect(),
                None => catalog.relays().iter().collect(),
            };
            for relay in &relays {
                println!("{}\t{}\t{}", relay.server, relay.ip, relay);
            }
            info!(
                "{} relays listed ({} countries in catalog)",
                relays.len(),
                catalog.countries().len()
            );
        }
        Commands::Connect { server } => {
            let relay = control
                .get_servers()?
                .find(&server)
                .cloned()
                .with_context(|| format!("unknown server {}", server))?;
            control.connect_to_server(&relay)?;
            println!("connected via {}", relay);
        }
        Commands::Sweep { country, limit } => sweep(&mut control, country.as_deref(), limit)?,
        Commands::Account => {
            let account = control.get_account()?;
            println!("account: {}\nexpires: {}", account.account, account.expiry);
        }
    }

    Ok(())
}

/// Walk the pool until it runs dry or `limit` connections succeed
fn sweep(control: &mut MullControl, country: Option<&str>, limit: Option<usize>) -> Result<()> {
    let mut connected = 0;
    let mut failed = 0;

    loop {
        if limit.is_some_and(|l| connected >= l) {
            break;
        }

        match control.iterate_random(country) {
            Ok(relay) => {
                connected += 1;
                println!("connected via {}", relay);
            }
            Err(ControlError::ExhaustedPool) => {
                info!("All servers have been selected");
                break;
            }
            Err(ControlError::ConnectFailed(server)) => {
                failed += 1;
                warn!("{} failed verification, moving on", server);
            }
            // Without a pool there is no relay to move past
            Err(e @ ControlError::Command(_)) if control.remaining().is_some() => {
                failed += 1;
                error!("{}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "Sweep finished: {} connected, {} failed, {} left",
        connected,
        failed,
        control.remaining().unwrap_or(0)
    );
    if connected == 0 && failed > 0 {
        bail!("no relay could be connected");
    }
    Ok(())
}
