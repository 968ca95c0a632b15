//! mullctrl - Mullvad CLI Relay Rotation
//!
//! Drives an installed, logged-in Mullvad client through its CLI to
//! rotate across exit relays, and confirms each switch by asking an
//! external endpoint what the public IP looks like.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        MullControl                         │
//! │                                                            │
//! │  ┌───────────┐   ┌───────────────┐   ┌──────────────────┐  │
//! │  │  Catalog  │──▶│ RelaySelector │──▶│ connect sequence │  │
//! │  │ (parser)  │   │ (random pool) │   │  (5 CLI calls)   │  │
//! │  └─────▲─────┘   └───────────────┘   └────────┬─────────┘  │
//! │        │ relay list                           │ verify     │
//! └────────│──────────────────────────────────────│────────────┘
//!          │                                      ▼
//!   ┌──────┴───────┐                    ┌──────────────────┐
//!   │ mullvad CLI  │                    │ am.i.mullvad.net │
//!   │ (subprocess) │                    │   (HTTP probe)   │
//!   └──────────────┘                    └──────────────────┘
//! ```
//!
//! # Features
//!
//! - **Relay catalog**: parses `mullvad relay list` output
//! - **Sweeps**: every relay (or every relay of one country) exactly
//!   once, in random order
//! - **Verified connects**: the identity probe, not exit codes,
//!   decides whether a connect worked
//!
//! Everything is blocking and single-threaded.

mod account;
mod command;
mod config;
mod manager;
mod probe;
mod relay;
mod selection;

pub use account::AccountInfo;
pub use command::{CommandError, CommandRunner, MullvadCli};
pub use config::{ConfigError, ControlConfig, ProbeConfig, DEFAULT_PROBE_URL};
pub use manager::{ControlError, MullControl};
pub use probe::{
    Blacklist, BlacklistResult, HttpProber, IdentityProbe, IdentitySnapshot, ProbeError,
};
pub use relay::{Catalog, Relay, VpnType};
pub use selection::{RelaySelector, SelectionError, SelectionPool};
