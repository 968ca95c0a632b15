//! Relay Catalog
//!
//! Parses the hierarchical listing printed by `mullvad relay list`
//! into a flat, ordered list of relays.
//!
//! # Format
//!
//! ```text
//! Sweden (se)
//! 	Gothenburg (got) @ 57.70887°N, 11.97456°E
//! 		se-got-001 (1.2.3.4) - OpenVPN, hosted by 31173 (owned)
//! 		se-got-wg-001 (1.2.3.5, 2a03:1b20::a01f) - WireGuard
//! ```
//!
//! - Unindented lines name a country
//! - Lines indented by one tab name a city
//! - Lines indented by two or more tabs describe a relay
//!
//! Malformed lines never fail the parse. A missing `(...)` group
//! falls back to the whole trimmed line, and every such fallback is
//! counted in [`Catalog::fallbacks`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Tunnel protocol a relay speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VpnType {
    OpenVpn,
    WireGuard,
}

impl VpnType {
    /// Infer the protocol from a relay line
    ///
    /// Any case-insensitive occurrence of `openvpn` selects OpenVPN,
    /// everything else is WireGuard.
    pub fn infer(line: &str) -> Self {
        if line.to_lowercase().contains("openvpn") {
            VpnType::OpenVpn
        } else {
            VpnType::WireGuard
        }
    }

    /// Argument form accepted by `relay set tunnel`
    pub fn as_str(&self) -> &'static str {
        match self {
            VpnType::OpenVpn => "openvpn",
            VpnType::WireGuard => "wireguard",
        }
    }
}

impl std::fmt::Display for VpnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One connectable exit relay
///
/// Two relays are equal when their server identifiers are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relay {
    /// Country name ("Sweden")
    pub country: String,
    /// Country code ("se")
    pub country_short: String,
    /// City name ("Gothenburg")
    pub city: String,
    /// City code ("got")
    pub city_short: String,
    /// Server identifier ("se-got-001")
    pub server: String,
    /// Address text as printed by the client
    pub ip: String,
    /// Tunnel protocol
    pub vpn_type: VpnType,
}

impl PartialEq for Relay {
    fn eq(&self, other: &Self) -> bool {
        self.server == other.server
    }
}

impl Eq for Relay {}

impl std::hash::Hash for Relay {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.server.hash(state);
    }
}

impl std::fmt::Display for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {}) [{}]",
            self.server, self.city, self.country, self.vpn_type
        )
    }
}

/// Relays parsed from one listing snapshot
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    relays: Vec<Relay>,
    fallbacks: usize,
}

impl Catalog {
    /// Parse a relay listing
    pub fn parse(listing: &str) -> Self {
        let mut relays = Vec::new();
        let mut fallbacks = 0;
        let mut country = "";
        let mut city = "";

        for line in listing.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with("\t\t") {
                let trimmed = line.trim();
                let (country_short, c1) = first_parenthesized(country);
                let (city_short, c2) = first_parenthesized(city);
                let (ip, c3) = first_parenthesized(trimmed);
                fallbacks += [c1, c2, c3].iter().filter(|f| **f).count();

                relays.push(Relay {
                    country: name_part(country).to_string(),
                    country_short,
                    city: name_part(city).to_string(),
                    city_short,
                    server: name_part(trimmed).to_string(),
                    ip,
                    vpn_type: VpnType::infer(line),
                });
            } else if line.starts_with('\t') {
                city = line.trim();
            } else {
                country = line.trim();
            }
        }

        if fallbacks > 0 {
            debug!("Relay listing used {} parenthesis fallbacks", fallbacks);
        }
        info!("Parsed relay catalog: {} relays", relays.len());

        Self { relays, fallbacks }
    }

    /// All relays in listing order
    pub fn relays(&self) -> &[Relay] {
        &self.relays
    }

    /// Number of relays
    pub fn len(&self) -> usize {
        self.relays.len()
    }

    /// Is the catalog empty?
    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// How many fields fell back to the whole line text
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Find a relay by server identifier
    pub fn find(&self, server: &str) -> Option<&Relay> {
        self.relays.iter().find(|r| r.server == server)
    }

    /// Relays whose country code matches `country_short`
    pub fn in_country<'a>(&'a self, country_short: &'a str) -> impl Iterator<Item = &'a Relay> {
        self.relays
            .iter()
            .filter(move |r| r.country_short == country_short)
    }

    /// Relay count per country code
    pub fn countries(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for relay in &self.relays {
            *counts.entry(relay.country_short.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Text before the first `(`, trimmed
fn name_part(s: &str) -> &str {
    s.split('(').next().unwrap_or("").trim()
}

/// Contents of the first non-empty `(...)` group
///
/// Returns the whole trimmed input and `true` when no group exists.
fn first_parenthesized(s: &str) -> (String, bool) {
    for (open, _) in s.match_indices('(') {
        let rest = &s[open + 1..];
        if let Some(close) = rest.find(')') {
            if close > 0 {
                let inner = rest[..close].replace('(', "");
                return (inner.trim().to_string(), false);
            }
        }
    }
    (s.trim().to_string(), true)
}
