//! Property tests for relay listing parsing and sweep selection.

use mullctrl::{Catalog, RelaySelector, SelectionError, VpnType};
use proptest::prelude::*;
use std::collections::HashSet;

/// Build a listing with `cities` cities of `per_city` relays each in
/// every country code given.
fn listing(countries: &[String], cities: usize, per_city: usize) -> String {
    let mut out = String::new();
    for cc in countries {
        out.push_str(&format!("Country {} ({})\n", cc.to_uppercase(), cc));
        for c in 0..cities {
            out.push_str(&format!("\tCity {} (c{})\n", c, c));
            for r in 0..per_city {
                let proto = if r % 2 == 0 { "OpenVPN" } else { "WireGuard" };
                out.push_str(&format!(
                    "\t\t{}-c{}-{:03} (10.{}.{}.1) - {}\n",
                    cc, c, r, c, r, proto
                ));
            }
        }
        out.push('\n');
    }
    out
}

fn country_codes() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{2}", 1..5).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #[test]
    fn parse_yields_every_relay_in_order(
        countries in country_codes(),
        cities in 1usize..4,
        per_city in 0usize..6,
    ) {
        let catalog = Catalog::parse(&listing(&countries, cities, per_city));

        prop_assert_eq!(catalog.len(), countries.len() * cities * per_city);
        prop_assert_eq!(catalog.fallbacks(), 0);

        let mut expected = Vec::new();
        for cc in &countries {
            for c in 0..cities {
                for r in 0..per_city {
                    expected.push(format!("{}-c{}-{:03}", cc, c, r));
                }
            }
        }
        let servers: Vec<_> = catalog.relays().iter().map(|r| r.server.clone()).collect();
        prop_assert_eq!(servers, expected);

        for relay in catalog.relays() {
            let index: usize = relay.server.rsplit('-').next().unwrap().parse().unwrap();
            let expected_type = if index % 2 == 0 { VpnType::OpenVpn } else { VpnType::WireGuard };
            prop_assert_eq!(relay.vpn_type, expected_type);
            prop_assert!(relay.server.starts_with(&relay.country_short));
        }
    }

    #[test]
    fn sweep_visits_each_relay_once(
        countries in country_codes(),
        per_city in 1usize..8,
        seed in any::<u64>(),
    ) {
        let catalog = Catalog::parse(&listing(&countries, 2, per_city));
        let mut selector = RelaySelector::seeded(seed);
        selector.populate(&catalog, None).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..catalog.len() {
            let relay = selector.next_relay().unwrap();
            prop_assert!(catalog.find(&relay.server).is_some());
            prop_assert!(seen.insert(relay.server));
        }
        prop_assert_eq!(selector.next_relay(), Err(SelectionError::EmptyPool));
    }

    #[test]
    fn filtered_sweep_stays_in_country(
        countries in country_codes(),
        per_city in 1usize..5,
        seed in any::<u64>(),
    ) {
        let catalog = Catalog::parse(&listing(&countries, 2, per_city));
        let target = countries[0].clone();
        let mut selector = RelaySelector::seeded(seed);
        selector.populate(&catalog, Some(&target)).unwrap();

        let mut drawn = 0;
        while let Ok(relay) = selector.next_relay() {
            prop_assert_eq!(&relay.country_short, &target);
            drawn += 1;
        }
        prop_assert_eq!(drawn, 2 * per_city);

        selector.reset(&catalog);
        prop_assert_eq!(selector.remaining(), Some(catalog.len()));
    }
}
