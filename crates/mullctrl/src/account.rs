//! Account details from `mullvad account get`

use serde::Serialize;

/// Account number and expiry as printed by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub account: String,
    pub expiry: String,
}

impl AccountInfo {
    /// Parse the first two `label: value` lines
    ///
    /// Returns `None` when either line or its colon is missing.
    pub fn parse(output: &str) -> Option<Self> {
        let mut lines = output.lines();
        let account = lines.next()?.split_once(':')?.1.trim().to_string();
        // Expiry keeps its own colons ("2025-01-01 12:00:00 UTC")
        let expiry = lines.next()?.split_once(':')?.1.trim().to_string();
        Some(Self { account, expiry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let info = AccountInfo::parse(
            "Mullvad account: 1234567890123456\nExpires at     : 2025-03-01 10:15:30 UTC\n",
        )
        .unwrap();

        assert_eq!(info.account, "1234567890123456");
        assert_eq!(info.expiry, "2025-03-01 10:15:30 UTC");
    }

    #[test]
    fn test_parse_incomplete() {
        assert!(AccountInfo::parse("").is_none());
        assert!(AccountInfo::parse("Mullvad account: 1\n").is_none());
        assert!(AccountInfo::parse("no colon here\nExpires: x").is_none());
    }
}
