//! Runtime configuration for fleet-ingest
//!
//! Typed forms of the `[import]` TOML section. Defaults are the built-in
//! reconciliation rules, so `MatchPolicy::default()` is what every caller
//! without a config file gets.

use fleet_common::config::ImportSettings;

/// Thresholds used by the duplicate detector and the fragment grouper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    /// Max relative purchase-price difference for a registry potential match
    pub price_tolerance: f64,
    /// Max purchase-date distance for a registry potential match
    pub registry_date_window_days: i64,
    /// Max purchase-date distance for two fragments of one batch
    pub fragment_date_window_days: i64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            price_tolerance: 0.10,
            registry_date_window_days: 30,
            fragment_date_window_days: 60,
        }
    }
}

impl From<&ImportSettings> for MatchPolicy {
    fn from(settings: &ImportSettings) -> Self {
        Self {
            price_tolerance: settings.price_tolerance,
            registry_date_window_days: settings.registry_date_window_days,
            fragment_date_window_days: settings.fragment_date_window_days,
        }
    }
}

/// Switches for a commit run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOptions {
    /// Run the document pass after assets and attachments
    pub attach_documents: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            attach_documents: true,
        }
    }
}

impl From<&ImportSettings> for CommitOptions {
    fn from(settings: &ImportSettings) -> Self {
        Self {
            attach_documents: settings.attach_documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_import_settings_defaults() {
        let settings = ImportSettings::default();
        assert_eq!(MatchPolicy::from(&settings), MatchPolicy::default());
        assert_eq!(CommitOptions::from(&settings), CommitOptions::default());
    }
}
