//! Key→value routing tables with a named default.
//!
//! The payment-type and debit-account rules are data, not code: each is a
//! [`LookupTable`] that can be extended from a config file when a new bank or
//! branch shows up.

use serde::{Deserialize, Serialize};

/// How a table key is compared against the input value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Value equals the key exactly (case-sensitive).
    #[default]
    Exact,
    /// Value contains the key, ignoring case.
    ContainsIgnoreCase,
}

/// A single table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub key: String,
    pub value: String,
}

/// Ordered lookup table. First matching entry wins, else `default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTable {
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub entries: Vec<LookupEntry>,
    pub default: String,
}

impl LookupTable {
    pub fn new(match_mode: MatchMode, default: impl Into<String>) -> Self {
        Self {
            match_mode,
            entries: Vec::new(),
            default: default.into(),
        }
    }

    /// Builder-style entry append.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push(LookupEntry {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Resolve `input` to a value.
    pub fn resolve(&self, input: &str) -> &str {
        self.find(input).unwrap_or(&self.default)
    }

    /// Matching entry value, if any.
    pub fn find(&self, input: &str) -> Option<&str> {
        match self.match_mode {
            MatchMode::Exact => self
                .entries
                .iter()
                .find(|e| e.key == input)
                .map(|e| e.value.as_str()),
            MatchMode::ContainsIgnoreCase => {
                let haystack = input.to_uppercase();
                self.entries
                    .iter()
                    .find(|e| haystack.contains(&e.key.to_uppercase()))
                    .map(|e| e.value.as_str())
            }
        }
    }
}

/// Bank name → payment instrument. Kotak accounts use internal funds transfer.
pub fn default_payment_type_table() -> LookupTable {
    LookupTable::new(MatchMode::ContainsIgnoreCase, "NEFT").with_entry("KOTAK", "IFT")
}

/// Branch → company debit account.
pub fn default_debit_account_table() -> LookupTable {
    LookupTable::new(MatchMode::Exact, "6550063526").with_entry("UP Phase 3", "6550063533")
}
