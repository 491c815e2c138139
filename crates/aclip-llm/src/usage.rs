//! Token accounting.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Tokens consumed by a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Rough character-based estimate for providers that omit usage data.
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        Self {
            prompt_tokens: (prompt.chars().count() / 4) as u64,
            completion_tokens: (completion.chars().count() / 4) as u64,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
        }
    }
}

/// Accumulated usage per project, shared across a pipeline run's concurrent
/// stage calls.
#[derive(Debug, Default)]
pub struct TokenLedger {
    totals: Mutex<HashMap<String, TokenUsage>>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call's usage against a project.
    pub fn record(&self, project_id: &str, usage: TokenUsage) {
        let mut totals = self.totals.lock().expect("token ledger poisoned");
        let entry = totals.entry(project_id.to_string()).or_default();
        *entry = *entry + usage;
    }

    /// Total usage recorded for a project.
    pub fn project_total(&self, project_id: &str) -> TokenUsage {
        self.totals
            .lock()
            .expect("token ledger poisoned")
            .get(project_id)
            .copied()
            .unwrap_or_default()
    }

    /// Drop a project's records (called on project deletion).
    pub fn forget(&self, project_id: &str) {
        self.totals
            .lock()
            .expect("token ledger poisoned")
            .remove(project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate() {
        let u = TokenUsage::estimate("12345678", "1234");
        assert_eq!(u.prompt_tokens, 2);
        assert_eq!(u.completion_tokens, 1);
    }

    #[test]
    fn test_ledger_accumulates() {
        let ledger = TokenLedger::new();
        ledger.record("p1", TokenUsage::new(10, 5));
        ledger.record("p1", TokenUsage::new(2, 3));
        ledger.record("p2", TokenUsage::new(1, 1));

        assert_eq!(ledger.project_total("p1").total(), 20);
        assert_eq!(ledger.project_total("p2").total(), 2);

        ledger.forget("p1");
        assert_eq!(ledger.project_total("p1").total(), 0);
    }
}
