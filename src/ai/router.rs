use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::OwnerId;

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// The closed set of reasoning providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    /// Search-grounded reasoning. Default, and pinned for scan/manage.
    Gemini,
    OpenAi,
    /// Social/web-search specialist. Pinned for sentiment.
    Grok,
}

impl Provider {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "openai" => Some(Provider::OpenAi),
            "grok" => Some(Provider::Grok),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::Grok => "grok",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// Boundary commands, as far as routing cares about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Scan,
    Sentiment,
    Manage,
    ManageId,
    Open,
    Positions,
    Edit,
    Close,
    SetProvider,
    Photo,
    Reply,
}

// ---------------------------------------------------------------------------
// PreferenceStore
// ---------------------------------------------------------------------------

/// Owner → preferred provider. Volatile process state, injected rather than
/// global; no history, last write wins.
#[derive(Debug, Default)]
pub struct PreferenceStore {
    prefs: Mutex<HashMap<OwnerId, Provider>>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, owner: OwnerId, provider: Provider) {
        self.prefs.lock().await.insert(owner, provider);
    }

    pub async fn get(&self, owner: OwnerId) -> Option<Provider> {
        self.prefs.lock().await.get(&owner).copied()
    }
}

/// Intent-first routing policy: sentiment is always Grok, scan and manage
/// always Gemini, everything else falls back to the owner's preference.
pub async fn resolve_provider(prefs: &PreferenceStore, owner: OwnerId, intent: Intent) -> Provider {
    match intent {
        Intent::Sentiment => Provider::Grok,
        Intent::Scan | Intent::Manage | Intent::ManageId => Provider::Gemini,
        _ => prefs.get(owner).await.unwrap_or(Provider::Gemini),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sentiment_always_routes_to_grok() {
        let prefs = PreferenceStore::new();
        prefs.set(7, Provider::OpenAi).await;
        assert_eq!(resolve_provider(&prefs, 7, Intent::Sentiment).await, Provider::Grok);
    }

    #[tokio::test]
    async fn manage_and_scan_ignore_preference() {
        let prefs = PreferenceStore::new();
        prefs.set(7, Provider::Grok).await;
        assert_eq!(resolve_provider(&prefs, 7, Intent::Scan).await, Provider::Gemini);
        assert_eq!(resolve_provider(&prefs, 7, Intent::Manage).await, Provider::Gemini);
        assert_eq!(resolve_provider(&prefs, 7, Intent::ManageId).await, Provider::Gemini);
    }

    #[tokio::test]
    async fn other_intents_use_preference_with_gemini_default() {
        let prefs = PreferenceStore::new();
        assert_eq!(resolve_provider(&prefs, 7, Intent::Open).await, Provider::Gemini);

        prefs.set(7, Provider::OpenAi).await;
        assert_eq!(resolve_provider(&prefs, 7, Intent::Open).await, Provider::OpenAi);
    }

    #[test]
    fn provider_names_are_a_closed_set() {
        assert_eq!(Provider::from_name("Grok"), Some(Provider::Grok));
        assert_eq!(Provider::from_name("claude"), None);
    }
}
