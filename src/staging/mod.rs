use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::position_repo;
use crate::errors::AppError;
use crate::models::{OwnerId, StagedDraft};

pub const CONFIRM_PROMPT: &str = "Reply \"yes\" to save this trade or \"no\" to discard it.";

// ---------------------------------------------------------------------------
// Reply classification
// ---------------------------------------------------------------------------

/// Three-way classification of a free-text reply to a staged draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirm,
    Deny,
    Unclear,
}

const AFFIRM_WORDS: &[&str] = &["yes", "y", "yeah", "yep", "confirm", "ok", "okay", "save"];
const DENY_WORDS: &[&str] = &["no", "n", "nope", "cancel", "discard"];

/// Closed-vocabulary lookup. Anything outside both sets is Unclear.
pub fn classify_reply(text: &str) -> Reply {
    let word = text
        .trim()
        .trim_matches(|c: char| matches!(c, '.' | '!' | ','))
        .to_lowercase();
    if AFFIRM_WORDS.contains(&word.as_str()) {
        Reply::Affirm
    } else if DENY_WORDS.contains(&word.as_str()) {
        Reply::Deny
    } else {
        Reply::Unclear
    }
}

// ---------------------------------------------------------------------------
// DraftStore
// ---------------------------------------------------------------------------

/// Whether staging found the slot empty or replaced a pending draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Fresh,
    Replaced,
}

/// At most one staged draft per owner. Each owner's slot is its own async
/// mutex, held across classify-then-commit so a second message from the same
/// owner cannot observe or clear the draft mid-resolution.
#[derive(Debug, Default)]
pub struct DraftStore {
    slots: Mutex<HashMap<OwnerId, Arc<Mutex<Option<StagedDraft>>>>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, owner: OwnerId) -> Arc<Mutex<Option<StagedDraft>>> {
        self.slots
            .lock()
            .await
            .entry(owner)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Stage a draft, replacing any pending one. The replacement is reported,
    /// not silent.
    pub async fn stage(&self, owner: OwnerId, draft: StagedDraft) -> StageOutcome {
        let slot = self.slot(owner).await;
        let mut guard = slot.lock().await;
        let outcome = if guard.is_some() { StageOutcome::Replaced } else { StageOutcome::Fresh };
        *guard = Some(draft);
        outcome
    }

    /// Lock an owner's slot for a multi-step resolve sequence.
    pub async fn lock_slot(&self, owner: OwnerId) -> OwnedMutexGuard<Option<StagedDraft>> {
        self.slot(owner).await.lock_owned().await
    }

    /// Current staged draft, if any.
    pub async fn peek(&self, owner: OwnerId) -> Option<StagedDraft> {
        self.slot(owner).await.lock().await.clone()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Drive the staged-confirmation machine with a free-text reply. `Ok(None)`
/// means no draft was pending and the text is not ours to answer.
pub async fn handle_reply(
    pool: &SqlitePool,
    drafts: &DraftStore,
    owner: OwnerId,
    text: &str,
) -> Result<Option<String>, AppError> {
    let mut guard = drafts.lock_slot(owner).await;

    let Some(draft) = (*guard).clone() else {
        return Ok(None);
    };

    match classify_reply(text) {
        Reply::Affirm => {
            let position = position_repo::create(pool, draft.into_new_position(owner)).await?;
            guard.take();
            counter!("drafts_confirmed_total").increment(1);
            tracing::info!(owner, position_id = position.id, "Staged draft committed");
            Ok(Some(format!(
                "✅ Saved {} {} as position ID {}.",
                position.ticker, position.strategy, position.id
            )))
        }
        Reply::Deny => {
            guard.take();
            counter!("drafts_discarded_total").increment(1);
            tracing::info!(owner, "Staged draft discarded");
            Ok(Some("🗑 Draft discarded — nothing was saved.".into()))
        }
        Reply::Unclear => Ok(Some(format!(
            "You have a pending trade draft. {CONFIRM_PROMPT}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_vocabulary() {
        for word in ["yes", "Y", "confirm", "OK", "yep."] {
            assert_eq!(classify_reply(word), Reply::Affirm, "{word}");
        }
    }

    #[test]
    fn negative_vocabulary() {
        for word in ["no", "N", "cancel", "Nope!"] {
            assert_eq!(classify_reply(word), Reply::Deny, "{word}");
        }
    }

    #[test]
    fn everything_else_is_unclear() {
        for text in ["maybe", "yes please save it", "", "what is this"] {
            assert_eq!(classify_reply(text), Reply::Unclear, "{text:?}");
        }
    }
}
