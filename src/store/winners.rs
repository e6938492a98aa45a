use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::UserId;

/// Persisted document: two disjoint sets of past winners, serialized as
/// sorted arrays. Membership only gates future wins; it is never a ranking.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDoc {
    winners: BTreeSet<UserId>,
    monthly_winners: BTreeSet<UserId>,
}

/// Outcome of an administrative winner removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    NotAMember,
}

/// Durable record of who already won a weekly or monthly cycle
pub struct WinnerLedger {
    path: PathBuf,
    doc: RwLock<LedgerDoc>,
}

impl WinnerLedger {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let doc = super::load_or_default(&path);
        Self {
            path,
            doc: RwLock::new(doc),
        }
    }

    pub async fn weekly_winners(&self) -> BTreeSet<UserId> {
        self.doc.read().await.winners.clone()
    }

    pub async fn monthly_winners(&self) -> BTreeSet<UserId> {
        self.doc.read().await.monthly_winners.clone()
    }

    pub async fn add_weekly_winners(&self, users: &[UserId]) {
        let mut doc = self.doc.write().await;
        doc.winners.extend(users.iter().copied());
        super::persist_logged(&self.path, &*doc);
    }

    pub async fn add_monthly_winners(&self, users: &[UserId]) {
        let mut doc = self.doc.write().await;
        doc.monthly_winners.extend(users.iter().copied());
        super::persist_logged(&self.path, &*doc);
    }

    pub async fn remove_weekly_winner(&self, user: UserId) -> RemovalOutcome {
        let mut doc = self.doc.write().await;
        if doc.winners.remove(&user) {
            super::persist_logged(&self.path, &*doc);
            RemovalOutcome::Removed
        } else {
            RemovalOutcome::NotAMember
        }
    }

    pub async fn remove_monthly_winner(&self, user: UserId) -> RemovalOutcome {
        let mut doc = self.doc.write().await;
        if doc.monthly_winners.remove(&user) {
            super::persist_logged(&self.path, &*doc);
            RemovalOutcome::Removed
        } else {
            RemovalOutcome::NotAMember
        }
    }
}
