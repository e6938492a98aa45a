use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::{ActiveMonthlyContest, Candidate, WeeklyWinnerEntry};

/// A monthly contest rolls up this many weekly cycles
pub const MONTH_SPAN_WEEKS: u32 = 4;

/// Persisted document. Invariant: `week_no - last_monthly_week_no` stays in
/// `[0, 4)` except transiently while a due monthly contest is being opened;
/// consumption advances `last_monthly_week_no` by exactly 4.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RollupDoc {
    weekly: Vec<WeeklyWinnerEntry>,
    week_no: u32,
    last_monthly_week_no: u32,
    active: Option<ActiveMonthlyContest>,
}

/// Durable record of weekly winners awaiting the monthly rollup, plus the
/// descriptor of the currently running monthly contest.
pub struct MonthlyRollup {
    path: PathBuf,
    doc: RwLock<RollupDoc>,
}

impl MonthlyRollup {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let doc = super::load_or_default(&path);
        Self {
            path,
            doc: RwLock::new(doc),
        }
    }

    pub async fn week_no(&self) -> u32 {
        self.doc.read().await.week_no
    }

    pub async fn last_monthly_week_no(&self) -> u32 {
        self.doc.read().await.last_monthly_week_no
    }

    /// Close one weekly cycle: advance the week counter by exactly one and
    /// append an entry per winner (ties share the week number). Returns the
    /// new week number.
    pub async fn record_week(&self, winners: &[Candidate], now: DateTime<Utc>) -> u32 {
        let mut doc = self.doc.write().await;
        doc.week_no += 1;
        let week_no = doc.week_no;
        for winner in winners {
            doc.weekly.push(WeeklyWinnerEntry {
                author_id: winner.author_id,
                author_mention: winner.author_mention.clone(),
                image_url: winner.image_url.clone(),
                votes: winner.votes,
                week_no,
                created_at: now,
            });
        }
        super::persist_logged(&self.path, &*doc);
        week_no
    }

    /// Whether a monthly contest should open: none is running and a full
    /// block of four weeks has accumulated.
    pub async fn is_due(&self) -> bool {
        let doc = self.doc.read().await;
        doc.active.is_none() && doc.week_no - doc.last_monthly_week_no >= MONTH_SPAN_WEEKS
    }

    /// Consume the next unconsumed block of four weeks, returning its
    /// entries. `last_monthly_week_no` advances by exactly 4 regardless of
    /// how many winners tied in each week. Returns `None` when not due.
    pub async fn consume_due_block(&self) -> Option<Vec<WeeklyWinnerEntry>> {
        let mut doc = self.doc.write().await;
        if doc.active.is_some() || doc.week_no - doc.last_monthly_week_no < MONTH_SPAN_WEEKS {
            return None;
        }

        let from = doc.last_monthly_week_no;
        let to = from + MONTH_SPAN_WEEKS;
        let entries: Vec<WeeklyWinnerEntry> = doc
            .weekly
            .iter()
            .filter(|e| e.week_no > from && e.week_no <= to)
            .cloned()
            .collect();

        doc.last_monthly_week_no = to;
        super::persist_logged(&self.path, &*doc);
        Some(entries)
    }

    pub async fn active(&self) -> Option<ActiveMonthlyContest> {
        self.doc.read().await.active.clone()
    }

    pub async fn set_active(&self, contest: ActiveMonthlyContest) {
        let mut doc = self.doc.write().await;
        doc.active = Some(contest);
        super::persist_logged(&self.path, &*doc);
    }

    /// Mark the running monthly contest closed and drop its descriptor.
    pub async fn clear_active(&self) {
        let mut doc = self.doc.write().await;
        if let Some(active) = doc.active.as_mut() {
            active.closed = true;
        }
        doc.active = None;
        super::persist_logged(&self.path, &*doc);
    }
}
