//! Recurring phase transitions.
//!
//! Two long-lived tasks: the weekly loop fires the announce / voting-open /
//! voting-close transitions at their configured local times, and the
//! monthly watcher closes the monthly contest when its deadline passes.
//! Both recompute everything from `now` on every iteration, so a restart
//! never drifts and a missed wall-clock wait is simply recomputed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, LocalResult, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::config::WeeklySlot;
use crate::contest::ContestState;

/// How often the monthly watcher re-checks when no contest is running
const MONTHLY_POLL: Duration = Duration::from_secs(60);

/// Next timestamp strictly after `now` matching the weekday/hour/minute in
/// the given time zone. When this week's slot has already passed (or is
/// exactly now), the result is exactly one week out.
pub fn next_occurrence(
    now: DateTime<Utc>,
    tz: Tz,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> DateTime<Utc> {
    let local_now = now.with_timezone(&tz);
    let days_ahead =
        (7 + weekday.num_days_from_monday() - local_now.weekday().num_days_from_monday()) % 7;
    let date = local_now
        .date_naive()
        .checked_add_days(Days::new(days_ahead as u64))
        .expect("date in range");

    let candidate = local_instant(tz, date, hour, minute);
    if candidate <= now {
        let next_week = date.checked_add_days(Days::new(7)).expect("date in range");
        local_instant(tz, next_week, hour, minute)
    } else {
        candidate
    }
}

/// Resolve a local wall-clock time to an instant, taking the earliest
/// interpretation across DST folds and skipping forward over DST gaps.
fn local_instant(tz: Tz, date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let naive = date
        .and_hms_opt(hour, minute, 0)
        .expect("validated hour/minute");

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Inside a spring-forward gap; the hour after is always valid
            let shifted = naive + chrono::Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
                LocalResult::None => tz
                    .from_utc_datetime(&naive)
                    .with_timezone(&Utc),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeeklyEvent {
    Announce,
    OpenVoting,
    CloseVoting,
}

fn next_event(now: DateTime<Utc>, tz: Tz, slots: &[(WeeklyEvent, WeeklySlot)]) -> (WeeklyEvent, DateTime<Utc>) {
    slots
        .iter()
        .map(|(event, slot)| {
            (
                *event,
                next_occurrence(now, tz, slot.weekday, slot.hour, slot.minute),
            )
        })
        .min_by_key(|(_, at)| *at)
        .expect("at least one slot")
}

/// Spawn the weekly cadence loop. Each iteration recomputes the three next
/// transition times from the current instant, sleeps until the earliest and
/// fires it; a failing transition is logged and the loop keeps going.
pub fn spawn_weekly_scheduler(state: Arc<ContestState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if state.config.test_mode {
            run_test_cycle(state).await;
            return;
        }

        let tz = state.config.timezone;
        let slots = [
            (WeeklyEvent::Announce, state.config.announce),
            (WeeklyEvent::OpenVoting, state.config.voting_open),
            (WeeklyEvent::CloseVoting, state.config.voting_close),
        ];

        loop {
            let now = Utc::now();
            let (event, at) = next_event(now, tz, &slots);
            let wait = (at - now).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(?event, %at, "next weekly transition");
            tokio::time::sleep(wait).await;

            dispatch(&state, event).await;
        }
    })
}

async fn dispatch(state: &ContestState, event: WeeklyEvent) {
    let result = match event {
        WeeklyEvent::Announce => state.open_submission_window().await,
        WeeklyEvent::OpenVoting => state.open_voting().await.map(|outcome| {
            tracing::info!(?outcome, "voting open transition done");
        }),
        WeeklyEvent::CloseVoting => state.close_voting_and_announce().await.map(|outcome| {
            tracing::info!(?outcome, "weekly close transition done");
        }),
    };

    if let Err(e) = result {
        tracing::error!(?event, "weekly transition failed: {e}");
    }
}

/// Test mode: run the whole cycle back-to-back with a fixed wait between
/// transitions instead of the weekly cadence.
async fn run_test_cycle(state: Arc<ContestState>) {
    let wait = state.config.test_wait;
    tracing::warn!(?wait, "test mode: cycling through all transitions");

    loop {
        for event in [
            WeeklyEvent::Announce,
            WeeklyEvent::OpenVoting,
            WeeklyEvent::CloseVoting,
        ] {
            tokio::time::sleep(wait).await;
            dispatch(&state, event).await;
        }
    }
}

/// Spawn the monthly close watcher. While a contest is running it sleeps
/// toward `ends_at` and closes it; after a restart an overdue contest is
/// closed immediately. With no contest running it re-checks periodically.
pub fn spawn_monthly_close_watcher(state: Arc<ContestState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !state.config.monthly_enabled {
            tracing::info!("monthly contest disabled; close watcher idle");
            // Park instead of returning so the supervisor doesn't treat
            // this as a crashed task
            std::future::pending::<()>().await;
        }

        loop {
            let active = match state.rollup.active().await {
                Some(active) if !active.closed => active,
                _ => {
                    tokio::time::sleep(MONTHLY_POLL).await;
                    continue;
                }
            };

            let now = Utc::now();
            if active.ends_at > now {
                let wait = (active.ends_at - now).to_std().unwrap_or(Duration::ZERO);
                tracing::info!(ends_at = %active.ends_at, "monthly contest closes later");
                tokio::time::sleep(wait).await;
            }

            match state.close_monthly_contest().await {
                Ok(outcome) => tracing::info!(?outcome, "monthly close done"),
                Err(e) => {
                    tracing::error!("monthly close failed: {e}");
                    tokio::time::sleep(MONTHLY_POLL).await;
                }
            }
        }
    })
}
