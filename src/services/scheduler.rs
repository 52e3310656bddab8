use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::US::Eastern;
use chrono_tz::Tz;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use metrics::{counter, gauge};

use crate::db::position_repo;
use crate::services::review;
use crate::AppState;

/// Pacing between consecutive reviews in a batch run. A named limiter
/// rather than an inline sleep, so the policy is testable and visible.
pub type ReviewPacer = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub fn review_pacer(period: Duration) -> anyhow::Result<ReviewPacer> {
    let quota = Quota::with_period(period)
        .ok_or_else(|| anyhow::anyhow!("review pacing period must be non-zero"))?;
    Ok(RateLimiter::direct(quota))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub reviewed: usize,
    pub failed: usize,
}

/// Review every open position across all owners, strictly sequentially.
/// Each position is an independent unit of work: a failure is logged with
/// its context and the run continues.
pub async fn run_scheduled_review(state: &AppState, pacer: &ReviewPacer) -> RunStats {
    tracing::info!("Starting scheduled position review...");

    let positions = match position_repo::get_all_open_positions(&state.db).await {
        Ok(positions) => positions,
        Err(e) => {
            tracing::error!(error = %e, "Scheduled review: failed to enumerate open positions");
            return RunStats::default();
        }
    };

    gauge!("open_positions").set(positions.len() as f64);

    if positions.is_empty() {
        tracing::info!("No open positions to review.");
        return RunStats::default();
    }

    let mut stats = RunStats::default();

    for position in &positions {
        // Upstream providers are rate-limited; pace the batch.
        pacer.until_ready().await;

        match review::review_position(state, position).await {
            Ok(text) => {
                let message = format!(
                    "🔔 Scheduled Check: {} {}\n\n{text}",
                    position.ticker, position.strategy
                );
                state.sink.send(position.owner, &message).await;
                counter!("reviews_completed_total").increment(1);
                stats.reviewed += 1;
            }
            Err(e) => {
                counter!("reviews_failed_total").increment(1);
                stats.failed += 1;
                tracing::error!(
                    error = %e,
                    position_id = position.id,
                    owner = position.owner,
                    ticker = %position.ticker,
                    "Scheduled review failed for position — continuing"
                );
            }
        }
    }

    tracing::info!(reviewed = stats.reviewed, failed = stats.failed, "Scheduled review complete");
    stats
}

/// Next weekday trigger strictly after `after`, in the market timezone.
/// Weekends are skipped entirely.
pub fn next_trigger_after(after: DateTime<Tz>, times: &[NaiveTime]) -> Option<DateTime<Tz>> {
    if times.is_empty() {
        return None;
    }

    let mut sorted = times.to_vec();
    sorted.sort();

    for day_offset in 0..14 {
        let date = after.date_naive() + chrono::Duration::days(day_offset);
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        for &time in &sorted {
            let Some(candidate) = Eastern.from_local_datetime(&date.and_time(time)).earliest() else {
                continue;
            };
            if candidate > after {
                return Some(candidate);
            }
        }
    }

    None
}

/// Long-lived loop: sleep until the next weekday trigger, run the batch,
/// repeat.
pub async fn run_review_schedule(state: AppState, pacer: ReviewPacer) {
    let times = state.config.review_times.clone();
    if times.is_empty() {
        tracing::warn!("REVIEW_TIMES is empty — scheduled reviews disabled");
        return;
    }

    loop {
        let now = Utc::now().with_timezone(&Eastern);
        let Some(next) = next_trigger_after(now, &times) else {
            tracing::warn!("No upcoming review trigger could be computed — scheduler stopping");
            return;
        };

        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!(next = %next, "Next scheduled review");
        tokio::time::sleep(wait).await;

        run_scheduled_review(&state, &pacer).await;
    }
}
