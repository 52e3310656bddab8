mod common;

use std::time::Duration;

use wheelbot::ai::client::AiReply;
use wheelbot::errors::AppError;
use wheelbot::services::scheduler::{review_pacer, run_scheduled_review, RunStats};

use common::{harness, seed_position};

fn quick_pacer() -> wheelbot::services::scheduler::ReviewPacer {
    review_pacer(Duration::from_millis(5)).expect("nonzero pacing period")
}

#[tokio::test]
async fn a_failing_position_does_not_stop_the_run() {
    let h = harness().await;
    let first = seed_position(&h.state.db, 1, "SOFI").await;
    let _second = seed_position(&h.state.db, 2, "HOOD").await;
    let third = seed_position(&h.state.db, 3, "AMD").await;

    // Position order is creation order; fail the middle one.
    h.ai.push(Ok(AiReply { text: "Hold SOFI.".into(), citations: Vec::new() })).await;
    h.ai.push(Err(AppError::Persistence("simulated storage failure".into()))).await;
    h.ai.push(Ok(AiReply { text: "Hold AMD.".into(), citations: Vec::new() })).await;

    let stats = run_scheduled_review(&h.state, &quick_pacer()).await;

    assert_eq!(stats, RunStats { reviewed: 2, failed: 1 });

    let messages = h.sink.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].0, first.owner);
    assert!(messages[0].1.contains("Scheduled Check: SOFI"));
    assert_eq!(messages[1].0, third.owner);
    assert!(messages[1].1.contains("Scheduled Check: AMD"));
}

#[tokio::test]
async fn every_owner_gets_their_own_delivery() {
    let h = harness().await;
    seed_position(&h.state.db, 1, "SOFI").await;
    seed_position(&h.state.db, 2, "HOOD").await;

    let stats = run_scheduled_review(&h.state, &quick_pacer()).await;
    assert_eq!(stats, RunStats { reviewed: 2, failed: 0 });

    let owners: Vec<i64> = h.sink.messages().await.iter().map(|(o, _)| *o).collect();
    assert_eq!(owners, vec![1, 2]);
}

#[tokio::test]
async fn empty_store_is_a_quiet_run() {
    let h = harness().await;

    let stats = run_scheduled_review(&h.state, &quick_pacer()).await;

    assert_eq!(stats, RunStats::default());
    assert!(h.sink.messages().await.is_empty());
    assert_eq!(h.ai.call_count().await, 0);
}

#[tokio::test]
async fn closed_positions_are_not_reviewed() {
    let h = harness().await;
    let position = seed_position(&h.state.db, 1, "SOFI").await;
    seed_position(&h.state.db, 1, "HOOD").await;

    wheelbot::db::position_repo::close_position(
        &h.state.db,
        position.id,
        1,
        common::date(2025, 7, 20),
    )
    .await
    .unwrap();

    let stats = run_scheduled_review(&h.state, &quick_pacer()).await;

    assert_eq!(stats, RunStats { reviewed: 1, failed: 0 });
    let messages = h.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("HOOD"));
}
