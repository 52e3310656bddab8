mod common;

use wheelbot::commands;
use wheelbot::db::position_repo;
use wheelbot::models::Strategy;
use wheelbot::staging::StageOutcome;

use common::{harness, sample_draft};

#[tokio::test]
async fn affirmative_reply_commits_the_draft() {
    let h = harness().await;
    h.state.drafts.stage(7, sample_draft("AMD")).await;

    let reply = commands::text_reply(&h.state, 7, "yes").await.unwrap();
    let reply = reply.expect("a pending draft should produce a reply");
    assert!(reply.contains("position ID"), "got: {reply}");

    let open = position_repo::get_open_positions(&h.state.db, 7, None).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].ticker, "AMD");
    assert_eq!(open[0].strategy, Strategy::CashSecuredPut);

    assert!(h.state.drafts.peek(7).await.is_none(), "slot should be cleared");
}

#[tokio::test]
async fn negative_reply_discards_without_persisting() {
    let h = harness().await;
    h.state.drafts.stage(7, sample_draft("AMD")).await;

    let reply = commands::text_reply(&h.state, 7, "no").await.unwrap().unwrap();
    assert!(reply.contains("discarded"), "got: {reply}");

    let open = position_repo::get_open_positions(&h.state.db, 7, None).await.unwrap();
    assert!(open.is_empty());
    assert!(h.state.drafts.peek(7).await.is_none());
}

#[tokio::test]
async fn unclear_reply_keeps_the_draft_and_reprompts() {
    let h = harness().await;
    h.state.drafts.stage(7, sample_draft("AMD")).await;

    let reply = commands::text_reply(&h.state, 7, "maybe").await.unwrap().unwrap();
    assert!(reply.contains("pending trade draft"), "got: {reply}");

    assert!(h.state.drafts.peek(7).await.is_some(), "draft must survive an unclear reply");

    let open = position_repo::get_open_positions(&h.state.db, 7, None).await.unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn free_text_without_a_draft_is_ignored() {
    let h = harness().await;

    let reply = commands::text_reply(&h.state, 7, "yes").await.unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn drafts_are_owner_scoped() {
    let h = harness().await;
    h.state.drafts.stage(7, sample_draft("AMD")).await;

    // Owner 8 confirming does nothing to owner 7's draft.
    let reply = commands::text_reply(&h.state, 8, "yes").await.unwrap();
    assert!(reply.is_none());
    assert!(h.state.drafts.peek(7).await.is_some());
}

#[tokio::test]
async fn restaging_replaces_and_says_so() {
    let h = harness().await;

    h.extractor.load(sample_draft("AMD")).await;
    let first = commands::photo(&h.state, 7, b"fake image").await.unwrap();
    assert!(!first.contains("replaces"), "got: {first}");
    assert!(first.contains("AMD"));

    h.extractor.load(sample_draft("HOOD")).await;
    let second = commands::photo(&h.state, 7, b"fake image").await.unwrap();
    assert!(second.contains("replaces your earlier pending draft"), "got: {second}");

    let staged = h.state.drafts.peek(7).await.unwrap();
    assert_eq!(staged.ticker, "HOOD");
}

#[tokio::test]
async fn failed_extraction_is_a_user_visible_message() {
    let h = harness().await;

    // StubExtractor starts empty: extraction yields no draft.
    let reply = commands::photo(&h.state, 7, b"fake image").await.unwrap();
    assert!(reply.contains("Could not read a trade"), "got: {reply}");
    assert!(h.state.drafts.peek(7).await.is_none());
}

#[tokio::test]
async fn second_stage_outcome_is_replaced() {
    let h = harness().await;

    assert_eq!(h.state.drafts.stage(7, sample_draft("AMD")).await, StageOutcome::Fresh);
    assert_eq!(h.state.drafts.stage(7, sample_draft("HOOD")).await, StageOutcome::Replaced);
}
