use crate::e2e::helpers;

use audiobook_batcher::domain::engine::{RunControl, RunOutcome};
use audiobook_batcher::domain::synthesis::SynthesisError;
use helpers::fixtures::{book, document};
use helpers::mock_tts::MockTts;
use helpers::TestContext;
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_not_found_for_unknown_document(ctx: &TestContext) {
    let response = ctx.client.get("/api/documents/unknown/progress").await.unwrap();

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_message("No checkpoint for document 'unknown'");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_invalid_document_ids(ctx: &TestContext) {
    let response = ctx.client.get("/api/documents/My%20Book/progress").await.unwrap();

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_progress_of_a_completed_document(ctx: &TestContext) {
    let text = book(3, 4, 6);
    let engine = ctx.engine(Arc::new(MockTts::new()));
    let (chunks, plan) = engine.plan(&text).unwrap();
    engine
        .run(&document(), &text, &RunControl::new())
        .await
        .unwrap();

    let response = ctx.client.get("/api/documents/lighthouse/progress").await.unwrap();
    response.assert_status(StatusCode::OK);
    let body: Value = response.json().unwrap();

    assert_eq!(body["document_id"], "lighthouse");
    assert_eq!(body["run_date"], "2024-06-01");
    assert_eq!(body["processed_chunks"], chunks.len());
    assert_eq!(body["total_chunks"], chunks.len());
    assert_eq!(body["total_batches"], plan.total_batches());
    assert_eq!(body["completed_batches"], plan.len());
    assert_eq!(body["percent_complete"], 100.0);
    assert_eq!(body["is_complete"], true);
    assert_eq!(body["next_batch"], Value::Null);

    let batches = body["batches"].as_array().unwrap();
    assert_eq!(batches.len(), plan.len());
    assert!(batches.iter().all(|b| b["status"] == "completed"));
    assert_eq!(batches[0]["first_position"]["page"], 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_show_the_failed_batch_after_a_provider_error(ctx: &TestContext) {
    let text = book(3, 4, 6);
    let probe = ctx.engine(Arc::new(MockTts::new()));
    let (chunks, plan) = probe.plan(&text).unwrap();
    assert!(plan.len() >= 3, "fixture should span several batches");

    let second = plan.get(2).unwrap();
    let failing = chunks[second.first_chunk()].spoken().to_string();
    let tts = Arc::new(MockTts::new().failing(
        &failing,
        u32::MAX,
        SynthesisError::Permanent("voice not available".to_string()),
    ));
    ctx.engine(tts)
        .run(&document(), &text, &RunControl::new())
        .await
        .unwrap_err();

    let response = ctx.client.get("/api/documents/lighthouse/progress").await.unwrap();
    response.assert_status(StatusCode::OK);
    let body: Value = response.json().unwrap();

    assert_eq!(body["processed_chunks"], plan.get(1).unwrap().chunk_count());
    assert_eq!(body["last_completed_batch"], 1);
    assert_eq!(body["next_batch"], 2);
    assert_eq!(body["is_complete"], false);
    assert_eq!(body["batches"][0]["status"], "completed");
    assert_eq!(body["batches"][1]["status"], "failed");
    assert_eq!(body["batches"][2]["status"], "pending");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_serve_the_manifest_in_batch_order(ctx: &TestContext) {
    let text = book(2, 3, 5);
    let control = RunControl::new();
    let engine = ctx.engine(Arc::new(MockTts::new()));
    let (_, plan) = engine.plan(&text).unwrap();

    let response = ctx.client.get("/api/documents/lighthouse/manifest").await.unwrap();
    response.assert_status(StatusCode::NOT_FOUND);

    let report = engine.run(&document(), &text, &control).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);

    let response = ctx.client.get("/api/documents/lighthouse/manifest").await.unwrap();
    response.assert_status(StatusCode::OK);
    let body: Value = response.json().unwrap();

    let indices: Vec<u64> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["batch_index"].as_u64().unwrap())
        .collect();
    let expected: Vec<u64> = (1..=plan.total_batches() as u64).collect();
    assert_eq!(indices, expected);
    assert_eq!(
        body["entries"][0]["audio_file"],
        "lighthouse_20240601_batch_001.wav"
    );
}
