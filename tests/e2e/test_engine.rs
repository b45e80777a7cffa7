use crate::e2e::helpers;

use audiobook_batcher::domain::engine::{EngineError, RunControl, RunOutcome};
use audiobook_batcher::domain::synthesis::SynthesisError;
use helpers::fixtures::{book, document};
use helpers::mock_tts::{MockTts, MOCK_SAMPLE_RATE};
use helpers::TestContext;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use test_context::test_context;

fn batch_stem(index: u32) -> String {
    format!("lighthouse_20240601_batch_{:03}", index)
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_write_one_wav_and_metadata_file_per_batch(ctx: &TestContext) {
    let text = book(3, 4, 6);
    let engine = ctx.engine(Arc::new(MockTts::new()));
    let (chunks, plan) = engine.plan(&text).unwrap();

    let report = engine
        .run(&document(), &text, &RunControl::new())
        .await
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.processed_chunks, chunks.len());

    let dir = ctx.document_dir();
    for file in ["checkpoint.json", "plan.json", "manifest.json", "playlist.m3u"] {
        assert!(dir.join(file).exists(), "{file} missing");
    }

    for batch in plan.iter() {
        let stem = batch_stem(batch.index);
        let reader = hound::WavReader::open(dir.join(format!("{stem}.wav"))).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, MOCK_SAMPLE_RATE);

        let expected: usize = chunks[batch.chunks.clone()]
            .iter()
            .map(|c| MockTts::expected_samples(c.spoken()))
            .sum();
        assert_eq!(reader.len() as usize, expected, "batch {}", batch.index);

        let metadata: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.join(format!("{stem}.json"))).unwrap())
                .unwrap();
        assert_eq!(metadata["chunk_count"], batch.chunk_count());
        assert_eq!(metadata["first_chunk"], batch.first_chunk());
        assert_eq!(metadata["last_chunk"], batch.last_chunk());
        assert!(!dir.join(format!("{stem}_chunks")).exists());
    }

    let playlist = std::fs::read_to_string(dir.join("playlist.m3u")).unwrap();
    assert!(playlist.starts_with("#EXTM3U\n"));
    assert_eq!(playlist.matches("#EXTINF:").count(), plan.len());
    assert!(playlist.contains(&format!("{}.wav", batch_stem(1))));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_chunk_audio_when_requested(ctx: &TestContext) {
    let text = book(1, 2, 3);
    let engine = ctx.engine_with(Arc::new(MockTts::new()), true, 1);
    let (chunks, _) = engine.plan(&text).unwrap();

    engine
        .run(&document(), &text, &RunControl::new())
        .await
        .unwrap();

    let chunk_dir = ctx.document_dir().join(format!("{}_chunks", batch_stem(1)));
    for chunk in &chunks {
        let path = chunk_dir.join(format!("chunk_{:04}.wav", chunk.index));
        assert!(path.exists(), "{} missing", path.display());
    }
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_resume_after_a_failure_without_redoing_completed_batches(ctx: &TestContext) {
    let text = book(3, 4, 6);
    let probe = ctx.engine(Arc::new(MockTts::new()));
    let (chunks, plan) = probe.plan(&text).unwrap();

    let third = plan.get(3).unwrap();
    let failing = chunks[third.last_chunk()].spoken().to_string();
    let flaky = Arc::new(MockTts::new().failing(
        &failing,
        u32::MAX,
        SynthesisError::Transient("service unavailable".to_string()),
    ));

    let err = ctx
        .engine(flaky.clone())
        .run(&document(), &text, &RunControl::new())
        .await
        .unwrap_err();
    match &err {
        EngineError::BatchFailed {
            batch_index,
            chunk_index,
            attempts,
            ..
        } => {
            assert_eq!(*batch_index, 3);
            assert_eq!(*chunk_index, third.last_chunk());
            assert_eq!(*attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.last_completed_batch(), Some(2));
    assert_eq!(err.total_batches(), Some(plan.total_batches()));

    let first_audio = std::fs::read(ctx.document_dir().join(format!("{}.wav", batch_stem(1)))).unwrap();

    let healthy = Arc::new(MockTts::new());
    let report = ctx
        .engine(healthy.clone())
        .run(&document(), &text, &RunControl::new())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.newly_completed, vec![3]);
    assert_eq!(healthy.call_count(), third.chunk_count());
    assert_eq!(healthy.calls_for(chunks[0].spoken()), 0);
    assert_eq!(
        std::fs::read(ctx.document_dir().join(format!("{}.wav", batch_stem(1)))).unwrap(),
        first_audio
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_stop_between_batches_and_resume_at_the_next_one(ctx: &TestContext) {
    let text = book(3, 4, 6);
    let control = RunControl::new();
    control.stop.cancel();

    let tts = Arc::new(MockTts::new());
    let report = ctx
        .engine(tts.clone())
        .run(&document(), &text, &control)
        .await
        .unwrap();

    // stop before the first batch: nothing synthesized, nothing recorded
    assert_eq!(report.outcome, RunOutcome::Stopped { next_batch: 1 });
    assert_eq!(tts.call_count(), 0);
    assert!(report.completed_batches.is_empty());

    let report = ctx
        .engine(Arc::new(MockTts::new()))
        .run(&document(), &text, &RunControl::new())
        .await
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.newly_completed, vec![1, 2, 3]);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_refuse_a_changed_document_with_completed_batches(ctx: &TestContext) {
    let text = book(3, 4, 6);
    ctx.engine(Arc::new(MockTts::new()))
        .run(&document(), &text, &RunControl::new())
        .await
        .unwrap();

    let edited = book(3, 4, 7);
    let err = ctx
        .engine(Arc::new(MockTts::new()))
        .run(&document(), &edited, &RunControl::new())
        .await
        .unwrap_err();

    assert!(
        matches!(err, EngineError::Inconsistent(_) | EngineError::PlanChanged { .. }),
        "{err:?}"
    );
}
