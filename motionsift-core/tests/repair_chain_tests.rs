// motionsift-core/tests/repair_chain_tests.rs

mod common;

use common::{list_names, write_file};
use motionsift_core::config::CoreConfig;
use motionsift_core::error::CoreError;
use motionsift_core::external::mocks::MockFfmpegSpawner;
use motionsift_core::repair::{AttemptOutcome, RepairChain, SidecarTranscoder};
use std::fs;
use tempfile::tempdir;

const STAGE_A: &str = "structural-remux";
const STAGE_B: &str = "compatibility-reencode";
const STAGE_C: &str = "forced-format-reencode";
const STAGE_D: &str = "raw-elementary-stream";

#[test]
fn test_stage_a_fails_stage_b_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let work = dir.path().join("attempts");
    fs::create_dir(&work)?;
    let payload = write_file(dir.path(), "payload.bin", b"not really an mp4");
    let output = dir.path().join("repaired.mp4");

    let spawner = MockFfmpegSpawner::new();
    spawner.add_exit_error_expectation(STAGE_A, &["moov atom not found"], 1);
    spawner.add_success_expectation(STAGE_B, vec![]);
    // Never consumed: the chain stops at B
    spawner.add_success_expectation(STAGE_C, vec![]);
    spawner.add_success_expectation(STAGE_D, vec![]);

    let transcoder = SidecarTranscoder::new(spawner.clone());
    let chain = RepairChain::standard(&CoreConfig::default());
    let repaired = chain.run(&transcoder, &payload, &work, &output)?;

    assert_eq!(repaired.stage, STAGE_B);
    assert_eq!(repaired.path, output);
    assert!(fs::metadata(&output)?.len() > 0);

    let calls = spawner.get_received_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].iter().any(|a| a == "copy"));
    assert!(calls[1].iter().any(|a| a == "libx264"));
    assert_eq!(spawner.pending_expectations(), 2);

    // Stage A's leftovers and B's temp file are gone; only the promoted output remains
    assert!(list_names(&work).is_empty());
    assert_eq!(list_names(dir.path()), vec!["attempts", "payload.bin", "repaired.mp4"]);

    assert_eq!(repaired.attempts.len(), 2);
    match &repaired.attempts[0].outcome {
        AttemptOutcome::Failed(diag) => assert!(diag.contains("moov atom not found")),
        other => panic!("stage A should have failed, got {:?}", other),
    }
    assert!(repaired.attempts[1].succeeded());
    Ok(())
}

#[test]
fn test_empty_output_is_a_failed_stage() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let payload = write_file(dir.path(), "payload.bin", b"payload");
    let output = dir.path().join("out").join("repaired.mp4");

    let spawner = MockFfmpegSpawner::new();
    spawner.add_empty_output_expectation(STAGE_A);
    spawner.add_exit_error_expectation(STAGE_B, &["Invalid data found when processing input"], 1);
    spawner.add_success_expectation(STAGE_C, vec![]);

    let chain = RepairChain::standard(&CoreConfig::default());
    let repaired = chain.run(&SidecarTranscoder::new(spawner.clone()), &payload, dir.path(), &output)?;

    assert_eq!(repaired.stage, STAGE_C);
    assert_eq!(spawner.get_received_calls().len(), 3);
    assert!(output.is_file());
    assert_eq!(list_names(dir.path()), vec!["out", "payload.bin"]);
    Ok(())
}

#[test]
fn test_all_stages_fail() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let payload = write_file(dir.path(), "payload.bin", b"payload");
    let output = dir.path().join("repaired.mp4");

    let spawner = MockFfmpegSpawner::new();
    spawner.add_exit_error_expectation(STAGE_A, &["a broke"], 1);
    spawner.add_exit_error_expectation(STAGE_B, &["b broke"], 1);
    spawner.add_spawn_error_expectation(STAGE_C, CoreError::OperationFailed("c broke".into()));
    spawner.add_exit_error_expectation(STAGE_D, &["h264 decode_slice_header error", "no frame!"], 69);

    let chain = RepairChain::standard(&CoreConfig::default());
    let err = chain
        .run(&SidecarTranscoder::new(spawner.clone()), &payload, dir.path(), &output)
        .unwrap_err();

    match err {
        CoreError::RepairChainExhausted {
            stages,
            last_stage,
            diagnostics,
        } => {
            assert_eq!(stages, 4);
            assert_eq!(last_stage, STAGE_D);
            assert!(diagnostics.contains("no frame!"));
            assert!(!diagnostics.contains("a broke"));
        }
        other => panic!("expected RepairChainExhausted, got {other}"),
    }
    assert!(!output.exists());
    assert_eq!(list_names(dir.path()), vec!["payload.bin"]);
    Ok(())
}

#[test]
fn test_raw_stage_uses_configured_format() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let payload = write_file(dir.path(), "payload.bin", b"payload");
    let output = dir.path().join("repaired.mp4");

    let spawner = MockFfmpegSpawner::new();
    spawner.add_exit_error_expectation(STAGE_A, &[], 1);
    spawner.add_exit_error_expectation(STAGE_B, &[], 1);
    spawner.add_exit_error_expectation(STAGE_C, &[], 1);
    spawner.add_success_expectation(STAGE_D, vec![]);

    let config = CoreConfig {
        raw_stream_format: "hevc".to_string(),
        ..Default::default()
    };
    let repaired = RepairChain::standard(&config).run(
        &SidecarTranscoder::new(spawner.clone()),
        &payload,
        dir.path(),
        &output,
    )?;

    assert_eq!(repaired.stage, STAGE_D);
    let last_call = spawner.get_received_calls().pop().unwrap();
    let f_pos = last_call.iter().position(|a| a == "-f").unwrap();
    assert_eq!(last_call[f_pos + 1], "hevc");
    assert!(last_call.iter().any(|a| a == "-an"));
    Ok(())
}
