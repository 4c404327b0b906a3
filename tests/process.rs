//! Supervising real `sh` children.

#![cfg(unix)]

use power_manager::cleanup::{CleanupCoordinator, RetryPolicy, WayfireIpc};
use power_manager::domain::HandlerDescriptor;
use power_manager::power::{CommandInvoker, PowerCommands};
use power_manager::registry::HandlerRegistry;
use power_manager::sequencer::ClockJumpWake;
use power_manager::supervisor::{CoverOutcome, FinishOutcome, Launcher, ProcessLauncher};
use power_manager::{
    ActionSequencer, PowerActionKind, PowerActionRequest, SequencePhase, SequencerSettings,
    Terminal,
};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn shell_handler(dir: &TempDir, name: &str, script: &str) -> HandlerDescriptor {
    HandlerDescriptor::new(
        name,
        vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        dir.path().to_path_buf(),
    )
}

fn launcher(dir: &TempDir) -> ProcessLauncher {
    ProcessLauncher::new(Some(dir.path().to_path_buf()), Duration::from_millis(300))
}

fn shutdown() -> PowerActionRequest {
    PowerActionRequest::new(PowerActionKind::Shutdown, power_manager::AnimationMode::None)
}

#[tokio::test]
async fn reads_both_milestones() {
    let dir = TempDir::new().unwrap();
    let handler = shell_handler(&dir, "fire", "echo COVERED; sleep 0.1; echo FINISHED");

    let mut session = launcher(&dir).launch(&handler, &shutdown()).unwrap();
    assert_eq!(session.await_cover(Duration::from_secs(5)).await, CoverOutcome::Covered);
    assert_eq!(session.await_finish(Duration::from_secs(5)).await, FinishOutcome::Finished);
    session.terminate().await;
    session.terminate().await;
}

#[tokio::test]
async fn legacy_marker_names_are_accepted() {
    let dir = TempDir::new().unwrap();
    let handler = shell_handler(&dir, "legacy", "echo READY; echo BLACK; sleep 5");

    let mut session = launcher(&dir).launch(&handler, &shutdown()).unwrap();
    assert_eq!(session.await_cover(Duration::from_secs(5)).await, CoverOutcome::Covered);
    assert_eq!(session.await_finish(Duration::from_secs(5)).await, FinishOutcome::Finished);
    session.terminate().await;
}

#[tokio::test]
async fn binary_output_before_the_marker_is_inert() {
    let dir = TempDir::new().unwrap();
    let handler = shell_handler(
        &dir,
        "noisy",
        r"printf '\377\376\n'; sleep 0.2; echo COVERED; sleep 5",
    );

    let mut session = launcher(&dir).launch(&handler, &shutdown()).unwrap();
    assert_eq!(session.await_cover(Duration::from_secs(3)).await, CoverOutcome::Covered);
    session.terminate().await;
}

#[tokio::test]
async fn silent_handler_times_out() {
    let dir = TempDir::new().unwrap();
    let handler = shell_handler(&dir, "slow", "sleep 5");

    let mut session = launcher(&dir).launch(&handler, &shutdown()).unwrap();
    let started = Instant::now();
    assert_eq!(
        session.await_cover(Duration::from_millis(200)).await,
        CoverOutcome::TimedOut
    );
    assert!(started.elapsed() < Duration::from_secs(4));
    session.terminate().await;
}

#[tokio::test]
async fn early_exit_is_reported() {
    let dir = TempDir::new().unwrap();
    let handler = shell_handler(&dir, "crash", "echo starting >&2; exit 3");

    let mut session = launcher(&dir).launch(&handler, &shutdown()).unwrap();
    assert_eq!(
        session.await_cover(Duration::from_secs(5)).await,
        CoverOutcome::ProcessExited
    );
    session.terminate().await;
}

#[tokio::test]
async fn sigterm_is_escalated_to_kill() {
    let dir = TempDir::new().unwrap();
    let handler = shell_handler(&dir, "stubborn", "trap '' TERM; echo COVERED; sleep 30");

    let mut session = launcher(&dir).launch(&handler, &shutdown()).unwrap();
    assert_eq!(session.await_cover(Duration::from_secs(5)).await, CoverOutcome::Covered);

    let started = Instant::now();
    session.terminate().await;
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn handler_sees_the_action_and_root() {
    let dir = TempDir::new().unwrap();
    let handler = shell_handler(
        &dir,
        "env",
        r#"[ "$POWER_MANAGER_ACTION" = test ] && [ -n "$SHUTDOWN_EFFECTS_DIR" ] && echo COVERED; sleep 5"#,
    );

    let mut session = launcher(&dir)
        .launch(&handler, &PowerActionRequest::preview(power_manager::AnimationMode::None))
        .unwrap();
    assert_eq!(session.await_cover(Duration::from_secs(5)).await, CoverOutcome::Covered);
    session.terminate().await;
}

#[tokio::test]
async fn missing_program_is_a_launch_error() {
    let dir = TempDir::new().unwrap();
    let handler = HandlerDescriptor::new(
        "ghost",
        vec!["/nonexistent/animate".to_string()],
        dir.path().to_path_buf(),
    );

    let err = launcher(&dir).launch(&handler, &shutdown()).err().unwrap();
    assert!(matches!(err, power_manager::PowerManagerError::Launch { .. }));
}

#[tokio::test]
async fn preview_with_a_real_animation() {
    let dir = TempDir::new().unwrap();
    let registry: HandlerRegistry =
        std::iter::once(shell_handler(&dir, "fire", "echo COVERED; sleep 30")).collect();
    let settings = SequencerSettings {
        hold: Duration::from_millis(100),
        ..SequencerSettings::default()
    };

    let sequencer = ActionSequencer::new(
        registry,
        Box::new(launcher(&dir)),
        Box::new(CommandInvoker::new(PowerCommands {
            shutdown: vec!["false".to_string()],
            ..PowerCommands::default()
        })),
        Box::new(ClockJumpWake::default()),
        CleanupCoordinator::new(
            Box::new(WayfireIpc::new(None, Duration::from_secs(1))),
            RetryPolicy::default(),
        ),
        settings,
    );
    let request = sequencer.request(PowerActionKind::Shutdown, Some("fire"), true);
    let report = sequencer.run(request, CancellationToken::new()).await;

    assert!(report.is_success(), "{:?}", report.outcome);
    assert_eq!(report.history.last(), Some(&SequencePhase::Terminal(Terminal::Success)));
    assert!(report.cleanup.animation_reaped);
}
