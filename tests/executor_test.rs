mod common;

use std::time::Duration;

use common::{host, FakeHost, FakeNetwork};
use instcheck::{
    CommandExecutor, CommandProbe, ConnectionManager, ExecutionError, Probe, RunOptions,
    SuccessPolicy,
};

#[tokio::test]
async fn test_nonzero_exit_is_data_not_error() {
    let network = FakeNetwork::single("h1", FakeHost::new().respond("grep", 1, ""));
    let mut manager = ConnectionManager::new(network.connector());
    let session = manager.acquire(&host("h1")).await.unwrap();

    let result = CommandExecutor::default()
        .run(session, "grep zowe /etc/profile", &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.exit_code, 1);
    assert!(!result.accepted);
    assert!(session.is_alive());
    let _ = manager.release().await;
}

#[tokio::test]
async fn test_success_policy_accepts_extra_codes() {
    let network = FakeNetwork::single("h1", FakeHost::new().respond("check", 4, "warnings"));
    let mut manager = ConnectionManager::new(network.connector());
    let session = manager.acquire(&host("h1")).await.unwrap();

    let options = RunOptions::default().with_success(SuccessPolicy::accepting([0, 4]));
    let result = CommandExecutor::default()
        .run(session, "check", &options)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.stdout, "warnings");
    let _ = manager.release().await;
}

#[tokio::test]
async fn test_invalid_command_is_never_sent() {
    let network = FakeNetwork::single("h1", FakeHost::new());
    let mut manager = ConnectionManager::new(network.connector());
    let session = manager.acquire(&host("h1")).await.unwrap();

    let err = CommandExecutor::default()
        .run(session, "  ", &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExecutionError::InvalidCommand { .. }));
    assert!(network.counters.commands_for("h1").is_empty());
    assert!(session.is_alive());
    let _ = manager.release().await;
}

#[tokio::test]
async fn test_timeout_marks_session_dead() {
    let network = FakeNetwork::single("h1", FakeHost::new().hang_on_command(1));
    let mut manager = ConnectionManager::new(network.connector());
    let session = manager.acquire(&host("h1")).await.unwrap();
    let executor = CommandExecutor::new(Duration::from_millis(50));

    let err = executor
        .run(session, "sleep 3600", &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Timeout { .. }));
    assert!(!session.is_alive());

    // Later commands fail fast
    let err = executor
        .run(session, "true", &RunOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ExecutionError::SessionClosed {
            host: "h1".to_string()
        }
    );
    let _ = manager.release().await;
}

#[tokio::test]
async fn test_transport_error_marks_session_dead() {
    let network = FakeNetwork::single("h1", FakeHost::new().fail_on_command(1));
    let mut manager = ConnectionManager::new(network.connector());
    let session = manager.acquire(&host("h1")).await.unwrap();

    let err = CommandExecutor::default()
        .run(session, "true", &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Transport { .. }));
    assert!(!session.is_alive());
    let _ = manager.release().await;
}

#[tokio::test]
async fn test_command_probe_uses_classifier() {
    let network = FakeNetwork::single(
        "h1",
        FakeHost::new().respond("java -version", 0, "openjdk version \"1.8.0\""),
    );
    let mut manager = ConnectionManager::new(network.connector());
    let session = manager.acquire(&host("h1")).await.unwrap();

    let probe = CommandProbe::new("java 8 installed", "java -version 2>&1", |result| {
        instcheck::Verdict::from_bool(result.stdout.contains("1.8"))
    });
    let outcome = probe
        .run(&CommandExecutor::default(), session)
        .await
        .unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.name, "java 8 installed");

    let probe = CommandProbe::exit_code("missing tool", "does-not-exist");
    let outcome = probe
        .run(&CommandExecutor::default(), session)
        .await
        .unwrap();
    assert!(!outcome.passed);
    assert_eq!(outcome.detail.as_deref(), Some("exit status 127"));
    let _ = manager.release().await;
}
