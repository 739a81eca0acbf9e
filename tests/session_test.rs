mod common;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{host, FakeHost, FakeNetwork, CLEAN_FINGERPRINT};
use instcheck::{
    ConnectionError, ExecutionError, ExistenceProbe, FingerprintVerifier, InstallationPlan,
    ReportStatus, VerificationSession, VerifyError,
};

fn five_probe_session(network: &std::sync::Arc<FakeNetwork>) -> VerificationSession {
    VerificationSession::new(host("h1"), network.connector())
        .with_probe(ExistenceProbe::directory("/a"))
        .with_probe(ExistenceProbe::directory("/b"))
        .with_probe(ExistenceProbe::directory("/c"))
        .with_probe(ExistenceProbe::directory("/d"))
        .with_probe(ExistenceProbe::directory("/e"))
}

#[tokio::test]
async fn test_standard_plan_passes_on_complete_install() {
    let network = FakeNetwork::single("h1", FakeHost::standard_install());
    let plan = InstallationPlan::standard("/zowe", "/inst");

    let report = VerificationSession::from_plan(host("h1"), network.connector(), &plan)
        .run()
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.outcomes().len(), 7);
    assert!(report.all_passed(), "{:#?}", report.outcomes());
    assert_eq!(report.host(), "h1");

    // One connection for the whole run, released once
    assert_eq!(network.counters.connects(), 1);
    assert_eq!(network.counters.closes(), 1);
    assert_eq!(network.counters.live(), 0);
}

#[tokio::test]
async fn test_logical_failures_do_not_stop_the_run() {
    // Standard layout without the jobs API jar, and a failing fingerprint
    let fake = FakeHost::new()
        .dir("/zowe")
        .file("/inst/bin/zowe-start.sh")
        .file("/zowe/scripts/internal/opercmd")
        .dir("/zowe/fingerprint")
        .file("/zowe/fingerprint/RefRuntimeHash-1.0.5.txt")
        .respond(
            "zowe-verify-authenticity.sh",
            0,
            "Number of files different = 2\nNumber of files extra = 0\nNumber of files missing = 0\nVerification FAILED\n",
        );
    let network = FakeNetwork::single("h1", fake);
    let plan = InstallationPlan::standard("/zowe", "/inst");

    let report = VerificationSession::from_plan(host("h1"), network.connector(), &plan)
        .run()
        .await
        .unwrap();

    assert!(report.is_complete());
    assert!(!report.all_passed());
    let failed: Vec<&str> = report.failures().map(|o| o.name.as_str()).collect();
    assert_eq!(
        failed,
        [
            "file /zowe/components/jobs-api/bin/jobs-api-server-*.jar exists",
            "installation fingerprint matches"
        ]
    );

    let fingerprint = report.outcomes().last().unwrap();
    let detail = fingerprint.detail.as_deref().unwrap();
    assert!(detail.contains("different=2"));
    assert!(detail.contains("Verification FAILED"));
}

#[tokio::test]
async fn test_transport_error_mid_run_returns_partial_report() {
    let network = FakeNetwork::single(
        "h1",
        FakeHost::new()
            .dir("/a")
            .dir("/b")
            .dir("/c")
            .fail_on_command(3),
    );

    let failure = five_probe_session(&network).run().await.unwrap_err();

    assert!(matches!(
        failure.error,
        VerifyError::Execution(ExecutionError::Transport { .. })
    ));
    assert_eq!(failure.report.outcomes().len(), 2);
    assert!(matches!(
        failure.report.status(),
        ReportStatus::Incomplete { .. }
    ));
    assert!(!failure.report.all_passed());

    assert_eq!(network.counters.commands_for("h1").len(), 3);
    assert_eq!(network.counters.closes(), 1);
    assert_eq!(network.counters.live(), 0);
}

#[tokio::test]
async fn test_connection_failure_runs_no_probe() {
    let network = FakeNetwork::single(
        "h1",
        FakeHost::new().refuse(ConnectionError::AuthenticationFailed {
            host: "h1".to_string(),
            user: "zowe".to_string(),
            reason: "password rejected".to_string(),
        }),
    );

    let failure = five_probe_session(&network).run().await.unwrap_err();

    assert!(matches!(
        failure.error,
        VerifyError::Connection(ConnectionError::AuthenticationFailed { .. })
    ));
    assert!(failure.report.outcomes().is_empty());
    assert!(!failure.report.is_complete());
    assert_eq!(network.counters.connects(), 0);
    assert_eq!(network.counters.live(), 0);
}

#[tokio::test]
async fn test_cancellation_releases_session() {
    let network = FakeNetwork::single("h1", FakeHost::new().dir("/a").hang_on_command(2));
    let session = five_probe_session(&network);
    let cancel = CancellationToken::new();

    let run = tokio::spawn(session.run_until_cancelled(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(network.counters.live(), 1);
    cancel.cancel();

    let failure = run.await.unwrap().unwrap_err();
    assert_eq!(failure.error, VerifyError::Cancelled);
    assert_eq!(failure.report.outcomes().len(), 1);
    assert_eq!(
        failure.report.status(),
        &ReportStatus::Incomplete {
            reason: "verification cancelled".to_string()
        }
    );
    assert_eq!(network.counters.closes(), 1);
    assert_eq!(network.counters.live(), 0);
}

#[tokio::test]
async fn test_already_cancelled_token_never_connects() {
    let network = FakeNetwork::single("h1", FakeHost::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = five_probe_session(&network)
        .run_until_cancelled(cancel)
        .await
        .unwrap_err();

    assert_eq!(failure.error, VerifyError::Cancelled);
    assert_eq!(network.counters.connects(), 0);
}

#[tokio::test]
async fn test_fingerprint_uses_single_combined_command() {
    let network = FakeNetwork::single(
        "h1",
        FakeHost::new().respond("/zowe/bin/zowe-verify-authenticity.sh", 0, CLEAN_FINGERPRINT),
    );

    let report = VerificationSession::new(host("h1"), network.connector())
        .with_probe(FingerprintVerifier::new("/zowe/bin/zowe-verify-authenticity.sh"))
        .run()
        .await
        .unwrap();

    assert!(report.all_passed());
    assert_eq!(
        network.counters.commands_for("h1"),
        ["touch ~/.profile && . ~/.profile && '/zowe/bin/zowe-verify-authenticity.sh'"]
    );
}

#[tokio::test]
async fn test_fingerprint_without_marker_fails_closed() {
    let network = FakeNetwork::single(
        "h1",
        FakeHost::new().respond(
            "verify.sh",
            0,
            "Number of files different = 0\nNumber of files extra = 0\nNumber of files missing = 0\n",
        ),
    );

    let report = VerificationSession::new(host("h1"), network.connector())
        .with_probe(FingerprintVerifier::new("/zowe/bin/verify.sh"))
        .run()
        .await
        .unwrap();

    assert!(report.is_complete());
    assert!(!report.all_passed());
}
