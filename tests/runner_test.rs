mod common;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{host, FakeHost, FakeNetwork};
use instcheck::commands::verify::{exit_code, EXIT_FAILED, EXIT_FATAL, EXIT_PASSED};
use instcheck::{InstallationPlan, ParallelVerifier, VerifyError};

fn plan() -> InstallationPlan {
    InstallationPlan::standard("/zowe", "/inst")
}

#[tokio::test]
async fn test_outcomes_follow_input_order() {
    let network = std::sync::Arc::new(
        FakeNetwork::new()
            .with_host("slow", FakeHost::standard_install().command_delay(Duration::from_millis(20)))
            .with_host("fast", FakeHost::standard_install())
            .with_host("broken", FakeHost::new().dir("/zowe")),
    );

    let outcomes = ParallelVerifier::new(network.connector(), plan())
        .verify_all(
            vec![host("slow"), host("fast"), host("broken")],
            CancellationToken::new(),
        )
        .await;

    let names: Vec<&str> = outcomes.iter().map(|o| o.host.host.as_str()).collect();
    assert_eq!(names, ["slow", "fast", "broken"]);
    assert!(outcomes[0].passed());
    assert!(outcomes[1].passed());
    assert!(!outcomes[2].passed());
    assert!(!outcomes[2].is_fatal());
    assert_eq!(exit_code(&outcomes), EXIT_FAILED);
    assert_eq!(network.counters.live(), 0);
}

#[tokio::test]
async fn test_parallelism_is_bounded() {
    let mut network = FakeNetwork::new();
    let mut hosts = Vec::new();
    for i in 0..6 {
        let name = format!("h{i}");
        network = network.with_host(
            &name,
            FakeHost::standard_install().command_delay(Duration::from_millis(10)),
        );
        hosts.push(host(&name));
    }
    let network = std::sync::Arc::new(network);

    let outcomes = ParallelVerifier::new(network.connector(), plan())
        .with_max_parallel(2)
        .verify_all(hosts, CancellationToken::new())
        .await;

    assert_eq!(outcomes.len(), 6);
    assert!(outcomes.iter().all(|o| o.passed()));
    assert_eq!(exit_code(&outcomes), EXIT_PASSED);
    assert!(network.counters.peak_live() <= 2);
    assert_eq!(network.counters.connects(), 6);
    assert_eq!(network.counters.live(), 0);
}

#[tokio::test]
async fn test_unreachable_host_is_fatal_for_that_host_only() {
    let network = FakeNetwork::single("good", FakeHost::standard_install());

    let outcomes = ParallelVerifier::new(network.connector(), plan())
        .verify_all(vec![host("good"), host("missing")], CancellationToken::new())
        .await;

    assert!(outcomes[0].passed());
    assert!(outcomes[1].is_fatal());
    assert!(outcomes[1].report().outcomes().is_empty());
    assert_eq!(exit_code(&outcomes), EXIT_FATAL);
}

#[tokio::test]
async fn test_cancellation_reaches_every_host() {
    let network = std::sync::Arc::new(
        FakeNetwork::new()
            .with_host("h1", FakeHost::standard_install().hang_on_command(2))
            .with_host("h2", FakeHost::standard_install().hang_on_command(4)),
    );
    let cancel = CancellationToken::new();

    let verifier = ParallelVerifier::new(network.connector(), plan());
    let run = verifier.verify_all(vec![host("h1"), host("h2")], cancel.clone());
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    };
    let (outcomes, ()) = tokio::join!(run, canceller);

    for outcome in &outcomes {
        let failure = outcome.result.as_ref().unwrap_err();
        assert_eq!(failure.error, VerifyError::Cancelled);
    }
    assert_eq!(outcomes[0].report().outcomes().len(), 1);
    assert_eq!(outcomes[1].report().outcomes().len(), 3);
    assert_eq!(network.counters.live(), 0);
    assert_eq!(network.counters.closes(), 2);
}
