//! Integration tests for present/cleanup against the in-memory provider

use std::sync::Arc;

use gcore_dns01::provider::memory::{MemoryProvider, Operation};
use gcore_dns01::zone::{candidate_zones, resolve_zone};
use gcore_dns01::{
    ChallengeRequest, ChallengeSolver, ErrorKind, ProviderError, Reconciled, RecordSet,
    RecordType, Step,
};

const ZONE: &str = "domain.com";
const FQDN: &str = "_acme-challenge.my.test.domain.com.";
const NAME: &str = "_acme-challenge.my.test.domain.com";

fn setup(zones: &[&str]) -> (Arc<MemoryProvider>, ChallengeSolver) {
    let provider = Arc::new(MemoryProvider::with_zones(zones.iter().copied()));
    let solver = ChallengeSolver::new(provider.clone(), 120);
    (provider, solver)
}

fn seed(provider: &MemoryProvider, values: &[&str]) {
    provider.insert_record_set(
        ZONE,
        RecordSet::new(NAME, RecordType::Txt)
            .with_values(values.iter().copied())
            .with_ttl(300),
    );
}

fn values(provider: &MemoryProvider) -> Option<Vec<String>> {
    provider
        .record_set(ZONE, NAME, RecordType::Txt)
        .map(|rs| rs.values)
}

#[tokio::test]
async fn test_present_is_idempotent() {
    let (provider, solver) = setup(&["com", ZONE]);
    let req = ChallengeRequest::new(FQDN, "token-A");

    assert_eq!(solver.present(&req).await.unwrap(), Reconciled::Created);
    assert_eq!(solver.present(&req).await.unwrap(), Reconciled::Unchanged);
    assert_eq!(values(&provider), Some(vec!["token-A".to_string()]));
    assert_eq!(provider.writes(), 1);
}

#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let (provider, solver) = setup(&[ZONE]);
    seed(&provider, &["token-A"]);
    let req = ChallengeRequest::new(FQDN, "token-A");

    assert_eq!(solver.cleanup(&req).await.unwrap(), Reconciled::Deleted);
    assert_eq!(solver.cleanup(&req).await.unwrap(), Reconciled::Unchanged);
    assert_eq!(values(&provider), None);
}

#[tokio::test]
async fn test_present_keeps_existing_tokens() {
    let (provider, solver) = setup(&[ZONE]);
    seed(&provider, &["token-A", "token-B"]);

    let outcome = solver
        .present(&ChallengeRequest::new(FQDN, "token-C"))
        .await
        .unwrap();
    assert_eq!(outcome, Reconciled::Updated);
    assert_eq!(
        values(&provider),
        Some(vec![
            "token-A".to_string(),
            "token-B".to_string(),
            "token-C".to_string()
        ])
    );
}

#[tokio::test]
async fn test_cleanup_removes_only_its_token() {
    let (provider, solver) = setup(&[ZONE]);
    seed(&provider, &["token-A", "token-B", "token-C"]);

    let outcome = solver
        .cleanup(&ChallengeRequest::new(FQDN, "token-B"))
        .await
        .unwrap();
    assert_eq!(outcome, Reconciled::Updated);

    let rs = provider.record_set(ZONE, NAME, RecordType::Txt).unwrap();
    assert_eq!(rs.values, vec!["token-A", "token-C"]);
    assert_eq!(rs.ttl, Some(300));
}

#[tokio::test]
async fn test_cleanup_deletes_emptied_record_set() {
    let (provider, solver) = setup(&[ZONE]);
    seed(&provider, &["token-A"]);

    solver
        .cleanup(&ChallengeRequest::new(FQDN, "token-A"))
        .await
        .unwrap();
    assert_eq!(values(&provider), None);
    assert_eq!(provider.deletes(), 1);
    assert_eq!(provider.writes(), 0);
}

#[tokio::test]
async fn test_cleanup_without_record_set_succeeds() {
    let (provider, solver) = setup(&[ZONE]);

    let outcome = solver
        .cleanup(&ChallengeRequest::new(FQDN, "token-A"))
        .await
        .unwrap();
    assert_eq!(outcome, Reconciled::Unchanged);
    assert_eq!(provider.writes(), 0);
    assert_eq!(provider.deletes(), 0);
}

#[tokio::test]
async fn test_zone_resolution_prefers_longest_match() {
    let (provider, _) = setup(&["com", ZONE]);

    assert_eq!(
        candidate_zones(FQDN),
        vec!["my.test.domain.com", "test.domain.com", "domain.com"]
    );
    let zone = resolve_zone(provider.as_ref(), FQDN).await.unwrap();
    assert_eq!(zone.name, ZONE);

    assert!(candidate_zones("_acme-challenge.com.").is_empty());
    let err = resolve_zone(provider.as_ref(), "_acme-challenge.com.")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ZoneNotFound);
}

#[tokio::test]
async fn test_empty_values_are_dropped() {
    let (provider, solver) = setup(&[ZONE]);
    seed(&provider, &["", "token-A", ""]);

    solver
        .present(&ChallengeRequest::new(FQDN, "token-B"))
        .await
        .unwrap();
    assert_eq!(
        values(&provider),
        Some(vec!["token-A".to_string(), "token-B".to_string()])
    );

    seed(&provider, &["", "token-A"]);
    solver
        .cleanup(&ChallengeRequest::new(FQDN, "token-A"))
        .await
        .unwrap();
    assert_eq!(values(&provider), None);
}

#[tokio::test]
async fn test_failed_write_reports_step_and_leaves_state() {
    let (provider, solver) = setup(&[ZONE]);
    seed(&provider, &["token-A"]);
    provider.fail_next(
        Operation::PutRecordSet,
        ProviderError::Unavailable("connection reset".to_string()),
    );

    let err = solver
        .present(&ChallengeRequest::new(FQDN, "token-B"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert_eq!(err.step(), Some(Step::WriteRecordSet));
    assert_eq!(values(&provider), Some(vec!["token-A".to_string()]));

    // a retry re-reads and converges
    solver
        .present(&ChallengeRequest::new(FQDN, "token-B"))
        .await
        .unwrap();
    assert_eq!(
        values(&provider),
        Some(vec!["token-A".to_string(), "token-B".to_string()])
    );
}

#[tokio::test]
async fn test_sequential_presents_for_same_name_keep_both_tokens() {
    let (provider, solver) = setup(&[ZONE]);

    let first = solver
        .present(&ChallengeRequest::new(FQDN, "token-A"))
        .await
        .unwrap();
    let second = solver
        .present(&ChallengeRequest::new(FQDN, "token-B"))
        .await
        .unwrap();

    assert_eq!(first, Reconciled::Created);
    assert_eq!(second, Reconciled::Updated);
    assert_eq!(
        values(&provider),
        Some(vec!["token-A".to_string(), "token-B".to_string()])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_presents_for_different_names() {
    let provider = Arc::new(MemoryProvider::with_zones(["example.com", "example.org"]));
    let solver = Arc::new(ChallengeSolver::new(provider.clone(), 120));

    let mut handles = Vec::new();
    for fqdn in [
        "_acme-challenge.example.com.",
        "_acme-challenge.www.example.com.",
        "_acme-challenge.example.org.",
    ] {
        let solver = Arc::clone(&solver);
        handles.push(tokio::spawn(async move {
            solver.present(&ChallengeRequest::new(fqdn, "token-A")).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), Reconciled::Created);
    }

    assert!(provider
        .record_set("example.com", "_acme-challenge.example.com", RecordType::Txt)
        .is_some());
    assert!(provider
        .record_set("example.com", "_acme-challenge.www.example.com", RecordType::Txt)
        .is_some());
    assert!(provider
        .record_set("example.org", "_acme-challenge.example.org", RecordType::Txt)
        .is_some());
}
