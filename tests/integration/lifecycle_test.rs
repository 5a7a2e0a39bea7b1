// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;

use provisionrs::application::usecases::provision_job::{ProvisionError, ProvisionJobUseCase};
use provisionrs::domain::models::worker_process::{
    LABEL_TARGET, LABEL_TASK_OWNER, LABEL_VPN_REGION,
};
use provisionrs::domain::repositories::lock_repository::LockRepository;
use provisionrs::domain::repositories::runtime_repository::RuntimeRepository;
use provisionrs::domain::repositories::storage_repository::StorageRepository;
use provisionrs::domain::services::admission::{AdmissionError, AdmissionService};
use provisionrs::domain::services::proxy_pool::ProxyPoolService;

use crate::helpers::fakes::{FakeLockService, FakeRuntime, FakeStorage, WorkerScript};
use crate::helpers::test_settings;

const HOTEL_URL: &str =
    "https://www.tripadvisor.com/Hotel_Review-g123456-d7890-Reviews-Some_Hotel.html";

struct Harness {
    runtime: Arc<FakeRuntime>,
    locks: Arc<FakeLockService>,
    storage: Arc<FakeStorage>,
    admission: Arc<AdmissionService>,
    usecase: Arc<ProvisionJobUseCase>,
    staging: tempfile::TempDir,
}

fn harness(require_proxy: bool) -> Harness {
    let staging = tempfile::tempdir().unwrap();
    let mut settings = test_settings(staging.path());
    settings.require_proxy = require_proxy;

    let runtime = Arc::new(FakeRuntime::new());
    let locks = Arc::new(FakeLockService::new());
    let storage = Arc::new(FakeStorage::new());

    let runtime_dyn: Arc<dyn RuntimeRepository> = runtime.clone();
    let locks_dyn: Arc<dyn LockRepository> = locks.clone();
    let storage_dyn: Arc<dyn StorageRepository> = storage.clone();

    let pool = Arc::new(ProxyPoolService::new(
        runtime_dyn.clone(),
        locks_dyn.clone(),
        settings.proxy_lock_ttl,
    ));
    let admission = Arc::new(AdmissionService::new(
        runtime_dyn.clone(),
        settings.max_active_jobs,
    ));
    let usecase = Arc::new(ProvisionJobUseCase::new(
        runtime_dyn,
        locks_dyn,
        storage_dyn,
        pool,
        settings,
    ));

    Harness {
        runtime,
        locks,
        storage,
        admission,
        usecase,
        staging,
    }
}

/// Wait for the fire-and-forget run to finish: the worker has been
/// removed and every lock (cleanup and proxy) released.
async fn wait_for_cleanup(harness: &Harness, process_id: &str) {
    for _ in 0..200 {
        if harness.runtime.remove_calls(process_id) >= 1 && harness.locks.held_count() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job did not clean up within the deadline");
}

fn staging_is_empty(harness: &Harness) -> bool {
    std::fs::read_dir(harness.staging.path())
        .unwrap()
        .next()
        .is_none()
}

#[tokio::test]
async fn accepted_hotel_job_uploads_result_and_cleans_up() {
    let h = harness(false);
    h.runtime.seed_proxy("vpn-zrh", "ch");
    h.runtime
        .script_next_worker(WorkerScript::succeeding(b"title,rating\nGreat stay,5\n"));

    let job = h.admission.admit(HOTEL_URL, "alice01", "HOTEL").await.unwrap();
    let handle = h.usecase.clone().launch(job).await.unwrap();
    assert!(handle.proxied);

    wait_for_cleanup(&h, &handle.process_id).await;

    // Worker configuration honoured the contract.
    let spec = h.runtime.created_spec(&handle.process_id).unwrap();
    assert_eq!(spec.image, "scraper:test");
    assert!(spec.env.contains(&format!("LOCATION_URL={}", HOTEL_URL)));
    assert!(spec.env.contains(&"SCRAPE_MODE=HOTEL".to_string()));
    assert!(spec.env.contains(&"HOTEL_NAME=Some_Hotel".to_string()));
    assert!(spec.env.contains(&"CONCURRENCY=1".to_string()));
    assert!(spec.env.contains(&"IS_PROVISIONER=true".to_string()));
    assert!(spec
        .env
        .contains(&"PROXY_HOST=http://vpn-zrh.proxy.local:8888".to_string()));
    assert_eq!(
        spec.labels.get(LABEL_TASK_OWNER).map(String::as_str),
        Some("alice01")
    );
    assert_eq!(
        spec.labels.get(LABEL_TARGET).map(String::as_str),
        Some("Some_Hotel")
    );
    assert_eq!(
        spec.labels.get(LABEL_VPN_REGION).map(String::as_str),
        Some("ch")
    );

    // Exactly one stored object, tagged with the uploader.
    assert_eq!(h.storage.object_count(), 1);
    let (key, contents) = h.storage.find("alice01").unwrap();
    assert!(key.starts_with("Some_Hotel-"));
    assert!(key.ends_with(".csv"));
    assert_eq!(contents, b"title,rating\nGreat stay,5\n");

    // Exactly one removal, staging cleaned, proxy lock gone.
    assert_eq!(h.runtime.remove_calls(&handle.process_id), 1);
    assert!(h.runtime.is_removed(&handle.process_id));
    assert!(staging_is_empty(&h));
    assert!(!h.locks.holds("proxy-usage:vpn-zrh"));
}

#[tokio::test]
async fn nonzero_exit_discards_output_and_still_releases_everything() {
    let h = harness(false);
    h.runtime.seed_proxy("vpn-zrh", "ch");
    h.runtime.script_next_worker(WorkerScript::exiting(3));

    let job = h.admission.admit(HOTEL_URL, "bob", "HOTEL").await.unwrap();
    let handle = h.usecase.clone().launch(job).await.unwrap();

    wait_for_cleanup(&h, &handle.process_id).await;

    assert_eq!(h.storage.object_count(), 0);
    assert_eq!(h.runtime.remove_calls(&handle.process_id), 1);
    assert!(staging_is_empty(&h));
    assert!(!h.locks.holds("proxy-usage:vpn-zrh"));
}

#[tokio::test]
async fn wait_protocol_error_is_fatal_but_leaks_nothing() {
    let h = harness(false);
    h.runtime.seed_proxy("vpn-zrh", "ch");
    h.runtime.script_next_worker(WorkerScript::wait_failing());

    let job = h.admission.admit(HOTEL_URL, "carol", "HOTEL").await.unwrap();
    let handle = h.usecase.clone().launch(job).await.unwrap();

    wait_for_cleanup(&h, &handle.process_id).await;

    assert_eq!(h.storage.object_count(), 0);
    assert_eq!(h.runtime.remove_calls(&handle.process_id), 1);
    assert!(!h.locks.holds("proxy-usage:vpn-zrh"));
}

#[tokio::test]
async fn failed_upload_still_deletes_staging_copy_and_cleans_up() {
    let h = harness(false);
    h.storage.fail_next_puts();
    h.runtime
        .script_next_worker(WorkerScript::succeeding(b"data\n"));

    let job = h.admission.admit(HOTEL_URL, "dave", "HOTEL").await.unwrap();
    let handle = h.usecase.clone().launch(job).await.unwrap();

    wait_for_cleanup(&h, &handle.process_id).await;

    assert_eq!(h.storage.object_count(), 0);
    assert_eq!(h.runtime.remove_calls(&handle.process_id), 1);
    assert!(staging_is_empty(&h));
}

#[tokio::test]
async fn require_proxy_rejects_when_pool_is_exhausted() {
    let h = harness(true);
    // No proxies seeded at all.

    let job = h.admission.admit(HOTEL_URL, "erin", "HOTEL").await.unwrap();
    let err = h.usecase.clone().launch(job).await.unwrap_err();

    assert!(matches!(err, ProvisionError::NoProxyAvailable));
    assert_eq!(h.runtime.created_count(), 0);
    assert_eq!(h.locks.held_count(), 0);
}

#[tokio::test]
async fn direct_egress_fallback_when_no_proxy_is_available() {
    let h = harness(false);
    h.runtime
        .script_next_worker(WorkerScript::succeeding(b"data\n"));

    let job = h.admission.admit(HOTEL_URL, "frank", "HOTEL").await.unwrap();
    let handle = h.usecase.clone().launch(job).await.unwrap();
    assert!(!handle.proxied);

    wait_for_cleanup(&h, &handle.process_id).await;

    let spec = h.runtime.created_spec(&handle.process_id).unwrap();
    assert!(!spec.env.iter().any(|v| v.starts_with("PROXY_HOST=")));
    assert_eq!(h.storage.object_count(), 1);
}

#[tokio::test]
async fn admission_counts_running_scrapers_against_the_ceiling() {
    let h = harness(false);
    for i in 0..5 {
        h.runtime.seed_scraper(&format!("job-{}", i), "someone");
    }
    // Proxies never count towards the ceiling.
    h.runtime.seed_proxy("vpn-zrh", "ch");

    let err = h
        .admission
        .admit(HOTEL_URL, "grace", "HOTEL")
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::Busy { active: 5, .. }));
}

#[tokio::test]
async fn two_jobs_against_one_proxy_share_it_sequentially() {
    let h = harness(true);
    h.runtime.seed_proxy("vpn-solo", "ch");
    h.runtime
        .script_next_worker(WorkerScript::succeeding(b"first\n"));
    h.runtime
        .script_next_worker(WorkerScript::succeeding(b"second\n"));

    let first = h.admission.admit(HOTEL_URL, "heidi", "HOTEL").await.unwrap();
    let first_handle = h.usecase.clone().launch(first).await.unwrap();
    wait_for_cleanup(&h, &first_handle.process_id).await;

    // The proxy came back to the pool, so a second job can claim it.
    let second = h.admission.admit(HOTEL_URL, "ivan", "HOTEL").await.unwrap();
    let second_handle = h.usecase.clone().launch(second).await.unwrap();
    assert!(second_handle.proxied);
    wait_for_cleanup(&h, &second_handle.process_id).await;

    assert_eq!(h.storage.object_count(), 2);
}
