/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use host_manifest::{HostInfo, HostManifest, HostVendor, TpmVersion};
use policy_verifier::{TrustReport, VerifierError, POLICY_NAME};
use verify_scheduler::{
    Host, HostConnectionState, HostDataFetcher, HostDataReceiver, HostStatus, HostStatusFilter,
    HostStatusStore, HostStore, HostTrustManager, HostVerifier, JobStage, QueueFilter, QueueRecord,
    QueueStore, SchedulerConfig, SchedulerError, TrustReportSink, VerifyParams,
};

fn make_manifest() -> HostManifest {
    HostManifest::new(HostInfo {
        host_name: "host-1".to_string(),
        hardware_uuid: None,
        vendor: HostVendor::Intel,
        tpm_version: TpmVersion::V2_0,
    })
}

fn make_host(host_id: Uuid) -> Host {
    Host { id: host_id, host_name: "host-1".to_string(), connection_string: "https://host-1:1443".to_string() }
}

#[derive(Default)]
struct InMemoryQueueStore {
    records: StdMutex<HashMap<Uuid, QueueRecord>>,
}

impl InMemoryQueueStore {
    fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn preload(&self, params: VerifyParams) -> Uuid {
        let mut record = QueueRecord::new(params);
        record.id = Uuid::new_v4();
        let id = record.id;
        self.records.lock().unwrap().insert(id, record);
        id
    }

    fn only_record(&self) -> QueueRecord {
        let records = self.records.lock().unwrap();
        assert_eq!(records.len(), 1, "expected exactly one queue record");
        records.values().next().unwrap().clone()
    }
}

impl QueueStore for InMemoryQueueStore {
    fn create(&self, mut record: QueueRecord) -> Result<QueueRecord, SchedulerError> {
        record.id = Uuid::new_v4();
        self.records.lock().unwrap().insert(record.id, record.clone());
        Ok(record)
    }

    fn retrieve(&self, id: Uuid) -> Result<Option<QueueRecord>, SchedulerError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    fn update(&self, record: &QueueRecord) -> Result<(), SchedulerError> {
        self.records.lock().unwrap().insert(record.id, record.clone());
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), SchedulerError> {
        self.records.lock().unwrap().remove(&id);
        Ok(())
    }

    fn search(&self, filter: Option<&QueueFilter>) -> Result<Vec<QueueRecord>, SchedulerError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .filter(|r| {
                filter.map_or(true, |f| {
                    f.action.as_deref().map_or(true, |a| r.action == a)
                        && f.host_id.map_or(true, |h| r.params.host_id == h)
                })
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct InMemoryHostStore {
    hosts: StdMutex<HashMap<Uuid, Host>>,
}

impl HostStore for InMemoryHostStore {
    fn retrieve(&self, host_id: Uuid) -> Result<Host, SchedulerError> {
        self.hosts.lock().unwrap().get(&host_id).cloned().ok_or(SchedulerError::HostNotFound(host_id))
    }
}

/// Status store whose `search` blocks while the gate is closed, pinning
/// worker progress so submission races stay deterministic.
struct GatedHostStatusStore {
    statuses: StdMutex<HashMap<Uuid, HostStatus>>,
    gate_open: Arc<AtomicBool>,
}

impl GatedHostStatusStore {
    fn new(gate_open: bool) -> Self {
        Self { statuses: StdMutex::new(HashMap::new()), gate_open: Arc::new(AtomicBool::new(gate_open)) }
    }

    fn insert_connected(&self, host_id: Uuid) {
        self.statuses.lock().unwrap().insert(
            host_id,
            HostStatus {
                host_id,
                state: HostConnectionState::Connected,
                host_manifest: Some(make_manifest()),
            },
        );
    }

    fn open_gate(&self) {
        self.gate_open.store(true, Ordering::SeqCst);
    }
}

impl HostStatusStore for GatedHostStatusStore {
    fn search(&self, filter: &HostStatusFilter) -> Result<Vec<HostStatus>, SchedulerError> {
        // Bounded wait so a broken test cannot hang the suite
        for _ in 0..1000 {
            if self.gate_open.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(self.statuses.lock().unwrap().get(&filter.host_id).cloned().into_iter().collect())
    }
}

/// Fetcher that records calls and completes out of band with a fresh manifest
struct RecordingFetcher {
    calls: StdMutex<Vec<Uuid>>,
}

impl RecordingFetcher {
    fn new() -> Self {
        Self { calls: StdMutex::new(Vec::new()) }
    }

    fn fetched_hosts(&self) -> Vec<Uuid> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostDataFetcher for RecordingFetcher {
    async fn retrieve_async(
        &self,
        host: Host,
        prefer_hash_match: bool,
        receiver: Arc<dyn HostDataReceiver>,
    ) -> Result<(), SchedulerError> {
        self.calls.lock().unwrap().push(host.id);
        tokio::spawn(async move {
            receiver.process_host_data(host, Some(make_manifest()), prefer_hash_match, None).await;
        });
        Ok(())
    }

    async fn retrieve(&self, _host: &Host) -> Result<HostManifest, SchedulerError> {
        Ok(make_manifest())
    }
}

struct CountingVerifier {
    calls: AtomicUsize,
}

impl CountingVerifier {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

impl HostVerifier for CountingVerifier {
    fn verify(
        &self,
        _host_id: Uuid,
        manifest: &HostManifest,
        _is_fresh_data: bool,
        _prefer_hash_match: bool,
    ) -> Result<TrustReport, VerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TrustReport::new(POLICY_NAME, manifest.clone()))
    }
}

struct NullSink;

impl TrustReportSink for NullSink {
    fn store(&self, _report: TrustReport) -> Result<(), SchedulerError> {
        Ok(())
    }
}

struct Fixture {
    queue_store: Arc<InMemoryQueueStore>,
    host_store: Arc<InMemoryHostStore>,
    status_store: Arc<GatedHostStatusStore>,
    fetcher: Arc<RecordingFetcher>,
    verifier: Arc<CountingVerifier>,
}

impl Fixture {
    fn new(gate_open: bool) -> Self {
        let _ = common_log::init();
        Self {
            queue_store: Arc::new(InMemoryQueueStore::default()),
            host_store: Arc::new(InMemoryHostStore::default()),
            status_store: Arc::new(GatedHostStatusStore::new(gate_open)),
            fetcher: Arc::new(RecordingFetcher::new()),
            verifier: Arc::new(CountingVerifier::new()),
        }
    }

    fn manager(&self) -> HostTrustManager {
        HostTrustManager::new(
            SchedulerConfig { verifier_workers: 2, ..Default::default() },
            self.queue_store.clone(),
            self.host_store.clone(),
            self.status_store.clone(),
            self.fetcher.clone(),
            self.verifier.clone(),
            Arc::new(NullSink),
        )
    }
}

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {}", what);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_submission_yields_one_record_and_one_job() {
    let fixture = Fixture::new(false);
    let host_id = Uuid::new_v4();
    fixture.status_store.insert_connected(host_id);
    let manager = fixture.manager();

    manager.verify_hosts_async(&[host_id], false, false).await.unwrap();
    manager.verify_hosts_async(&[host_id], false, false).await.unwrap();

    assert_eq!(fixture.queue_store.count(), 1);
    assert_eq!(manager.in_flight_count(), 1);

    fixture.status_store.open_gate();
    let queue_store = fixture.queue_store.clone();
    wait_until("job completion", || queue_store.count() == 0).await;
    wait_until("job map drained", || manager.in_flight_count() == 0).await;
    assert_eq!(fixture.verifier.calls.load(Ordering::SeqCst), 1);

    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hash_match_upgrade_supersedes_in_flight_job() {
    let fixture = Fixture::new(false);
    let host_id = Uuid::new_v4();
    fixture.status_store.insert_connected(host_id);
    let manager = fixture.manager();

    manager.verify_hosts_async(&[host_id], false, false).await.unwrap();
    let first = manager.job_snapshot(host_id).unwrap();
    assert!(!first.prefer_hash_match);

    manager.verify_hosts_async(&[host_id], false, true).await.unwrap();

    // Exactly one in-flight job and one durable record, both preferring hash match
    assert_eq!(manager.in_flight_count(), 1);
    let snapshot = manager.job_snapshot(host_id).unwrap();
    assert!(snapshot.prefer_hash_match);
    assert!(!snapshot.cancelled);
    let record = fixture.queue_store.only_record();
    assert!(record.params.prefer_hash_match);

    fixture.status_store.open_gate();
    let queue_store = fixture.queue_store.clone();
    wait_until("job completion", || queue_store.count() == 0).await;
    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_weaker_request_is_dropped_while_stronger_in_flight() {
    let fixture = Fixture::new(false);
    let host_id = Uuid::new_v4();
    fixture.status_store.insert_connected(host_id);
    let manager = fixture.manager();

    manager.verify_hosts_async(&[host_id], false, true).await.unwrap();
    manager.verify_hosts_async(&[host_id], false, false).await.unwrap();

    assert_eq!(fixture.queue_store.count(), 1);
    let snapshot = manager.job_snapshot(host_id).unwrap();
    assert!(snapshot.prefer_hash_match, "the stronger in-flight check must be preserved");

    fixture.status_store.open_gate();
    let queue_store = fixture.queue_store.clone();
    wait_until("job completion", || queue_store.count() == 0).await;
    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_submission_runs_fetch_sub_job() {
    let fixture = Fixture::new(true);
    let host_id = Uuid::new_v4();
    fixture.host_store.hosts.lock().unwrap().insert(host_id, make_host(host_id));
    let manager = fixture.manager();

    manager.verify_hosts_async(&[host_id], true, false).await.unwrap();

    let fetcher = fixture.fetcher.clone();
    wait_until("fetch sub-job", || fetcher.fetched_hosts() == vec![host_id]).await;
    let queue_store = fixture.queue_store.clone();
    wait_until("job completion", || queue_store.count() == 0).await;
    assert_eq!(fixture.verifier.calls.load(Ordering::SeqCst), 1);

    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_process_queue_recovers_persisted_fetch_job() {
    let fixture = Fixture::new(true);
    let host_id = Uuid::new_v4();
    fixture.host_store.hosts.lock().unwrap().insert(host_id, make_host(host_id));
    fixture.queue_store.preload(VerifyParams {
        host_id,
        fetch_host_data: true,
        prefer_hash_match: false,
    });

    // A fresh manager instance discovers the record and resubmits the fetch
    let manager = fixture.manager();
    manager.process_queue().await.unwrap();

    let fetcher = fixture.fetcher.clone();
    wait_until("recovered fetch sub-job", || fetcher.fetched_hosts() == vec![host_id]).await;
    let queue_store = fixture.queue_store.clone();
    wait_until("recovered job completion", || queue_store.count() == 0).await;

    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_error_keeps_record_for_retry() {
    struct FailingFetcher;

    #[async_trait]
    impl HostDataFetcher for FailingFetcher {
        async fn retrieve_async(
            &self,
            host: Host,
            prefer_hash_match: bool,
            receiver: Arc<dyn HostDataReceiver>,
        ) -> Result<(), SchedulerError> {
            tokio::spawn(async move {
                receiver
                    .process_host_data(host, None, prefer_hash_match, Some("connection refused".to_string()))
                    .await;
            });
            Ok(())
        }

        async fn retrieve(&self, host: &Host) -> Result<HostManifest, SchedulerError> {
            Err(SchedulerError::FetchError(host.id, "connection refused".to_string()))
        }
    }

    let fixture = Fixture::new(true);
    let host_id = Uuid::new_v4();
    fixture.host_store.hosts.lock().unwrap().insert(host_id, make_host(host_id));
    let manager = HostTrustManager::new(
        SchedulerConfig::default(),
        fixture.queue_store.clone(),
        fixture.host_store.clone(),
        fixture.status_store.clone(),
        Arc::new(FailingFetcher),
        fixture.verifier.clone(),
        Arc::new(NullSink),
    );

    manager.verify_hosts_async(&[host_id], true, false).await.unwrap();

    // The in-memory entry is dropped; the durable record stays for retry
    wait_until("in-memory entry dropped", || manager.in_flight_count() == 0).await;
    assert_eq!(fixture.queue_store.count(), 1);
    assert_eq!(fixture.verifier.calls.load(Ordering::SeqCst), 0);

    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_direct_verify_host_bypasses_queue() {
    let fixture = Fixture::new(true);
    let host_id = Uuid::new_v4();
    fixture.host_store.hosts.lock().unwrap().insert(host_id, make_host(host_id));
    let manager = fixture.manager();

    let report = manager.verify_host(host_id, true, false).await.unwrap();

    assert_eq!(report.policy_name, POLICY_NAME);
    assert_eq!(fixture.verifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.queue_store.count(), 0, "the direct path persists nothing");
    assert_eq!(manager.in_flight_count(), 0);

    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_rejects_new_submissions() {
    let fixture = Fixture::new(true);
    let manager = fixture.manager();
    manager.shutdown().await;

    let result = manager.verify_hosts_async(&[Uuid::new_v4()], false, false).await;
    assert!(matches!(result, Err(SchedulerError::ShuttingDown)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stored_path_passes_stale_data_flag_to_verifier() {
    mockall::mock! {
        Verifier {}
        impl HostVerifier for Verifier {
            fn verify(
                &self,
                host_id: Uuid,
                manifest: &HostManifest,
                is_fresh_data: bool,
                prefer_hash_match: bool,
            ) -> Result<TrustReport, VerifierError>;
        }
    }

    let fixture = Fixture::new(true);
    let host_id = Uuid::new_v4();
    fixture.status_store.insert_connected(host_id);

    let mut mock = MockVerifier::new();
    mock.expect_verify()
        .withf(move |id, _, is_fresh_data, prefer_hash_match| {
            *id == host_id && !is_fresh_data && !prefer_hash_match
        })
        .times(1)
        .returning(|_, manifest, _, _| Ok(TrustReport::new(POLICY_NAME, manifest.clone())));

    let manager = HostTrustManager::new(
        SchedulerConfig::default(),
        fixture.queue_store.clone(),
        fixture.host_store.clone(),
        fixture.status_store.clone(),
        fixture.fetcher.clone(),
        Arc::new(mock),
        Arc::new(NullSink),
    );

    manager.verify_hosts_async(&[host_id], false, false).await.unwrap();
    let queue_store = fixture.queue_store.clone();
    wait_until("stored-path completion", || queue_store.count() == 0).await;

    manager.shutdown().await;
}

#[test]
fn test_job_stage_ordering_matches_lifecycle() {
    assert!(JobStage::Pending < JobStage::GetHostDataQueued);
    assert!(JobStage::GetHostDataQueued < JobStage::GetHostDataStarted);
    assert!(JobStage::GetHostDataStarted < JobStage::FlavorVerifyQueued);
    assert!(JobStage::FlavorVerifyQueued < JobStage::FlavorVerifyStarted);
}
