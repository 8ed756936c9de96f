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

//! The host trust manager: submission, dedup/supersede, durable queueing,
//! dispatch, worker pool, crash recovery, cancellation and shutdown.
//!
//! Submission persists every accepted job before any dispatch, so a
//! dispatched job always has a durable record. Workers drain two bounded
//! channels (manifest already in hand vs. fetch latest from store) fed by an
//! internal dispatch queue; submission therefore returns as soon as
//! persistence succeeds. All multi-step mutations of the job map happen
//! under one mutex, so concurrent submissions for the same host cannot race
//! on the dedup decision.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use host_manifest::HostManifest;
use policy_verifier::TrustReport;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::job::{decide_submit, JobStage, SubmitDecision, VerifyTrustJob};
use crate::traits::{
    HostDataFetcher, HostDataReceiver, HostStatusStore, HostStore, HostVerifier, QueueStore,
    TrustReportSink,
};
use crate::types::{
    Host, HostConnectionState, HostStatusFilter, QueueFilter, QueueRecord, QueueState, VerifyParams,
    ACTION_HOST_VERIFY,
};

/// Work item moved from submission to the worker channels
enum DispatchRequest {
    /// Manifest freshly fetched; the worker skips the store lookup
    Manifest { host_id: Uuid, manifest: Box<HostManifest>, prefer_hash_match: bool },
    /// The worker pulls the latest stored manifest itself
    Stored { host_id: Uuid },
}

/// Observable state of one in-flight job
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub host_id: Uuid,
    pub stage: JobStage,
    pub fetch_host_data: bool,
    pub prefer_hash_match: bool,
    pub cancelled: bool,
}

struct Inner {
    jobs: Mutex<HashMap<Uuid, VerifyTrustJob>>,
    queue_store: Arc<dyn QueueStore>,
    host_store: Arc<dyn HostStore>,
    host_status_store: Arc<dyn HostStatusStore>,
    fetcher: Arc<dyn HostDataFetcher>,
    verifier: Arc<dyn HostVerifier>,
    report_sink: Arc<dyn TrustReportSink>,
    dispatch_tx: mpsc::Sender<DispatchRequest>,
    quit: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Asynchronous per-host verification job manager
pub struct HostTrustManager {
    inner: Arc<Inner>,
}

impl HostTrustManager {
    /// Create the manager and start its dispatcher and worker pool. Must be
    /// called within a tokio runtime.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SchedulerConfig,
        queue_store: Arc<dyn QueueStore>,
        host_store: Arc<dyn HostStore>,
        host_status_store: Arc<dyn HostStatusStore>,
        fetcher: Arc<dyn HostDataFetcher>,
        verifier: Arc<dyn HostVerifier>,
        report_sink: Arc<dyn TrustReportSink>,
    ) -> Self {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_buffer.max(1));
        let (manifest_tx, manifest_rx) = mpsc::channel(config.channel_buffer.max(1));
        let (stored_tx, stored_rx) = mpsc::channel(config.channel_buffer.max(1));
        let quit = CancellationToken::new();

        let inner = Arc::new(Inner {
            jobs: Mutex::new(HashMap::new()),
            queue_store,
            host_store,
            host_status_store,
            fetcher,
            verifier,
            report_sink,
            dispatch_tx,
            quit: quit.clone(),
            workers: Mutex::new(Vec::new()),
        });

        let mut handles = Vec::new();
        handles.push(tokio::spawn(run_dispatcher(dispatch_rx, manifest_tx, stored_tx, quit.clone())));

        let manifest_rx = Arc::new(AsyncMutex::new(manifest_rx));
        let stored_rx = Arc::new(AsyncMutex::new(stored_rx));
        for _ in 0..config.verifier_workers.max(1) {
            handles.push(tokio::spawn(run_worker(
                inner.clone(),
                manifest_rx.clone(),
                stored_rx.clone(),
                quit.clone(),
            )));
        }
        *inner.workers.lock() = handles;

        Self { inner }
    }

    /// Submit verification work for a batch of hosts.
    ///
    /// For each host the request is weighed against any in-flight job
    /// (skip / cancel-and-replace, see [`crate::job::decide_submit`]).
    /// Every accepted job is persisted to the durable queue before any
    /// dispatch happens; a persistence failure fails the whole call before
    /// dispatch, so a dispatched job always has a durable record.
    ///
    /// # Errors
    ///
    /// * `SchedulerError::ShuttingDown` - the manager no longer accepts work.
    /// * `SchedulerError::StoreError` - persisting a queue record failed.
    pub async fn verify_hosts_async(
        &self,
        host_ids: &[Uuid],
        fetch_host_data: bool,
        prefer_hash_match: bool,
    ) -> Result<(), SchedulerError> {
        if self.inner.quit.is_cancelled() {
            return Err(SchedulerError::ShuttingDown);
        }

        // Phase 1: decide and persist, serialized under the manager lock
        let mut accepted: Vec<(Uuid, VerifyParams)> = Vec::new();
        {
            let mut jobs = self.inner.jobs.lock();
            for &host_id in host_ids {
                let decision = decide_submit(jobs.get(&host_id), fetch_host_data, prefer_hash_match);
                match decision {
                    SubmitDecision::Skip => {
                        debug!("Duplicate verify request for host {} skipped", host_id);
                    }
                    SubmitDecision::New => {
                        let params = VerifyParams { host_id, fetch_host_data, prefer_hash_match };
                        let record = self.inner.queue_store.create(QueueRecord::new(params))?;
                        jobs.insert(host_id, VerifyTrustJob::new(record.id, fetch_host_data, prefer_hash_match));
                        accepted.push((record.id, params));
                    }
                    SubmitDecision::Replace { fetch_host_data: fetch, prefer_hash_match: prefer } => {
                        // Cancel the loser before the winner is persisted
                        if let Some(old) = jobs.remove(&host_id) {
                            info!("Superseding in-flight verify job for host {}", host_id);
                            old.cancel.cancel();
                            if let Err(e) = self.inner.queue_store.delete(old.queue_record_id) {
                                warn!("Failed to delete superseded queue record: {}", e);
                            }
                        }
                        let params =
                            VerifyParams { host_id, fetch_host_data: fetch, prefer_hash_match: prefer };
                        let record = self.inner.queue_store.create(QueueRecord::new(params))?;
                        jobs.insert(host_id, VerifyTrustJob::new(record.id, fetch, prefer));
                        accepted.push((record.id, params));
                    }
                }
            }
        }

        // Phase 2: dispatch. A dispatch failure keeps the record for the
        // next queue scan instead of failing the batch.
        for (record_id, params) in accepted {
            if let Err(e) = self.dispatch(record_id, params).await {
                error!("Failed to dispatch verify job for host {}: {}", params.host_id, e);
                self.inner.fail_entry(params.host_id, record_id);
            }
        }
        Ok(())
    }

    /// Rehydrate and resubmit persisted jobs after a restart, partitioned by
    /// whether each recovered job requires fresh host data.
    ///
    /// # Errors
    ///
    /// * `SchedulerError::StoreError` - scanning the durable queue failed.
    pub async fn process_queue(&self) -> Result<(), SchedulerError> {
        let filter = QueueFilter { action: Some(ACTION_HOST_VERIFY.to_string()), host_id: None };
        let records = self.inner.queue_store.search(Some(&filter))?;
        info!("Queue scan found {} persisted verify records", records.len());

        let mut fetch_jobs: Vec<(Uuid, VerifyParams)> = Vec::new();
        let mut direct_jobs: Vec<(Uuid, VerifyParams)> = Vec::new();
        {
            let mut jobs = self.inner.jobs.lock();
            for record in records {
                let host_id = record.params.host_id;
                if jobs.contains_key(&host_id) {
                    continue;
                }
                jobs.insert(
                    host_id,
                    VerifyTrustJob::new(
                        record.id,
                        record.params.fetch_host_data,
                        record.params.prefer_hash_match,
                    ),
                );
                if record.params.fetch_host_data {
                    fetch_jobs.push((record.id, record.params));
                } else {
                    direct_jobs.push((record.id, record.params));
                }
            }
        }

        for (record_id, params) in fetch_jobs.into_iter().chain(direct_jobs) {
            if let Err(e) = self.dispatch(record_id, params).await {
                error!("Failed to resubmit verify job for host {}: {}", params.host_id, e);
                self.inner.fail_entry(params.host_id, record_id);
            }
        }
        Ok(())
    }

    /// Stop accepting dispatch and wait for every worker to finish its
    /// current unit of work.
    pub async fn shutdown(&self) {
        self.inner.quit.cancel();
        let handles: Vec<JoinHandle<()>> = self.inner.workers.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker task ended abnormally: {}", e);
            }
        }
        info!("Host trust manager shut down");
    }

    /// Direct verification path: fetch (or load) the host's manifest and
    /// verify inline, bypassing the queue and the dedup protocol.
    ///
    /// # Errors
    ///
    /// * `SchedulerError::HostNotFound` - the host is not registered.
    /// * `SchedulerError::HostNotConnected` - no usable stored manifest.
    /// * `SchedulerError::FetchError` - the out-of-band retrieval failed.
    /// * `SchedulerError::Verifier` - rule evaluation failed.
    pub async fn verify_host(
        &self,
        host_id: Uuid,
        fetch_host_data: bool,
        prefer_hash_match: bool,
    ) -> Result<TrustReport, SchedulerError> {
        let manifest = if fetch_host_data {
            let host = self.inner.host_store.retrieve(host_id)?;
            self.inner.fetcher.retrieve(&host).await?
        } else {
            self.inner.latest_manifest(host_id)?
        };
        let report = self.inner.verifier.verify(host_id, &manifest, fetch_host_data, prefer_hash_match)?;
        self.inner.report_sink.store(report.clone())?;
        Ok(report)
    }

    /// Observable state of the in-flight job for a host, if any
    pub fn job_snapshot(&self, host_id: Uuid) -> Option<JobSnapshot> {
        let jobs = self.inner.jobs.lock();
        jobs.get(&host_id).map(|job| JobSnapshot {
            host_id,
            stage: job.stage,
            fetch_host_data: job.fetch_host_data,
            prefer_hash_match: job.prefer_hash_match,
            cancelled: job.cancel.is_cancelled(),
        })
    }

    /// Number of in-flight jobs
    pub fn in_flight_count(&self) -> usize {
        self.inner.jobs.lock().len()
    }

    /// Fetch completion callback target for the host data fetcher
    pub fn receiver(&self) -> Arc<dyn HostDataReceiver> {
        Arc::new(ManagerReceiver { inner: self.inner.clone() })
    }

    async fn dispatch(&self, record_id: Uuid, params: VerifyParams) -> Result<(), SchedulerError> {
        let inner = &self.inner;
        if inner.quit.is_cancelled() {
            return Err(SchedulerError::ShuttingDown);
        }

        if params.fetch_host_data {
            let host = inner.host_store.retrieve(params.host_id)?;
            if !inner.advance_stage(params.host_id, record_id, JobStage::GetHostDataQueued, Some(&host)) {
                return Ok(());
            }
            let receiver: Arc<dyn HostDataReceiver> = Arc::new(ManagerReceiver { inner: inner.clone() });
            inner.fetcher.retrieve_async(host, params.prefer_hash_match, receiver).await?;
            inner.advance_stage(params.host_id, record_id, JobStage::GetHostDataStarted, None);
        } else {
            inner
                .dispatch_tx
                .send(DispatchRequest::Stored { host_id: params.host_id })
                .await
                .map_err(|_| SchedulerError::DispatchClosed)?;
            inner.advance_stage(params.host_id, record_id, JobStage::FlavorVerifyQueued, None);
        }
        Ok(())
    }
}

impl Inner {
    /// Move the job owning `record_id` to `stage`. Returns false when the
    /// job was superseded or cancelled in the meantime.
    fn advance_stage(&self, host_id: Uuid, record_id: Uuid, stage: JobStage, host: Option<&Host>) -> bool {
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(&host_id) {
            Some(job)
                if job.queue_record_id == record_id
                    && !job.cancel.is_cancelled()
                    && stage > job.stage =>
            {
                job.stage = stage;
                if let Some(host) = host {
                    job.host = Some(host.clone());
                }
                true
            }
            _ => false,
        }
    }

    /// Final cancellation check before the flavor-verify phase; marks the
    /// job started and hands back its token and parameters.
    fn begin_verify_phase(&self, host_id: Uuid) -> Option<(CancellationToken, Uuid, bool)> {
        let cancelled = {
            let mut jobs = self.jobs.lock();
            let job = jobs.get_mut(&host_id)?;
            if job.cancel.is_cancelled() {
                Some(job.queue_record_id)
            } else {
                job.stage = JobStage::FlavorVerifyStarted;
                return Some((job.cancel.clone(), job.queue_record_id, job.prefer_hash_match));
            }
        };
        if let Some(record_id) = cancelled {
            self.cleanup_cancelled(host_id, record_id);
        }
        None
    }

    /// A cancelled job still cleans up its durable queue record
    fn cleanup_cancelled(&self, host_id: Uuid, record_id: Uuid) {
        {
            let mut jobs = self.jobs.lock();
            if let Some(job) = jobs.get(&host_id) {
                if job.queue_record_id == record_id {
                    jobs.remove(&host_id);
                }
            }
        }
        if let Err(e) = self.queue_store.delete(record_id) {
            warn!("Failed to delete queue record for cancelled job: {}", e);
        }
        debug!("Cancelled verify job for host {} cleaned up", host_id);
    }

    /// Completion cleanup: remove the in-memory entry and its durable
    /// record. When no in-memory entry exists (crash/restart race), sweep
    /// the durable store by host id so no record leaks.
    fn delete_entry(&self, host_id: Uuid, record_id: Uuid) {
        let owned = {
            let mut jobs = self.jobs.lock();
            match jobs.get(&host_id) {
                Some(job) if job.queue_record_id == record_id => {
                    jobs.remove(&host_id);
                    Some(true)
                }
                Some(_) => Some(false), // superseded; the successor owns its own record
                None => None,
            }
        };

        match owned {
            Some(_) => {
                if let Err(e) = self.queue_store.delete(record_id) {
                    warn!("Failed to delete queue record {}: {}", record_id, e);
                }
            }
            None => {
                let filter = QueueFilter {
                    action: Some(ACTION_HOST_VERIFY.to_string()),
                    host_id: Some(host_id),
                };
                match self.queue_store.search(Some(&filter)) {
                    Ok(records) => {
                        for record in records {
                            if let Err(e) = self.queue_store.delete(record.id) {
                                warn!("Failed to delete dangling queue record {}: {}", record.id, e);
                            }
                        }
                    }
                    Err(e) => warn!("Failed to sweep dangling queue records for host {}: {}", host_id, e),
                }
            }
        }
    }

    /// Failure cleanup: drop the in-memory entry but keep the durable
    /// record (marked Error) so the next queue scan retries it.
    fn fail_entry(&self, host_id: Uuid, record_id: Uuid) {
        {
            let mut jobs = self.jobs.lock();
            if let Some(job) = jobs.get(&host_id) {
                if job.queue_record_id == record_id {
                    jobs.remove(&host_id);
                }
            }
        }
        if let Ok(Some(mut record)) = self.queue_store.retrieve(record_id) {
            record.state = QueueState::Error;
            if let Err(e) = self.queue_store.update(&record) {
                warn!("Failed to mark queue record {} as errored: {}", record_id, e);
            }
        }
    }

    /// Latest usable manifest for the no-fetch path; only a connected host
    /// status carries one.
    fn latest_manifest(&self, host_id: Uuid) -> Result<HostManifest, SchedulerError> {
        let statuses =
            self.host_status_store.search(&HostStatusFilter { host_id, latest_per_host: true })?;
        statuses
            .into_iter()
            .find(|s| s.state == HostConnectionState::Connected)
            .and_then(|s| s.host_manifest)
            .ok_or(SchedulerError::HostNotConnected(host_id))
    }

    fn run_verify(
        &self,
        host_id: Uuid,
        record_id: Uuid,
        manifest: &HostManifest,
        is_fresh_data: bool,
        prefer_hash_match: bool,
    ) {
        match self.verifier.verify(host_id, manifest, is_fresh_data, prefer_hash_match) {
            Ok(report) => {
                if let Err(e) = self.report_sink.store(report) {
                    error!("Failed to store trust report for host {}: {}", host_id, e);
                }
                info!("Host {} verification completed", host_id);
                self.delete_entry(host_id, record_id);
            }
            Err(e) => {
                error!("Verification failed for host {}: {}", host_id, e);
                self.fail_entry(host_id, record_id);
            }
        }
    }

    async fn handle_manifest_job(&self, host_id: Uuid, manifest: HostManifest, prefer_hash_match: bool) {
        let Some((_cancel, record_id, _)) = self.begin_verify_phase(host_id) else {
            return;
        };
        self.run_verify(host_id, record_id, &manifest, true, prefer_hash_match);
    }

    async fn handle_stored_job(&self, host_id: Uuid) {
        // Top-of-loop cancellation check
        let (cancelled, record_id) = {
            let jobs = self.jobs.lock();
            match jobs.get(&host_id) {
                Some(job) => (job.cancel.is_cancelled(), job.queue_record_id),
                None => return,
            }
        };
        if cancelled {
            self.cleanup_cancelled(host_id, record_id);
            return;
        }

        let manifest = match self.latest_manifest(host_id) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!("No usable manifest for host {}: {}", host_id, e);
                self.fail_entry(host_id, record_id);
                return;
            }
        };

        // Re-check before starting the flavor-verify phase
        let Some((_cancel, record_id, prefer_hash_match)) = self.begin_verify_phase(host_id) else {
            return;
        };
        self.run_verify(host_id, record_id, &manifest, false, prefer_hash_match);
    }
}

struct ManagerReceiver {
    inner: Arc<Inner>,
}

#[async_trait]
impl HostDataReceiver for ManagerReceiver {
    async fn process_host_data(
        &self,
        host: Host,
        manifest: Option<HostManifest>,
        prefer_hash_match: bool,
        error: Option<String>,
    ) {
        let inner = &self.inner;

        let snapshot = {
            let jobs = inner.jobs.lock();
            jobs.get(&host.id)
                .map(|job| (job.queue_record_id, job.cancel.is_cancelled(), job.prefer_hash_match))
        };
        let Some((record_id, cancelled, job_prefer)) = snapshot else {
            debug!("Fetch completion for host {} has no in-flight job", host.id);
            return;
        };
        // A completion from a superseded fetch must not touch the successor
        if cancelled || job_prefer != prefer_hash_match {
            debug!("Stale fetch completion for host {} dropped", host.id);
            return;
        }

        let manifest = match (manifest, error) {
            (_, Some(err)) => {
                error!("Host data fetch failed for host {}: {}", host.id, err);
                inner.fail_entry(host.id, record_id);
                return;
            }
            (None, None) => {
                error!("Host data fetch returned no manifest for host {}", host.id);
                inner.fail_entry(host.id, record_id);
                return;
            }
            (Some(manifest), None) => manifest,
        };

        // Advance to the verify queue unless the job was cancelled,
        // superseded, or re-fetched with different hash-match semantics
        let proceed = {
            let mut jobs = inner.jobs.lock();
            match jobs.get_mut(&host.id) {
                Some(job)
                    if !job.cancel.is_cancelled()
                        && job.prefer_hash_match == prefer_hash_match =>
                {
                    job.stage = JobStage::FlavorVerifyQueued;
                    job.host = Some(host.clone());
                    true
                }
                _ => false,
            }
        };
        if !proceed {
            debug!("Stale fetch completion for host {} dropped", host.id);
            return;
        }

        if inner
            .dispatch_tx
            .send(DispatchRequest::Manifest {
                host_id: host.id,
                manifest: Box::new(manifest),
                prefer_hash_match,
            })
            .await
            .is_err()
        {
            error!("Dispatch channel closed; verify job for host {} not enqueued", host.id);
        }
    }
}

/// Forwards dispatch requests into the worker channels
async fn run_dispatcher(
    mut dispatch_rx: mpsc::Receiver<DispatchRequest>,
    manifest_tx: mpsc::Sender<(Uuid, Box<HostManifest>, bool)>,
    stored_tx: mpsc::Sender<Uuid>,
    quit: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = quit.cancelled() => break,
            request = dispatch_rx.recv() => match request {
                Some(DispatchRequest::Manifest { host_id, manifest, prefer_hash_match }) => {
                    if manifest_tx.send((host_id, manifest, prefer_hash_match)).await.is_err() {
                        break;
                    }
                }
                Some(DispatchRequest::Stored { host_id }) => {
                    if stored_tx.send(host_id).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

async fn recv_shared<T>(rx: &Arc<AsyncMutex<mpsc::Receiver<T>>>) -> Option<T> {
    rx.lock().await.recv().await
}

/// One worker: drains both verify channels until shutdown. Cancellation of
/// individual jobs is checked inside the handlers; quit is only honored
/// between units of work, so a running job is never abandoned mid-flight.
async fn run_worker(
    inner: Arc<Inner>,
    manifest_rx: Arc<AsyncMutex<mpsc::Receiver<(Uuid, Box<HostManifest>, bool)>>>,
    stored_rx: Arc<AsyncMutex<mpsc::Receiver<Uuid>>>,
    quit: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = quit.cancelled() => break,
            job = recv_shared(&manifest_rx) => match job {
                Some((host_id, manifest, prefer_hash_match)) => {
                    inner.handle_manifest_job(host_id, *manifest, prefer_hash_match).await;
                }
                None => break,
            },
            host_id = recv_shared(&stored_rx) => match host_id {
                Some(host_id) => inner.handle_stored_job(host_id).await,
                None => break,
            },
        }
    }
}
