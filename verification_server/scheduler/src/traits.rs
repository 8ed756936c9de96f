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

//! Collaborator contracts at the job manager's boundary. Stores are
//! synchronous; host-data retrieval is asynchronous and callback-driven so
//! it never occupies a worker while waiting on the network.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use host_manifest::HostManifest;
use policy_verifier::{TrustReport, VerifierError};

use crate::error::SchedulerError;
use crate::types::{Host, HostStatus, HostStatusFilter, QueueFilter, QueueRecord};

/// Durable queue store. Must provide at-least-once durability across
/// process restart; `create` assigns the record id.
pub trait QueueStore: Send + Sync {
    fn create(&self, record: QueueRecord) -> Result<QueueRecord, SchedulerError>;
    fn retrieve(&self, id: Uuid) -> Result<Option<QueueRecord>, SchedulerError>;
    fn update(&self, record: &QueueRecord) -> Result<(), SchedulerError>;
    fn delete(&self, id: Uuid) -> Result<(), SchedulerError>;
    fn search(&self, filter: Option<&QueueFilter>) -> Result<Vec<QueueRecord>, SchedulerError>;
}

/// Host registry
pub trait HostStore: Send + Sync {
    fn retrieve(&self, host_id: Uuid) -> Result<Host, SchedulerError>;
}

/// Latest-per-host status records; only `Connected` statuses carry a usable
/// manifest for the no-fetch verification path.
pub trait HostStatusStore: Send + Sync {
    fn search(&self, filter: &HostStatusFilter) -> Result<Vec<HostStatus>, SchedulerError>;
}

/// Completion callback for asynchronous host-data retrieval
#[async_trait]
pub trait HostDataReceiver: Send + Sync {
    async fn process_host_data(
        &self,
        host: Host,
        manifest: Option<HostManifest>,
        prefer_hash_match: bool,
        error: Option<String>,
    );
}

/// Out-of-band host manifest retrieval
#[async_trait]
pub trait HostDataFetcher: Send + Sync {
    /// Kick off retrieval; completion invokes `receiver.process_host_data`.
    async fn retrieve_async(
        &self,
        host: Host,
        prefer_hash_match: bool,
        receiver: Arc<dyn HostDataReceiver>,
    ) -> Result<(), SchedulerError>;

    /// Synchronous retrieval for the direct verification path
    async fn retrieve(&self, host: &Host) -> Result<HostManifest, SchedulerError>;
}

/// The job manager's sole call into the rule-evaluation subsystem. Must be
/// safe to call concurrently for different host ids.
pub trait HostVerifier: Send + Sync {
    fn verify(
        &self,
        host_id: Uuid,
        manifest: &HostManifest,
        is_fresh_data: bool,
        prefer_hash_match: bool,
    ) -> Result<TrustReport, VerifierError>;
}

/// Downstream report persistence; boundary only
pub trait TrustReportSink: Send + Sync {
    fn store(&self, report: TrustReport) -> Result<(), SchedulerError>;
}
