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

//! Asynchronous host-trust verification job manager.
//!
//! Accepts verify requests for a fleet of hosts, deduplicates in-flight
//! work per host, persists pending work for crash recovery, dispatches to a
//! fixed worker pool through bounded channels, drives host-data-fetch
//! sub-jobs, and supports cooperative cancellation and graceful shutdown.

pub mod config;
pub mod error;
pub mod job;
pub mod manager;
pub mod traits;
pub mod types;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use job::JobStage;
pub use manager::{HostTrustManager, JobSnapshot};
pub use traits::{
    HostDataFetcher, HostDataReceiver, HostStatusStore, HostStore, HostVerifier, QueueStore,
    TrustReportSink,
};
pub use types::{
    Host, HostConnectionState, HostStatus, HostStatusFilter, QueueFilter, QueueRecord, QueueState,
    VerifyParams, ACTION_HOST_VERIFY,
};
