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

use thiserror::Error;
use uuid::Uuid;

/// Job manager and collaborator error
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Durable queue or host store failure
    #[error("Store operation failed: {0}")]
    StoreError(String),

    /// Host record does not exist
    #[error("Host {0} not found")]
    HostNotFound(Uuid),

    /// No connected host status carries a usable manifest
    #[error("Host {0} has no usable manifest")]
    HostNotConnected(Uuid),

    /// Out-of-band host data retrieval failed
    #[error("Host data fetch failed for host {0}: {1}")]
    FetchError(Uuid, String),

    /// The manager no longer accepts dispatch
    #[error("Job manager is shutting down")]
    ShuttingDown,

    /// Internal dispatch channel closed unexpectedly
    #[error("Dispatch channel closed")]
    DispatchClosed,

    #[error(transparent)]
    Verifier(#[from] policy_verifier::VerifierError),
}
