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

//! In-memory job state and the dedup/supersede decision.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::Host;

/// Stages a job moves through. The stage is written only under the manager
/// lock; the dedup decision reads it to judge whether an in-flight job still
/// guarantees a new request's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobStage {
    /// Persisted, not yet dispatched
    Pending,
    GetHostDataQueued,
    GetHostDataStarted,
    FlavorVerifyQueued,
    FlavorVerifyStarted,
}

/// One in-flight verification job, keyed by host id in the manager's job map
#[derive(Debug, Clone)]
pub struct VerifyTrustJob {
    pub cancel: CancellationToken,
    pub host: Option<Host>,
    pub queue_record_id: Uuid,
    pub fetch_host_data: bool,
    pub prefer_hash_match: bool,
    pub stage: JobStage,
}

impl VerifyTrustJob {
    pub fn new(queue_record_id: Uuid, fetch_host_data: bool, prefer_hash_match: bool) -> Self {
        Self {
            cancel: CancellationToken::new(),
            host: None,
            queue_record_id,
            fetch_host_data,
            prefer_hash_match,
            stage: JobStage::Pending,
        }
    }
}

/// Outcome of weighing a new request against the in-flight job for its host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    /// No job in flight; submit as requested
    New,
    /// The in-flight job already guarantees the request; drop the request
    Skip,
    /// Cancel the in-flight job and submit with the merged flags
    Replace { fetch_host_data: bool, prefer_hash_match: bool },
}

/// Weigh a new request against the existing in-flight job for the same host.
///
/// Both flags are ordered strength axes (`true` is stronger). The request is
/// skipped only when the existing job is at-least-as-strong on both axes AND
/// has not progressed past the stage that still guarantees the request's
/// intent: a fresh-data request is covered while the existing job fetches and
/// the fetch has at most started; a no-fetch request is covered until the
/// verify phase has started. Anything else cancels the existing job and
/// replaces it with the OR-merge of both requests' flags, so neither side's
/// stronger axis is lost.
pub fn decide_submit(
    existing: Option<&VerifyTrustJob>,
    fetch_host_data: bool,
    prefer_hash_match: bool,
) -> SubmitDecision {
    let Some(job) = existing else {
        return SubmitDecision::New;
    };

    let prefer_covered = job.prefer_hash_match || !prefer_hash_match;
    let fetch_covered = if fetch_host_data {
        job.fetch_host_data && job.stage <= JobStage::GetHostDataStarted
    } else {
        job.stage <= JobStage::FlavorVerifyQueued
    };

    if prefer_covered && fetch_covered {
        return SubmitDecision::Skip;
    }

    SubmitDecision::Replace {
        fetch_host_data: fetch_host_data || job.fetch_host_data,
        prefer_hash_match: prefer_hash_match || job.prefer_hash_match,
    }
}
