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

//! Durable queue records and host collaborator data types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use host_manifest::HostManifest;

/// Action tag of host-verification queue records
pub const ACTION_HOST_VERIFY: &str = "host-verify";

/// Lifecycle state persisted on a queue record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueueState {
    New,
    Pending,
    Error,
}

/// Typed submission parameters, persisted with the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyParams {
    pub host_id: Uuid,
    pub fetch_host_data: bool,
    pub prefer_hash_match: bool,
}

/// A persisted unit of verification work. Created on submission, deleted on
/// completion or when definitively superseded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: Uuid,
    pub action: String,
    pub params: VerifyParams,
    pub state: QueueState,
}

impl QueueRecord {
    /// A record ready for `QueueStore::create`, which assigns the id
    pub fn new(params: VerifyParams) -> Self {
        Self { id: Uuid::nil(), action: ACTION_HOST_VERIFY.to_string(), params, state: QueueState::New }
    }
}

/// Search criteria for the durable queue store
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub action: Option<String>,
    pub host_id: Option<Uuid>,
}

/// A registered host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: Uuid,
    pub host_name: String,
    pub connection_string: String,
}

/// Host connectivity as last observed by the status store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostConnectionState {
    Connected,
    Disconnected,
    Unknown,
}

/// Latest known state of one host, including its last reported manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostStatus {
    pub host_id: Uuid,
    pub state: HostConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_manifest: Option<HostManifest>,
}

/// Search criteria for the host status store
#[derive(Debug, Clone)]
pub struct HostStatusFilter {
    pub host_id: Uuid,
    pub latest_per_host: bool,
}
