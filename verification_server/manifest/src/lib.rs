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

//! Host manifest model and event-log algebra.
//!
//! A host manifest is the read-only snapshot of a host's runtime measurement
//! state: its identity, its PCR readings per hash bank, the event logs whose
//! replay must reproduce those readings, and the auxiliary artifacts
//! (asset-tag digest, AIK certificate, software measurement logs) the policy
//! rules evaluate against a flavor.

pub mod error;
pub mod eventlog;
pub mod manifest;

pub use error::ManifestError;
pub use eventlog::{EventLog, EventLogEntry};
pub use manifest::{
    DigestAlgorithm, HostInfo, HostManifest, HostVendor, Pcr, PcrManifest, PcrReading, TpmVersion,
};
