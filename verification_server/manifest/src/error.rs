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

//! Error types for host manifest parsing and event-log computation.

use thiserror::Error;

/// Host manifest operation error
#[derive(Error, Debug, Clone)]
pub enum ManifestError {
    /// Input data is malformed or violates a manifest invariant
    #[error("Invalid manifest input: {0}")]
    InputError(String),

    /// Hash algorithm not supported as a PCR bank
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// PCR index outside the valid register range
    #[error("Invalid PCR index: {0}. Valid range: 0-23")]
    InvalidPcrIndex(u32),

    /// Two event logs over different PCRs cannot be compared
    #[error("PCR mismatch: cannot compare event log for {left} against {right}")]
    PcrMismatch { left: String, right: String },

    /// Failure inside the crypto backend
    #[error("Crypto operation failed: {0}")]
    InternalError(String),
}
