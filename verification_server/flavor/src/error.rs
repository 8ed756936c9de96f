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

/// Flavor model and template resolution error
#[derive(Error, Debug, Clone)]
pub enum FlavorError {
    /// Flavor content is malformed or fails schema-level checks
    #[error("Invalid flavor: {0}")]
    InputError(String),

    /// A flavor PCR instance declares both equals and includes event-log rules
    #[error("Flavor PCR {0} declares both eventlog_equals and eventlog_includes")]
    ExclusiveEventLogRules(String),

    /// Flavor templates declare both equals and includes for the same PCR
    #[error("Flavor templates declare both equals and includes rules for {0}")]
    PcrRuleConflict(String),

    /// Signature or certificate handling failure
    #[error("Crypto operation failed: {0}")]
    CryptoError(String),
}
