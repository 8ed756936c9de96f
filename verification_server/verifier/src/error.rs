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

use flavor::FlavorError;
use host_manifest::ManifestError;

/// Rule-evaluation infrastructure error. A host failing a check is never an
/// error; it is a fault on the rule result.
#[derive(Error, Debug)]
pub enum VerifierError {
    /// Malformed input that prevents a rule from evaluating at all
    #[error("Invalid rule input: {0}")]
    InputError(String),

    /// No rule builder exists for this vendor and TPM version
    #[error("Unsupported host platform: vendor {vendor}, TPM {tpm_version}")]
    UnsupportedHostPlatform { vendor: String, tpm_version: String },

    /// A flavor or template carries an invalid rule combination
    #[error("Rule configuration error: {0}")]
    RuleConfiguration(String),

    /// Failure inside the crypto backend
    #[error("Crypto operation failed: {0}")]
    CryptoError(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Flavor(#[from] FlavorError),
}
