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

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use flavor::FlavorPart;
use host_manifest::HostManifest;

use crate::error::VerifierError;
use crate::fault::Fault;
use crate::report::RuleResult;
use crate::rules::VerificationRule;

/// Byte-exact comparison of the host's provisioned asset-tag digest against
/// the digest the ASSET_TAG flavor expects.
pub struct AssetTagMatches {
    expected_digest: Option<String>,
    markers: Vec<FlavorPart>,
}

impl AssetTagMatches {
    pub fn new(expected_digest: Option<String>, marker: FlavorPart) -> Self {
        Self { expected_digest, markers: vec![marker] }
    }
}

impl VerificationRule for AssetTagMatches {
    fn name(&self) -> &'static str {
        "AssetTagMatches"
    }

    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();

        match (&host_manifest.asset_tag_digest, &self.expected_digest) {
            (None, _) => faults.push(Fault::asset_tag_missing()),
            (Some(_), None) => faults.push(Fault::asset_tag_not_provisioned()),
            (Some(actual), Some(expected)) => {
                let actual_bytes = BASE64.decode(actual.as_bytes()).map_err(|e| {
                    VerifierError::InputError(format!("Failed to decode host asset-tag digest: {}", e))
                })?;
                let expected_bytes = BASE64.decode(expected.as_bytes()).map_err(|e| {
                    VerifierError::InputError(format!("Failed to decode flavor asset-tag digest: {}", e))
                })?;
                if actual_bytes != expected_bytes {
                    faults.push(Fault::asset_tag_mismatch(expected, actual));
                }
            }
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}
