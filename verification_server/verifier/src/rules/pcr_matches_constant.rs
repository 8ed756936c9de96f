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

use flavor::FlavorPart;
use host_manifest::{HostManifest, PcrReading};

use crate::error::VerifierError;
use crate::fault::Fault;
use crate::report::RuleResult;
use crate::rules::VerificationRule;

/// Compares one PCR reading against the flavor's expected constant value.
pub struct PcrMatchesConstant {
    expected: PcrReading,
    markers: Vec<FlavorPart>,
}

impl PcrMatchesConstant {
    pub fn new(expected: PcrReading, marker: FlavorPart) -> Self {
        Self { expected, markers: vec![marker] }
    }
}

impl VerificationRule for PcrMatchesConstant {
    fn name(&self) -> &'static str {
        "PcrMatchesConstant"
    }

    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();
        let pcr = self.expected.pcr;

        if host_manifest.pcr_manifest.is_empty() {
            faults.push(Fault::pcr_manifest_missing());
        } else {
            match host_manifest.pcr_manifest.pcr_value(pcr.bank, pcr.index) {
                None => faults.push(Fault::pcr_value_missing(pcr)),
                Some(actual) if !actual.value.eq_ignore_ascii_case(&self.expected.value) => {
                    faults.push(Fault::pcr_value_mismatch(pcr, &self.expected.value, &actual.value));
                }
                Some(_) => {}
            }
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}
