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
use host_manifest::{HostManifest, Pcr};

use crate::error::VerifierError;
use crate::fault::Fault;
use crate::report::RuleResult;
use crate::rules::VerificationRule;

/// Self-consistency check: replaying the host's own event log for one PCR
/// must reproduce the host's own reading. This rule never consults the
/// flavor's expected value.
pub struct PcrEventLogIntegrity {
    pcr: Pcr,
    markers: Vec<FlavorPart>,
}

impl PcrEventLogIntegrity {
    pub fn new(pcr: Pcr, marker: FlavorPart) -> Self {
        Self { pcr, markers: vec![marker] }
    }
}

impl VerificationRule for PcrEventLogIntegrity {
    fn name(&self) -> &'static str {
        "PcrEventLogIntegrity"
    }

    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();

        if host_manifest.pcr_manifest.is_empty() {
            return Ok(RuleResult::new(self.name(), self.markers.clone(), vec![Fault::pcr_manifest_missing()]));
        }
        let Some(reading) = host_manifest.pcr_manifest.pcr_value(self.pcr.bank, self.pcr.index) else {
            return Ok(RuleResult::new(
                self.name(),
                self.markers.clone(),
                vec![Fault::pcr_value_missing(self.pcr)],
            ));
        };
        let Some(event_log) = host_manifest.pcr_manifest.event_log(self.pcr.bank, self.pcr.index) else {
            return Ok(RuleResult::new(
                self.name(),
                self.markers.clone(),
                vec![Fault::pcr_event_log_missing(self.pcr)],
            ));
        };

        let calculated = event_log.replay()?;
        if !calculated.eq_ignore_ascii_case(&reading.value) {
            faults.push(Fault::pcr_event_log_invalid(self.pcr, &calculated, &reading.value));
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}
