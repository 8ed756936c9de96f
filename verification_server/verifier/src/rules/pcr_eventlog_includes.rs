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
use host_manifest::{EventLog, HostManifest};

use crate::error::VerifierError;
use crate::fault::Fault;
use crate::report::RuleResult;
use crate::rules::VerificationRule;

/// Requires every expected event to be present in the host's event log for
/// one PCR. The actual log may carry extra events without fault; this is a
/// subset check, not equality.
pub struct PcrEventLogIncludes {
    expected: EventLog,
    markers: Vec<FlavorPart>,
}

impl PcrEventLogIncludes {
    pub fn new(expected: EventLog, marker: FlavorPart) -> Self {
        Self { expected, markers: vec![marker] }
    }
}

impl VerificationRule for PcrEventLogIncludes {
    fn name(&self) -> &'static str {
        "PcrEventLogIncludes"
    }

    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let pcr = self.expected.pcr;

        if host_manifest.pcr_manifest.is_empty() {
            return Ok(RuleResult::new(self.name(), self.markers.clone(), vec![Fault::pcr_manifest_missing()]));
        }
        let Some(actual) = host_manifest.pcr_manifest.event_log(pcr.bank, pcr.index) else {
            return Ok(RuleResult::new(
                self.name(),
                self.markers.clone(),
                vec![Fault::pcr_event_log_missing(pcr)],
            ));
        };

        let mut faults = Vec::new();
        let (missing, _) = self.expected.subtract(actual)?;
        if !missing.is_empty() {
            faults.push(Fault::pcr_event_log_missing_expected_entries(pcr, missing.events));
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}
