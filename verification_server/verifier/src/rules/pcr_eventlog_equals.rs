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

use std::collections::HashSet;

use flavor::FlavorPart;
use host_manifest::{EventLog, HostManifest};

use crate::error::VerifierError;
use crate::fault::Fault;
use crate::report::{MismatchField, RuleResult};
use crate::rules::VerificationRule;

/// Requires the host's event log for one PCR to contain exactly the flavor's
/// expected entries, keyed by `(type_id, measurement)`. Events carrying an
/// excluded tag are stripped from the actual log before comparison.
///
/// Entries whose key matches but whose name or tags differ are reported as
/// mismatch fields, not faults.
pub struct PcrEventLogEquals {
    expected: EventLog,
    exclude_tags: Option<HashSet<String>>,
    markers: Vec<FlavorPart>,
}

impl PcrEventLogEquals {
    pub fn new(expected: EventLog, marker: FlavorPart) -> Self {
        Self { expected, exclude_tags: None, markers: vec![marker] }
    }

    pub fn excluding(expected: EventLog, exclude_tags: HashSet<String>, marker: FlavorPart) -> Self {
        Self { expected, exclude_tags: Some(exclude_tags), markers: vec![marker] }
    }
}

impl VerificationRule for PcrEventLogEquals {
    fn name(&self) -> &'static str {
        if self.exclude_tags.is_some() {
            "PcrEventLogEqualsExcluding"
        } else {
            "PcrEventLogEquals"
        }
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

        let actual = match &self.exclude_tags {
            Some(exclude) => actual.without_tags(exclude),
            None => actual.clone(),
        };

        let mut faults = Vec::new();
        let (unexpected, actual_mismatches) = actual.subtract(&self.expected)?;
        let (missing, expected_mismatches) = self.expected.subtract(&actual)?;

        if !unexpected.is_empty() {
            faults.push(Fault::pcr_event_log_contains_unexpected_entries(pcr, unexpected.events));
        }
        if !missing.is_empty() {
            faults.push(Fault::pcr_event_log_missing_expected_entries(pcr, missing.events));
        }

        let mut mismatch_fields = Vec::new();
        if !expected_mismatches.is_empty() || !actual_mismatches.is_empty() {
            mismatch_fields.push(MismatchField::event_log_fields(
                pcr,
                expected_mismatches.events,
                actual_mismatches.events,
            ));
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults).with_mismatch_fields(mismatch_fields))
    }
}
