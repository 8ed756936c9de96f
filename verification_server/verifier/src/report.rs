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

//! Rule results and the aggregated trust report.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flavor::FlavorPart;
use host_manifest::{DigestAlgorithm, EventLogEntry, HostManifest, Pcr};

use crate::fault::Fault;

/// Field-only difference between two keyed event entries: same measurement
/// and type id, differing name or tags. Reported for visibility, never a
/// trust failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MismatchField {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcr_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcr_bank: Option<DigestAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_entries: Option<Vec<EventLogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_entries: Option<Vec<EventLogEntry>>,
}

impl MismatchField {
    pub fn event_log_fields(pcr: Pcr, expected: Vec<EventLogEntry>, actual: Vec<EventLogEntry>) -> Self {
        Self {
            name: "PcrEventLogMismatchFields".to_string(),
            description: format!(
                "Event log for {} has entries matching the flavor measurements but differing in name or tags",
                pcr
            ),
            pcr_index: Some(pcr.index),
            pcr_bank: Some(pcr.bank),
            expected_entries: Some(expected),
            actual_entries: Some(actual),
        }
    }
}

/// Outcome of applying one rule to a host manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_name: String,
    pub markers: Vec<FlavorPart>,
    pub faults: Vec<Fault>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatch_fields: Vec<MismatchField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_id: Option<Uuid>,
    pub trusted: bool,
}

impl RuleResult {
    pub fn new(rule_name: impl Into<String>, markers: Vec<FlavorPart>, faults: Vec<Fault>) -> Self {
        let trusted = faults.is_empty();
        Self {
            rule_name: rule_name.into(),
            markers,
            faults,
            mismatch_fields: Vec::new(),
            flavor_id: None,
            trusted,
        }
    }

    pub fn with_mismatch_fields(mut self, mismatch_fields: Vec<MismatchField>) -> Self {
        self.mismatch_fields = mismatch_fields;
        self
    }
}

/// Aggregated outcome of applying a rule set to one host manifest.
/// Immutable once produced by the verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustReport {
    pub policy_name: String,
    pub host_manifest: HostManifest,
    pub results: Vec<RuleResult>,
    pub trusted: bool,
}

impl TrustReport {
    pub fn new(policy_name: impl Into<String>, host_manifest: HostManifest) -> Self {
        Self { policy_name: policy_name.into(), host_manifest, results: Vec::new(), trusted: false }
    }

    /// Append a rule result and refresh the overall decision.
    ///
    /// Overall trust is the AND across all rule results; a report with no
    /// evaluated rules never claims trust.
    pub fn add_result(&mut self, result: RuleResult) {
        self.results.push(result);
        self.trusted = self.results.iter().all(|r| r.trusted);
    }

    /// All faults across all rule results
    pub fn faults(&self) -> impl Iterator<Item = &Fault> {
        self.results.iter().flat_map(|r| r.faults.iter())
    }

    /// Results produced by a specific rule
    pub fn results_for(&self, rule_name: &str) -> Vec<&RuleResult> {
        self.results.iter().filter(|r| r.rule_name == rule_name).collect()
    }
}
