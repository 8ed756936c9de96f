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

//! Software measurement log rules for SOFTWARE flavors.

use std::collections::HashMap;

use flavor::{FlavorPart, Software, SoftwareMeasurement};
use host_manifest::HostManifest;

use crate::error::VerifierError;
use crate::fault::Fault;
use crate::measurement::MeasurementXml;
use crate::report::RuleResult;
use crate::rules::VerificationRule;

/// Compares the SHA-384 digest of the reported measurement document against
/// the digest recorded in the SOFTWARE flavor.
pub struct XmlMeasurementLogDigestEquals {
    label: String,
    expected_digest: String,
    markers: Vec<FlavorPart>,
}

impl XmlMeasurementLogDigestEquals {
    pub fn new(label: impl Into<String>, expected_digest: impl Into<String>, marker: FlavorPart) -> Self {
        Self { label: label.into(), expected_digest: expected_digest.into(), markers: vec![marker] }
    }
}

impl VerificationRule for XmlMeasurementLogDigestEquals {
    fn name(&self) -> &'static str {
        "XmlMeasurementLogDigestEquals"
    }

    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();

        match MeasurementXml::find_by_label(&host_manifest.measurement_xmls, &self.label)? {
            None => faults.push(Fault::xml_measurement_log_missing(&self.label)),
            Some(parsed) => {
                let actual = parsed.document_digest()?;
                if !actual.eq_ignore_ascii_case(&self.expected_digest) {
                    faults.push(Fault::xml_measurement_log_digest_mismatch(&self.expected_digest, &actual));
                }
            }
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}

/// Replays the reported measurement entries and requires the result to match
/// the cumulative hash recorded in the SOFTWARE flavor.
pub struct XmlMeasurementLogIntegrity {
    label: String,
    expected_cumulative_hash: String,
    markers: Vec<FlavorPart>,
}

impl XmlMeasurementLogIntegrity {
    pub fn new(
        label: impl Into<String>,
        expected_cumulative_hash: impl Into<String>,
        marker: FlavorPart,
    ) -> Self {
        Self {
            label: label.into(),
            expected_cumulative_hash: expected_cumulative_hash.into(),
            markers: vec![marker],
        }
    }
}

impl VerificationRule for XmlMeasurementLogIntegrity {
    fn name(&self) -> &'static str {
        "XmlMeasurementLogIntegrity"
    }

    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();

        match MeasurementXml::find_by_label(&host_manifest.measurement_xmls, &self.label)? {
            None => faults.push(Fault::xml_measurement_log_missing(&self.label)),
            Some(parsed) => {
                let calculated = parsed.replay_cumulative()?;
                if !calculated.eq_ignore_ascii_case(&self.expected_cumulative_hash) {
                    faults.push(Fault::xml_measurement_log_invalid(
                        &calculated,
                        &self.expected_cumulative_hash,
                    ));
                }
            }
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}

/// Requires the reported measurement entries to match the flavor's expected
/// set exactly, keyed by `(path, value)`.
pub struct XmlMeasurementLogEquals {
    expected: Software,
    markers: Vec<FlavorPart>,
}

impl XmlMeasurementLogEquals {
    pub fn new(expected: Software, marker: FlavorPart) -> Self {
        Self { expected, markers: vec![marker] }
    }
}

impl VerificationRule for XmlMeasurementLogEquals {
    fn name(&self) -> &'static str {
        "XmlMeasurementLogEquals"
    }

    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();

        match MeasurementXml::find_by_label(&host_manifest.measurement_xmls, &self.expected.label)? {
            None => faults.push(Fault::xml_measurement_log_missing(&self.expected.label)),
            Some(parsed) => {
                let expected: HashMap<(&str, &str), &SoftwareMeasurement> = self
                    .expected
                    .measurements
                    .iter()
                    .map(|m| ((m.path.as_str(), m.value.as_str()), m))
                    .collect();
                let actual: HashMap<(&str, &str), &SoftwareMeasurement> =
                    parsed.entries.iter().map(|m| ((m.path.as_str(), m.value.as_str()), m)).collect();

                let unexpected: Vec<SoftwareMeasurement> = parsed
                    .entries
                    .iter()
                    .filter(|m| !expected.contains_key(&(m.path.as_str(), m.value.as_str())))
                    .cloned()
                    .collect();
                let missing: Vec<SoftwareMeasurement> = self
                    .expected
                    .measurements
                    .iter()
                    .filter(|m| !actual.contains_key(&(m.path.as_str(), m.value.as_str())))
                    .cloned()
                    .collect();

                if !unexpected.is_empty() {
                    faults.push(Fault::xml_measurement_log_contains_unexpected_entries(unexpected));
                }
                if !missing.is_empty() {
                    faults.push(Fault::xml_measurement_log_missing_expected_entries(missing));
                }
            }
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}
