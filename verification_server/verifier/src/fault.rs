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

//! Faults: named, machine-readable mismatch records. Faults are data carried
//! on rule results, never exceptions.

use serde::{Deserialize, Serialize};

use flavor::SoftwareMeasurement;
use host_manifest::{DigestAlgorithm, EventLogEntry, Pcr};

/// A single structured mismatch between expected and actual measurement state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcr_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcr_bank: Option<DigestAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_entries: Option<Vec<EventLogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unexpected_entries: Option<Vec<EventLogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_measurements: Option<Vec<SoftwareMeasurement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unexpected_measurements: Option<Vec<SoftwareMeasurement>>,
}

impl Fault {
    fn base(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            pcr_index: None,
            pcr_bank: None,
            expected_value: None,
            actual_value: None,
            calculated_value: None,
            missing_entries: None,
            unexpected_entries: None,
            missing_measurements: None,
            unexpected_measurements: None,
        }
    }

    fn at_pcr(mut self, pcr: Pcr) -> Self {
        self.pcr_index = Some(pcr.index);
        self.pcr_bank = Some(pcr.bank);
        self
    }

    pub fn pcr_manifest_missing() -> Self {
        Self::base("PcrManifestMissing", "Host manifest carries no PCR banks")
    }

    pub fn pcr_value_missing(pcr: Pcr) -> Self {
        Self::base("PcrValueMissing", format!("Host manifest has no reading for {}", pcr)).at_pcr(pcr)
    }

    pub fn pcr_value_mismatch(pcr: Pcr, expected: &str, actual: &str) -> Self {
        let mut fault = Self::base(
            format!("PcrValueMismatch{}", pcr.bank),
            format!("Reading for {} does not match the expected measurement", pcr),
        )
        .at_pcr(pcr);
        fault.expected_value = Some(expected.to_string());
        fault.actual_value = Some(actual.to_string());
        fault
    }

    pub fn pcr_event_log_missing(pcr: Pcr) -> Self {
        Self::base("PcrEventLogMissing", format!("Host manifest has no event log for {}", pcr)).at_pcr(pcr)
    }

    pub fn pcr_event_log_contains_unexpected_entries(pcr: Pcr, entries: Vec<EventLogEntry>) -> Self {
        let mut fault = Self::base(
            "PcrEventLogContainsUnexpectedEntries",
            format!("Event log for {} contains {} entries not present in the flavor", pcr, entries.len()),
        )
        .at_pcr(pcr);
        fault.unexpected_entries = Some(entries);
        fault
    }

    pub fn pcr_event_log_missing_expected_entries(pcr: Pcr, entries: Vec<EventLogEntry>) -> Self {
        let mut fault = Self::base(
            "PcrEventLogMissingExpectedEntries",
            format!("Event log for {} is missing {} entries expected by the flavor", pcr, entries.len()),
        )
        .at_pcr(pcr);
        fault.missing_entries = Some(entries);
        fault
    }

    pub fn pcr_event_log_invalid(pcr: Pcr, calculated: &str, actual: &str) -> Self {
        let mut fault = Self::base(
            "PcrEventLogInvalid",
            format!("Replay of the event log for {} does not reproduce the PCR reading", pcr),
        )
        .at_pcr(pcr);
        fault.calculated_value = Some(calculated.to_string());
        fault.actual_value = Some(actual.to_string());
        fault
    }

    pub fn asset_tag_missing() -> Self {
        Self::base("AssetTagMissing", "Host manifest carries no asset-tag digest")
    }

    pub fn asset_tag_not_provisioned() -> Self {
        Self::base("AssetTagNotProvisioned", "Flavor carries no provisioned asset-tag digest")
    }

    pub fn asset_tag_mismatch(expected: &str, actual: &str) -> Self {
        let mut fault =
            Self::base("AssetTagMismatch", "Asset-tag digest does not match the provisioned digest");
        fault.expected_value = Some(expected.to_string());
        fault.actual_value = Some(actual.to_string());
        fault
    }

    pub fn aik_certificate_missing() -> Self {
        Self::base("AikCertificateMissing", "Host manifest carries no AIK certificate")
    }

    pub fn aik_certificate_not_trusted() -> Self {
        Self::base("AikCertificateNotTrusted", "AIK certificate is not signed by any trusted privacy CA")
    }

    pub fn aik_certificate_expired(not_after: &str) -> Self {
        let mut fault = Self::base("AikCertificateExpired", "AIK certificate validity period has ended");
        fault.actual_value = Some(not_after.to_string());
        fault
    }

    pub fn aik_certificate_not_yet_valid(not_before: &str) -> Self {
        let mut fault =
            Self::base("AikCertificateNotYetValid", "AIK certificate validity period has not started");
        fault.actual_value = Some(not_before.to_string());
        fault
    }

    pub fn tag_certificate_missing() -> Self {
        Self::base("TagCertificateMissing", "Flavor carries no tag certificate")
    }

    pub fn tag_certificate_not_trusted() -> Self {
        Self::base("TagCertificateNotTrusted", "Tag certificate is not signed by any trusted tag CA")
    }

    pub fn tag_certificate_expired(not_after: &str) -> Self {
        let mut fault = Self::base("TagCertificateExpired", "Tag certificate validity period has ended");
        fault.actual_value = Some(not_after.to_string());
        fault
    }

    pub fn xml_measurement_log_missing(label: &str) -> Self {
        Self::base(
            "XmlMeasurementLogMissing",
            format!("Host manifest carries no measurement log labeled '{}'", label),
        )
    }

    pub fn xml_measurement_log_digest_mismatch(expected: &str, actual: &str) -> Self {
        let mut fault = Self::base(
            "XmlMeasurementLogDigestMismatch",
            "Measurement log digest does not match the flavor digest",
        );
        fault.expected_value = Some(expected.to_string());
        fault.actual_value = Some(actual.to_string());
        fault
    }

    pub fn xml_measurement_log_invalid(calculated: &str, expected: &str) -> Self {
        let mut fault = Self::base(
            "XmlMeasurementLogInvalid",
            "Replay of the measurement log does not reproduce the cumulative hash",
        );
        fault.calculated_value = Some(calculated.to_string());
        fault.expected_value = Some(expected.to_string());
        fault
    }

    pub fn xml_measurement_log_contains_unexpected_entries(entries: Vec<SoftwareMeasurement>) -> Self {
        let mut fault = Self::base(
            "XmlMeasurementLogContainsUnexpectedEntries",
            format!("Measurement log contains {} entries not present in the flavor", entries.len()),
        );
        fault.unexpected_measurements = Some(entries);
        fault
    }

    pub fn xml_measurement_log_missing_expected_entries(entries: Vec<SoftwareMeasurement>) -> Self {
        let mut fault = Self::base(
            "XmlMeasurementLogMissingExpectedEntries",
            format!("Measurement log is missing {} entries expected by the flavor", entries.len()),
        );
        fault.missing_measurements = Some(entries);
        fault
    }

    pub fn flavor_signature_missing() -> Self {
        Self::base("FlavorSignatureMissing", "Signed flavor carries no signature")
    }

    pub fn flavor_signature_not_trusted() -> Self {
        Self::base(
            "FlavorSignatureNotTrusted",
            "Flavor signature does not verify against any trusted flavor-signing certificate",
        )
    }
}
