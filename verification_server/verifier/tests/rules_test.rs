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
use host_manifest::{
    DigestAlgorithm, EventLog, EventLogEntry, HostInfo, HostManifest, HostVendor, Pcr, PcrReading,
    TpmVersion,
};
use policy_verifier::rules::{
    AssetTagMatches, PcrEventLogEquals, PcrEventLogIncludes, PcrEventLogIntegrity, PcrMatchesConstant,
};
use policy_verifier::VerificationRule;

fn pcr(index: u32) -> Pcr {
    Pcr::new(index, DigestAlgorithm::Sha256).unwrap()
}

fn entry(type_id: &str, seed: u8) -> EventLogEntry {
    EventLogEntry::new(type_id, hex::encode([seed; 32]))
}

fn host_manifest() -> HostManifest {
    HostManifest::new(HostInfo {
        host_name: "host-1".to_string(),
        hardware_uuid: None,
        vendor: HostVendor::Intel,
        tpm_version: TpmVersion::V2_0,
    })
}

fn manifest_with_log(events: Vec<EventLogEntry>) -> HostManifest {
    let mut manifest = host_manifest();
    let log = EventLog::new(pcr(17), events);
    let replayed = log.replay().unwrap();
    manifest.pcr_manifest.add_reading(PcrReading::new(pcr(17), replayed)).unwrap();
    manifest.pcr_manifest.add_event_log(log).unwrap();
    manifest
}

fn fault_names(result: &policy_verifier::RuleResult) -> Vec<&str> {
    result.faults.iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn test_pcr_matches_constant_trusted_on_equal_value() {
    let mut manifest = host_manifest();
    manifest.pcr_manifest.add_reading(PcrReading::new(pcr(0), "ab".repeat(32))).unwrap();

    let rule = PcrMatchesConstant::new(PcrReading::new(pcr(0), "ab".repeat(32)), FlavorPart::Platform);
    let result = rule.apply(&manifest).unwrap();

    assert!(result.trusted);
    assert!(result.faults.is_empty());
}

#[test]
fn test_pcr_matches_constant_fault_progression() {
    let rule = PcrMatchesConstant::new(PcrReading::new(pcr(0), "ab".repeat(32)), FlavorPart::Platform);

    // No banks at all
    let empty = host_manifest();
    let result = rule.apply(&empty).unwrap();
    assert_eq!(fault_names(&result), vec!["PcrManifestMissing"]);

    // Bank present, index absent
    let mut other_index = host_manifest();
    other_index.pcr_manifest.add_reading(PcrReading::new(pcr(7), "cd".repeat(32))).unwrap();
    let result = rule.apply(&other_index).unwrap();
    assert_eq!(fault_names(&result), vec!["PcrValueMissing"]);

    // Present but different
    let mut mismatched = host_manifest();
    mismatched.pcr_manifest.add_reading(PcrReading::new(pcr(0), "cd".repeat(32))).unwrap();
    let result = rule.apply(&mismatched).unwrap();
    assert_eq!(fault_names(&result), vec!["PcrValueMismatchSHA256"]);
    assert!(!result.trusted);
}

#[test]
fn test_event_log_equals_round_trip() {
    // Actual log set to exactly the expected entries yields zero faults
    let events = vec![entry("0x1", 0x01), entry("0x2", 0x02)];
    let manifest = manifest_with_log(events.clone());

    let rule = PcrEventLogEquals::new(EventLog::new(pcr(17), events), FlavorPart::Platform);
    let result = rule.apply(&manifest).unwrap();

    assert!(result.trusted, "unexpected faults: {:?}", result.faults);
}

#[test]
fn test_event_log_equals_reports_unexpected_and_missing() {
    let manifest = manifest_with_log(vec![entry("0x1", 0x01), entry("0x3", 0x03)]);
    let expected = EventLog::new(pcr(17), vec![entry("0x1", 0x01), entry("0x2", 0x02)]);

    let rule = PcrEventLogEquals::new(expected, FlavorPart::Platform);
    let result = rule.apply(&manifest).unwrap();

    let names = fault_names(&result);
    assert!(names.contains(&"PcrEventLogContainsUnexpectedEntries"));
    assert!(names.contains(&"PcrEventLogMissingExpectedEntries"));
}

#[test]
fn test_event_log_equals_field_mismatch_is_not_a_fault() {
    let named = entry("0x1", 0x01).with_type_name("EV_SEPARATOR");
    let renamed = entry("0x1", 0x01).with_type_name("EV_ACTION");

    let manifest = manifest_with_log(vec![named]);
    let rule = PcrEventLogEquals::new(EventLog::new(pcr(17), vec![renamed]), FlavorPart::Platform);
    let result = rule.apply(&manifest).unwrap();

    assert!(result.trusted);
    assert_eq!(result.mismatch_fields.len(), 1);
}

#[test]
fn test_event_log_equals_excluding_strips_actual_events() {
    let stable = entry("0x1", 0x01);
    let volatile = entry("0x2", 0x02).with_tags(vec!["bootOrder".to_string()]);

    let manifest = manifest_with_log(vec![stable.clone(), volatile]);
    let exclude: HashSet<String> = ["bootOrder".to_string()].into_iter().collect();

    let rule = PcrEventLogEquals::excluding(
        EventLog::new(pcr(17), vec![stable]),
        exclude,
        FlavorPart::Platform,
    );
    let result = rule.apply(&manifest).unwrap();

    assert!(result.trusted, "unexpected faults: {:?}", result.faults);
}

#[test]
fn test_event_log_includes_monotonicity() {
    let expected = vec![entry("0x1", 0x01), entry("0x2", 0x02)];
    let rule = PcrEventLogIncludes::new(EventLog::new(pcr(17), expected.clone()), FlavorPart::Os);

    // Extra non-overlapping events never introduce a fault
    let mut padded = expected.clone();
    padded.push(entry("0x9", 0x99));
    let result = rule.apply(&manifest_with_log(padded)).unwrap();
    assert!(result.trusted);

    // Removing any expected event introduces exactly one missing-entries fault
    let result = rule.apply(&manifest_with_log(vec![entry("0x1", 0x01)])).unwrap();
    assert_eq!(fault_names(&result), vec!["PcrEventLogMissingExpectedEntries"]);
    assert_eq!(result.faults[0].missing_entries.as_ref().unwrap().len(), 1);
}

#[test]
fn test_event_log_integrity_self_consistency() {
    // Reading constructed by replaying the log itself verifies clean
    let manifest = manifest_with_log(vec![entry("0x1", 0x01), entry("0x2", 0x02)]);
    let rule = PcrEventLogIntegrity::new(pcr(17), FlavorPart::Platform);
    assert!(rule.apply(&manifest).unwrap().trusted);

    // Mutating one measurement breaks the chain
    let mut tampered = manifest.clone();
    tampered.pcr_manifest.event_logs[0].events[1].measurement = hex::encode([0xEE; 32]);
    let result = rule.apply(&tampered).unwrap();
    assert_eq!(fault_names(&result), vec!["PcrEventLogInvalid"]);
    assert!(result.faults[0].calculated_value.is_some());
    assert!(result.faults[0].actual_value.is_some());
}

#[test]
fn test_event_log_integrity_never_reads_flavor_value() {
    // The rule checks the manifest against itself; a "wrong" flavor value is irrelevant
    let manifest = manifest_with_log(vec![entry("0x1", 0x01)]);
    let rule = PcrEventLogIntegrity::new(pcr(17), FlavorPart::Platform);
    assert!(rule.apply(&manifest).unwrap().trusted);
}

#[test]
fn test_asset_tag_matches() {
    let digest = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [0xAA; 32]);

    let mut provisioned = host_manifest();
    provisioned.asset_tag_digest = Some(digest.clone());

    // Matching digests
    let rule = AssetTagMatches::new(Some(digest.clone()), FlavorPart::AssetTag);
    assert!(rule.apply(&provisioned).unwrap().trusted);

    // Host without a digest
    let rule = AssetTagMatches::new(Some(digest.clone()), FlavorPart::AssetTag);
    let result = rule.apply(&host_manifest()).unwrap();
    assert_eq!(fault_names(&result), vec!["AssetTagMissing"]);

    // Flavor without a provisioned digest
    let rule = AssetTagMatches::new(None, FlavorPart::AssetTag);
    let result = rule.apply(&provisioned).unwrap();
    assert_eq!(fault_names(&result), vec!["AssetTagNotProvisioned"]);

    // Differing digests
    let other = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [0xBB; 32]);
    let rule = AssetTagMatches::new(Some(other), FlavorPart::AssetTag);
    let result = rule.apply(&provisioned).unwrap();
    assert_eq!(fault_names(&result), vec!["AssetTagMismatch"]);
}
