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

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509};
use uuid::Uuid;

use flavor::{
    EventLogEquals, EventLogEqualsTemplate, Flavor, FlavorDescription, FlavorMeta, FlavorPart,
    FlavorPartTemplate, FlavorPcrs, FlavorTemplate, PcrTemplateRule, SignedFlavor,
};
use host_manifest::{
    DigestAlgorithm, EventLog, EventLogEntry, HostInfo, HostManifest, HostVendor, Pcr, PcrReading,
    TpmVersion,
};
use policy_verifier::{VerificationCerts, Verifier, VerifierError};

fn pcr(index: u32) -> Pcr {
    Pcr::new(index, DigestAlgorithm::Sha256).unwrap()
}

fn entry(type_id: &str, seed: u8) -> EventLogEntry {
    EventLogEntry::new(type_id, hex::encode([seed; 32]))
}

fn generate_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn common_name(cn: &str) -> X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    name.build()
}

fn self_signed_cert(key: &PKey<Private>, cn: &str) -> X509 {
    let name = common_name(cn);
    let mut builder = X509Builder::new().unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    builder.sign(key, MessageDigest::sha384()).unwrap();
    builder.build()
}

/// Leaf certificate signed by the given CA, returned as base64 DER
fn ca_signed_cert_b64(ca_key: &PKey<Private>, ca_cert: &X509, cn: &str) -> String {
    let leaf_key = generate_key();
    let mut builder = X509Builder::new().unwrap();
    builder.set_subject_name(&common_name(cn)).unwrap();
    builder.set_issuer_name(ca_cert.subject_name()).unwrap();
    builder.set_pubkey(&leaf_key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    builder.sign(ca_key, MessageDigest::sha384()).unwrap();
    BASE64.encode(builder.build().to_der().unwrap())
}

fn host_manifest(vendor: HostVendor, events: Vec<EventLogEntry>) -> HostManifest {
    let mut manifest = HostManifest::new(HostInfo {
        host_name: "host-1".to_string(),
        hardware_uuid: None,
        vendor,
        tpm_version: TpmVersion::V2_0,
    });
    let log = EventLog::new(pcr(17), events);
    let replayed = log.replay().unwrap();
    manifest.pcr_manifest.add_reading(PcrReading::new(pcr(17), replayed)).unwrap();
    manifest.pcr_manifest.add_event_log(log).unwrap();
    manifest
}

fn platform_flavor(events: Vec<EventLogEntry>, measurement: String) -> Flavor {
    let mut flavor = Flavor::new(FlavorMeta::new(FlavorDescription {
        flavor_part: FlavorPart::Platform,
        label: "platform-test".to_string(),
        vendor: Some(HostVendor::Intel),
    }));
    flavor.pcrs.push(FlavorPcrs {
        pcr: pcr(17),
        measurement,
        pcr_matches: true,
        event_log_equals: Some(EventLogEquals { events, exclude_tags: vec![] }),
        event_log_includes: None,
    });
    flavor
}

#[test]
fn test_verify_trusted_platform_flavor() {
    let signing_key = generate_key();
    let signing_cert = self_signed_cert(&signing_key, "flavor-signing");
    let privacy_ca_key = generate_key();
    let privacy_ca = self_signed_cert(&privacy_ca_key, "privacy-ca");

    let events = vec![entry("0x1", 0x01), entry("0x2", 0x02)];
    let mut manifest = host_manifest(HostVendor::Intel, events.clone());
    manifest.aik_certificate = Some(ca_signed_cert_b64(&privacy_ca_key, &privacy_ca, "host-1-aik"));
    let expected_value = manifest.pcr_manifest.pcr_value(DigestAlgorithm::Sha256, 17).unwrap().value.clone();

    let signed = SignedFlavor::sign(platform_flavor(events, expected_value), &signing_key).unwrap();
    let certs = VerificationCerts {
        flavor_signing: vec![signing_cert],
        privacy_ca: vec![privacy_ca],
        tag_ca: vec![],
    };
    let verifier = Verifier::new(certs, false);

    let report = verifier.verify(&manifest, &[signed.clone()], &[]).unwrap();

    assert!(report.trusted, "faults: {:?}", report.faults().collect::<Vec<_>>());
    // AikCertificateTrusted + PcrMatchesConstant + PcrEventLogEquals
    // + PcrEventLogIntegrity + FlavorTrusted
    assert_eq!(report.results.len(), 5);
    assert!(report.results.iter().all(|r| r.flavor_id == Some(signed.flavor.meta.id)));
    assert_eq!(report.results_for("FlavorTrusted").len(), 1);
}

#[test]
fn test_verify_untrusted_on_pcr_mismatch() {
    let signing_key = generate_key();
    let signing_cert = self_signed_cert(&signing_key, "flavor-signing");

    let manifest = host_manifest(HostVendor::Intel, vec![entry("0x1", 0x01)]);
    let signed =
        SignedFlavor::sign(platform_flavor(vec![entry("0x1", 0x01)], "ee".repeat(32)), &signing_key)
            .unwrap();
    let certs = VerificationCerts { flavor_signing: vec![signing_cert], ..Default::default() };
    let verifier = Verifier::new(certs, false);

    let report = verifier.verify(&manifest, &[signed], &[]).unwrap();

    assert!(!report.trusted);
    assert!(report.faults().any(|f| f.name == "PcrValueMismatchSHA256"));
}

#[test]
fn test_verify_skip_signature_omits_flavor_trusted_rule() {
    // VMware hosts carry no AIK; the platform rules reduce to the PCR checks
    let manifest = host_manifest(HostVendor::Vmware, vec![entry("0x1", 0x01)]);
    let expected_value = manifest.pcr_manifest.pcr_value(DigestAlgorithm::Sha256, 17).unwrap().value.clone();
    let signed = SignedFlavor::new(platform_flavor(vec![entry("0x1", 0x01)], expected_value), "");

    let verifier = Verifier::new(VerificationCerts::default(), true);
    let report = verifier.verify(&manifest, &[signed], &[]).unwrap();

    assert!(report.trusted, "faults: {:?}", report.faults().collect::<Vec<_>>());
    assert!(report.results_for("FlavorTrusted").is_empty());
}

#[test]
fn test_verify_unsupported_platform_is_hard_error() {
    let mut manifest = host_manifest(HostVendor::Intel, vec![entry("0x1", 0x01)]);
    manifest.host_info.tpm_version = TpmVersion::V1_2;

    let signed = SignedFlavor::new(platform_flavor(vec![entry("0x1", 0x01)], "ab".repeat(32)), "");
    let verifier = Verifier::new(VerificationCerts::default(), true);

    let result = verifier.verify(&manifest, &[signed], &[]);
    assert!(matches!(result, Err(VerifierError::UnsupportedHostPlatform { .. })));
}

#[test]
fn test_template_excluding_tags_reach_equals_rule() {
    let stable = entry("0x1", 0x01);
    let volatile = entry("0x2", 0x02).with_tags(vec!["LCP_DETAILS_HASH".to_string()]);
    let manifest = host_manifest(HostVendor::Vmware, vec![stable.clone(), volatile]);
    let expected_value = manifest.pcr_manifest.pcr_value(DigestAlgorithm::Sha256, 17).unwrap().value.clone();

    // Flavor itself excludes nothing; the template adds the excluding tag
    let mut flavor = platform_flavor(vec![stable], expected_value);
    flavor.pcrs[0].pcr_matches = false;

    let mut flavor_parts = HashMap::new();
    flavor_parts.insert(
        FlavorPart::Platform,
        FlavorPartTemplate {
            pcr_rules: vec![PcrTemplateRule {
                pcr: pcr(17),
                pcr_matches: false,
                eventlog_equals: Some(EventLogEqualsTemplate {
                    excluding_tags: vec!["LCP_DETAILS_HASH".to_string()],
                }),
                eventlog_includes: None,
            }],
        },
    );
    let template = FlavorTemplate {
        id: Uuid::new_v4(),
        label: "default-pfr".to_string(),
        condition: vec![],
        flavor_parts,
    };

    let signed = SignedFlavor::new(flavor, "");
    let verifier = Verifier::new(VerificationCerts::default(), true);
    let report = verifier.verify(&manifest, &[signed], &[template]).unwrap();

    let equals_results = report.results_for("PcrEventLogEqualsExcluding");
    assert_eq!(equals_results.len(), 1);
    assert!(equals_results[0].trusted, "faults: {:?}", equals_results[0].faults);
}
