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

//! Rule selection: per-vendor builders and the top-level factory.
//!
//! The builder is a total function of `(vendor, TPM version)`; a combination
//! with no builder is a hard error, since it indicates an integration
//! problem upstream rather than a trust failure.

use std::collections::HashSet;

use openssl::x509::X509;

use flavor::{resolve_pcr_rules, Flavor, FlavorPart, FlavorTemplate, SignedFlavor};
use host_manifest::{EventLog, HostInfo, HostVendor, PcrReading, TpmVersion};

use crate::error::VerifierError;
use crate::rules::{
    AikCertificateTrusted, AssetTagMatches, FlavorTrusted, PcrEventLogEquals, PcrEventLogIncludes,
    PcrEventLogIntegrity, PcrMatchesConstant, TagCertificateTrusted, VerificationRule,
    XmlMeasurementLogDigestEquals, XmlMeasurementLogEquals, XmlMeasurementLogIntegrity,
};

/// Trusted certificate material the rules verify against
#[derive(Clone, Default)]
pub struct VerificationCerts {
    pub flavor_signing: Vec<X509>,
    pub privacy_ca: Vec<X509>,
    pub tag_ca: Vec<X509>,
}

/// Per-vendor rule selection. Implementations differ in which certificate
/// and software checks a platform supports.
pub trait VendorRuleBuilder: Send + Sync {
    fn name(&self) -> &'static str;

    fn aik_certificate_trusted_rule(
        &self,
        certs: &VerificationCerts,
        part: FlavorPart,
    ) -> Result<Option<Box<dyn VerificationRule>>, VerifierError>;

    fn asset_tag_rules(
        &self,
        certs: &VerificationCerts,
        flavor: &Flavor,
    ) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError>;

    fn software_rules(&self, flavor: &Flavor) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError>;
}

struct IntelTpm20Builder;
struct VmwareTpm12Builder;
struct VmwareTpm20Builder;

fn intel_software_rules(flavor: &Flavor) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
    let software = flavor.software.as_ref().ok_or_else(|| {
        VerifierError::RuleConfiguration("SOFTWARE flavor carries no software section".to_string())
    })?;
    Ok(vec![
        Box::new(XmlMeasurementLogDigestEquals::new(
            software.label.clone(),
            software.xml_digest.clone(),
            FlavorPart::Software,
        )),
        Box::new(XmlMeasurementLogIntegrity::new(
            software.label.clone(),
            software.cumulative_hash.clone(),
            FlavorPart::Software,
        )),
        Box::new(XmlMeasurementLogEquals::new(software.clone(), FlavorPart::Software)),
    ])
}

impl VendorRuleBuilder for IntelTpm20Builder {
    fn name(&self) -> &'static str {
        "intel-tpm20"
    }

    fn aik_certificate_trusted_rule(
        &self,
        certs: &VerificationCerts,
        part: FlavorPart,
    ) -> Result<Option<Box<dyn VerificationRule>>, VerifierError> {
        Ok(Some(Box::new(AikCertificateTrusted::new(certs.privacy_ca.clone(), part))))
    }

    fn asset_tag_rules(
        &self,
        certs: &VerificationCerts,
        flavor: &Flavor,
    ) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
        let external = flavor.external.as_ref();
        Ok(vec![
            Box::new(AssetTagMatches::new(
                external.and_then(|e| e.asset_tag_digest.clone()),
                FlavorPart::AssetTag,
            )),
            Box::new(TagCertificateTrusted::new(
                external.and_then(|e| e.tag_certificate.clone()),
                certs.tag_ca.clone(),
                FlavorPart::AssetTag,
            )),
        ])
    }

    fn software_rules(&self, flavor: &Flavor) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
        intel_software_rules(flavor)
    }
}

// ESXi hosts expose no AIK and report no application measurement logs; only
// the tag digest written to the TPM is checkable.
fn vmware_asset_tag_rules(flavor: &Flavor) -> Vec<Box<dyn VerificationRule>> {
    vec![Box::new(AssetTagMatches::new(
        flavor.external.as_ref().and_then(|e| e.asset_tag_digest.clone()),
        FlavorPart::AssetTag,
    ))]
}

impl VendorRuleBuilder for VmwareTpm12Builder {
    fn name(&self) -> &'static str {
        "vmware-tpm12"
    }

    fn aik_certificate_trusted_rule(
        &self,
        _certs: &VerificationCerts,
        _part: FlavorPart,
    ) -> Result<Option<Box<dyn VerificationRule>>, VerifierError> {
        Ok(None)
    }

    fn asset_tag_rules(
        &self,
        _certs: &VerificationCerts,
        flavor: &Flavor,
    ) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
        Ok(vmware_asset_tag_rules(flavor))
    }

    fn software_rules(&self, _flavor: &Flavor) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
        Ok(Vec::new())
    }
}

impl VendorRuleBuilder for VmwareTpm20Builder {
    fn name(&self) -> &'static str {
        "vmware-tpm20"
    }

    fn aik_certificate_trusted_rule(
        &self,
        _certs: &VerificationCerts,
        _part: FlavorPart,
    ) -> Result<Option<Box<dyn VerificationRule>>, VerifierError> {
        Ok(None)
    }

    fn asset_tag_rules(
        &self,
        _certs: &VerificationCerts,
        flavor: &Flavor,
    ) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
        Ok(vmware_asset_tag_rules(flavor))
    }

    fn software_rules(&self, _flavor: &Flavor) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
        Ok(Vec::new())
    }
}

/// Select the builder for a host platform
///
/// # Errors
///
/// * `VerifierError::UnsupportedHostPlatform` - no builder for the combination.
pub fn vendor_rule_builder(host_info: &HostInfo) -> Result<&'static dyn VendorRuleBuilder, VerifierError> {
    match (host_info.vendor, host_info.tpm_version) {
        (HostVendor::Intel, TpmVersion::V2_0) => Ok(&IntelTpm20Builder),
        (HostVendor::Vmware, TpmVersion::V1_2) => Ok(&VmwareTpm12Builder),
        (HostVendor::Vmware, TpmVersion::V2_0) => Ok(&VmwareTpm20Builder),
        (vendor, tpm_version) => Err(VerifierError::UnsupportedHostPlatform {
            vendor: vendor.to_string(),
            tpm_version: tpm_version.to_string(),
        }),
    }
}

/// Builds the ordered rule set to apply to one signed flavor for one host.
pub struct RuleFactory {
    certs: VerificationCerts,
    skip_flavor_signature: bool,
}

impl RuleFactory {
    pub fn new(certs: VerificationCerts, skip_flavor_signature: bool) -> Self {
        Self { certs, skip_flavor_signature }
    }

    /// Build the rules for one signed flavor.
    ///
    /// # Arguments
    /// * `signed_flavor` - The flavor under evaluation
    /// * `host_info` - Vendor and TPM version selecting the builder
    /// * `templates` - Flavor templates whose merged PCR rules refine the
    ///   flavor's own declarations
    ///
    /// # Errors
    ///
    /// * `VerifierError::UnsupportedHostPlatform` - no builder for the host.
    /// * `VerifierError::Flavor` - invalid flavor or conflicting template rules.
    pub fn verification_rules(
        &self,
        signed_flavor: &SignedFlavor,
        host_info: &HostInfo,
        templates: &[FlavorTemplate],
    ) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
        let flavor = &signed_flavor.flavor;
        flavor.validate()?;
        let builder = vendor_rule_builder(host_info)?;
        let part = flavor.part();

        let mut rules: Vec<Box<dyn VerificationRule>> = Vec::new();
        match part {
            FlavorPart::Platform | FlavorPart::Os | FlavorPart::HostUnique => {
                if let Some(rule) = builder.aik_certificate_trusted_rule(&self.certs, part)? {
                    rules.push(rule);
                }
                rules.extend(self.pcr_rules(flavor, part, templates)?);
            }
            FlavorPart::AssetTag => rules.extend(builder.asset_tag_rules(&self.certs, flavor)?),
            FlavorPart::Software => rules.extend(builder.software_rules(flavor)?),
        }

        if !self.skip_flavor_signature {
            rules.push(Box::new(FlavorTrusted::new(
                signed_flavor.clone(),
                self.certs.flavor_signing.clone(),
                part,
            )));
        }

        Ok(rules)
    }

    /// PCR rules from the flavor's declarations, refined by the templates'
    /// merged rule set.
    fn pcr_rules(
        &self,
        flavor: &Flavor,
        part: FlavorPart,
        templates: &[FlavorTemplate],
    ) -> Result<Vec<Box<dyn VerificationRule>>, VerifierError> {
        let merged = resolve_pcr_rules(templates, part)?;
        let mut rules: Vec<Box<dyn VerificationRule>> = Vec::new();

        for flavor_pcr in &flavor.pcrs {
            let template_rules = merged.get(&flavor_pcr.pcr);

            let pcr_matches =
                flavor_pcr.pcr_matches || template_rules.map_or(false, |r| r.pcr_matches);
            if pcr_matches {
                rules.push(Box::new(PcrMatchesConstant::new(
                    PcrReading::new(flavor_pcr.pcr, flavor_pcr.measurement.clone()),
                    part,
                )));
            }

            if let Some(equals) = &flavor_pcr.event_log_equals {
                let mut exclude: HashSet<String> = equals.exclude_tags.iter().cloned().collect();
                if let Some(template_rules) = template_rules {
                    exclude.extend(template_rules.pcr_equals.excluding_tags.iter().cloned());
                }
                let expected = EventLog::new(flavor_pcr.pcr, equals.events.clone());
                if exclude.is_empty() {
                    rules.push(Box::new(PcrEventLogEquals::new(expected, part)));
                } else {
                    rules.push(Box::new(PcrEventLogEquals::excluding(expected, exclude, part)));
                }
                // Entry comparison is meaningless unless the chain replays
                rules.push(Box::new(PcrEventLogIntegrity::new(flavor_pcr.pcr, part)));
            } else if let Some(includes) = &flavor_pcr.event_log_includes {
                let expected = EventLog::new(flavor_pcr.pcr, includes.clone());
                rules.push(Box::new(PcrEventLogIncludes::new(expected, part)));
                rules.push(Box::new(PcrEventLogIntegrity::new(flavor_pcr.pcr, part)));
            }
        }

        Ok(rules)
    }
}
