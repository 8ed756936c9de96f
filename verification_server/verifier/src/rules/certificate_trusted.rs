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

//! Certificate trust rules for the host's AIK certificate and the asset-tag
//! certificate bound to it.

use std::cmp::Ordering;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use openssl::asn1::Asn1Time;
use openssl::x509::X509;

use flavor::FlavorPart;
use host_manifest::HostManifest;

use crate::error::VerifierError;
use crate::fault::Fault;
use crate::report::RuleResult;
use crate::rules::VerificationRule;

/// Validity window against now; pushes the corresponding faults
fn check_validity_window(
    cert: &X509,
    faults: &mut Vec<Fault>,
    expired: fn(&str) -> Fault,
    not_yet_valid: Option<fn(&str) -> Fault>,
) -> Result<(), VerifierError> {
    let now = Asn1Time::days_from_now(0)
        .map_err(|e| VerifierError::CryptoError(format!("Failed to build time reference: {}", e)))?;

    let after_cmp = cert
        .not_after()
        .compare(&now)
        .map_err(|e| VerifierError::CryptoError(format!("Failed to compare certificate time: {}", e)))?;
    if after_cmp == Ordering::Less {
        faults.push(expired(&cert.not_after().to_string()));
    }

    if let Some(not_yet_valid) = not_yet_valid {
        let before_cmp = cert
            .not_before()
            .compare(&now)
            .map_err(|e| VerifierError::CryptoError(format!("Failed to compare certificate time: {}", e)))?;
        if before_cmp == Ordering::Greater {
            faults.push(not_yet_valid(&cert.not_before().to_string()));
        }
    }

    Ok(())
}

/// True when any CA in the set signed the certificate
fn signed_by_any(cert: &X509, ca_certs: &[X509]) -> Result<bool, VerifierError> {
    for ca in ca_certs {
        let ca_key = ca
            .public_key()
            .map_err(|e| VerifierError::CryptoError(format!("Failed to extract CA public key: {}", e)))?;
        if cert.verify(&ca_key).unwrap_or(false) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Requires the host's attestation identity key certificate to be within its
/// validity window and signed by a trusted privacy CA.
pub struct AikCertificateTrusted {
    privacy_ca_certs: Vec<X509>,
    markers: Vec<FlavorPart>,
}

impl AikCertificateTrusted {
    pub fn new(privacy_ca_certs: Vec<X509>, marker: FlavorPart) -> Self {
        Self { privacy_ca_certs, markers: vec![marker] }
    }
}

impl VerificationRule for AikCertificateTrusted {
    fn name(&self) -> &'static str {
        "AikCertificateTrusted"
    }

    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();

        match &host_manifest.aik_certificate {
            None => faults.push(Fault::aik_certificate_missing()),
            Some(encoded) => {
                let der = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                    VerifierError::InputError(format!("Failed to decode AIK certificate: {}", e))
                })?;
                let cert = X509::from_der(&der).map_err(|e| {
                    VerifierError::InputError(format!("Failed to parse AIK certificate: {}", e))
                })?;

                check_validity_window(
                    &cert,
                    &mut faults,
                    Fault::aik_certificate_expired,
                    Some(Fault::aik_certificate_not_yet_valid),
                )?;
                if !signed_by_any(&cert, &self.privacy_ca_certs)? {
                    faults.push(Fault::aik_certificate_not_trusted());
                }
            }
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}

/// Requires the asset-tag certificate provisioned in the flavor to be within
/// its validity window and signed by a trusted tag CA.
pub struct TagCertificateTrusted {
    /// Base64 DER tag certificate from the ASSET_TAG flavor
    tag_certificate: Option<String>,
    tag_ca_certs: Vec<X509>,
    markers: Vec<FlavorPart>,
}

impl TagCertificateTrusted {
    pub fn new(tag_certificate: Option<String>, tag_ca_certs: Vec<X509>, marker: FlavorPart) -> Self {
        Self { tag_certificate, tag_ca_certs, markers: vec![marker] }
    }
}

impl VerificationRule for TagCertificateTrusted {
    fn name(&self) -> &'static str {
        "TagCertificateTrusted"
    }

    fn apply(&self, _host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();

        match &self.tag_certificate {
            None => faults.push(Fault::tag_certificate_missing()),
            Some(encoded) => {
                let der = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                    VerifierError::InputError(format!("Failed to decode tag certificate: {}", e))
                })?;
                let cert = X509::from_der(&der).map_err(|e| {
                    VerifierError::InputError(format!("Failed to parse tag certificate: {}", e))
                })?;

                check_validity_window(&cert, &mut faults, Fault::tag_certificate_expired, None)?;
                if !signed_by_any(&cert, &self.tag_ca_certs)? {
                    faults.push(Fault::tag_certificate_not_trusted());
                }
            }
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}
