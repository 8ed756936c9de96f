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

use openssl::x509::X509;

use flavor::{FlavorError, FlavorPart, SignedFlavor};
use host_manifest::HostManifest;

use crate::error::VerifierError;
use crate::fault::Fault;
use crate::report::RuleResult;
use crate::rules::VerificationRule;

/// Requires the signed flavor's detached signature to verify against a
/// trusted flavor-signing certificate.
pub struct FlavorTrusted {
    signed_flavor: SignedFlavor,
    signing_certs: Vec<X509>,
    markers: Vec<FlavorPart>,
}

impl FlavorTrusted {
    pub fn new(signed_flavor: SignedFlavor, signing_certs: Vec<X509>, marker: FlavorPart) -> Self {
        Self { signed_flavor, signing_certs, markers: vec![marker] }
    }
}

impl VerificationRule for FlavorTrusted {
    fn name(&self) -> &'static str {
        "FlavorTrusted"
    }

    fn apply(&self, _host_manifest: &HostManifest) -> Result<RuleResult, VerifierError> {
        let mut faults = Vec::new();

        if self.signed_flavor.signature.is_empty() {
            faults.push(Fault::flavor_signature_missing());
        } else {
            let mut verified = false;
            for cert in &self.signing_certs {
                match self.signed_flavor.verify_signature(cert) {
                    Ok(true) => {
                        verified = true;
                        break;
                    }
                    Ok(false) => {}
                    // A malformed signature can never verify; treat it as untrusted
                    Err(FlavorError::InputError(_)) => break,
                    Err(e) => return Err(e.into()),
                }
            }
            if !verified {
                faults.push(Fault::flavor_signature_not_trusted());
            }
        }

        Ok(RuleResult::new(self.name(), self.markers.clone(), faults))
    }
}
