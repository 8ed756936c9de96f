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

//! The verifier applies the factory's rule set to a host manifest and
//! aggregates per-rule results into a trust report.

use log::warn;

use flavor::{FlavorTemplate, SignedFlavor};
use host_manifest::HostManifest;

use crate::error::VerifierError;
use crate::factory::{RuleFactory, VerificationCerts};
use crate::report::TrustReport;

pub const POLICY_NAME: &str = "Host Trust Policy";

pub struct Verifier {
    factory: RuleFactory,
}

impl Verifier {
    pub fn new(certs: VerificationCerts, skip_flavor_signature: bool) -> Self {
        Self { factory: RuleFactory::new(certs, skip_flavor_signature) }
    }

    /// Verify a host manifest against the given signed flavors.
    ///
    /// Each rule result is stamped with the evaluated flavor's id; the
    /// report's overall decision is the AND across all results. A rule that
    /// fails with an infrastructure error is logged with its context and
    /// skipped, so one broken rule does not corrupt the others' results.
    ///
    /// # Errors
    ///
    /// * `VerifierError::UnsupportedHostPlatform` - no rule builder for the host.
    /// * `VerifierError::Flavor` - invalid flavor or template configuration.
    pub fn verify(
        &self,
        host_manifest: &HostManifest,
        signed_flavors: &[SignedFlavor],
        templates: &[FlavorTemplate],
    ) -> Result<TrustReport, VerifierError> {
        let mut report = TrustReport::new(POLICY_NAME, host_manifest.clone());

        for signed_flavor in signed_flavors {
            let rules =
                self.factory.verification_rules(signed_flavor, &host_manifest.host_info, templates)?;
            for rule in rules {
                match rule.apply(host_manifest) {
                    Ok(mut result) => {
                        result.flavor_id = Some(signed_flavor.flavor.meta.id);
                        report.add_result(result);
                    }
                    Err(e) => {
                        warn!(
                            "Rule {} failed for host {}, flavor {}: {}",
                            rule.name(),
                            host_manifest.host_info.host_name,
                            signed_flavor.flavor.meta.id,
                            e
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}
