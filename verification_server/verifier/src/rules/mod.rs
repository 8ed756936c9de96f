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

//! Verification rules. Each rule is stateless aside from its
//! construction-time expected value and evaluates one predicate over a host
//! manifest, emitting faults for mismatches.

mod asset_tag_matches;
mod certificate_trusted;
mod flavor_trusted;
mod pcr_eventlog_equals;
mod pcr_eventlog_includes;
mod pcr_eventlog_integrity;
mod pcr_matches_constant;
mod xml_measurement_log;

pub use asset_tag_matches::AssetTagMatches;
pub use certificate_trusted::{AikCertificateTrusted, TagCertificateTrusted};
pub use flavor_trusted::FlavorTrusted;
pub use pcr_eventlog_equals::PcrEventLogEquals;
pub use pcr_eventlog_includes::PcrEventLogIncludes;
pub use pcr_eventlog_integrity::PcrEventLogIntegrity;
pub use pcr_matches_constant::PcrMatchesConstant;
pub use xml_measurement_log::{
    XmlMeasurementLogDigestEquals, XmlMeasurementLogEquals, XmlMeasurementLogIntegrity,
};

use host_manifest::HostManifest;

use crate::error::VerifierError;
use crate::report::RuleResult;

/// The single capability every rule implements
pub trait VerificationRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Evaluate the rule against a host manifest.
    ///
    /// Mismatches are faults on the returned result; only infrastructure
    /// failures (malformed logs, crypto backend errors) are `Err`.
    fn apply(&self, host_manifest: &HostManifest) -> Result<RuleResult, VerifierError>;
}
