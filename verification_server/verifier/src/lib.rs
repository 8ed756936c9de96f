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

//! Policy rule engine: stateless verification rules, the vendor rule
//! factory, and the verifier that aggregates per-rule results into a trust
//! report. A host failing a check produces faults on the result; only
//! infrastructure failures surface as errors.

pub mod error;
pub mod factory;
pub mod fault;
pub mod measurement;
pub mod report;
pub mod rules;
pub mod verifier;

pub use error::VerifierError;
pub use factory::{RuleFactory, VendorRuleBuilder, VerificationCerts};
pub use fault::Fault;
pub use report::{MismatchField, RuleResult, TrustReport};
pub use rules::VerificationRule;
pub use verifier::{Verifier, POLICY_NAME};
