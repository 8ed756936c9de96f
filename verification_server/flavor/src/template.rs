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

//! Flavor templates and the PCR rule resolver.
//!
//! Templates declare, per flavor part, which PCRs a flavor validates and
//! with which strategy. Multiple templates can match one host; the resolver
//! merges their declarations into one rule set per PCR, rejecting the
//! equals/includes combination since the two are exclusive validation
//! strategies for the same measurement stream.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use host_manifest::Pcr;

use crate::error::FlavorError;
use crate::model::FlavorPart;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLogEqualsTemplate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluding_tags: Vec<String>,
}

/// One PCR rule declared by a flavor template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcrTemplateRule {
    pub pcr: Pcr,
    #[serde(default)]
    pub pcr_matches: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eventlog_equals: Option<EventLogEqualsTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eventlog_includes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlavorPartTemplate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pcr_rules: Vec<PcrTemplateRule>,
}

/// A rule set used to generate and validate flavors' PCR expectations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorTemplate {
    pub id: Uuid,
    pub label: String,
    /// jsonquery conditions selecting the hosts this template applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition: Vec<String>,
    #[serde(default)]
    pub flavor_parts: HashMap<FlavorPart, FlavorPartTemplate>,
}

/// Merged equals strategy for one PCR
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcrEquals {
    pub is_equals: bool,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excluding_tags: BTreeSet<String>,
}

/// Merged view of every template's declarations for one PCR
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcrListRules {
    pub pcr_matches: bool,
    #[serde(default)]
    pub pcr_equals: PcrEquals,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub pcr_includes: BTreeSet<String>,
}

/// Merge the PCR rules declared by the given templates for one flavor part.
///
/// Iterates templates in order: `pcr_matches` is OR-ed, tag sets accumulate
/// via set union. An `equals` rule meeting an `includes` rule for the same
/// PCR (in either order, or within a single template rule) is a hard error,
/// not a silently-merged rule.
///
/// # Errors
///
/// * `FlavorError::PcrRuleConflict` - equals and includes declared for one PCR.
pub fn resolve_pcr_rules(
    templates: &[FlavorTemplate],
    part: FlavorPart,
) -> Result<BTreeMap<Pcr, PcrListRules>, FlavorError> {
    let mut merged: BTreeMap<Pcr, PcrListRules> = BTreeMap::new();

    for template in templates {
        let Some(part_template) = template.flavor_parts.get(&part) else {
            continue;
        };
        for rule in &part_template.pcr_rules {
            if rule.eventlog_equals.is_some() && rule.eventlog_includes.is_some() {
                return Err(FlavorError::PcrRuleConflict(rule.pcr.to_string()));
            }

            let entry = merged.entry(rule.pcr).or_default();
            entry.pcr_matches |= rule.pcr_matches;

            if let Some(equals) = &rule.eventlog_equals {
                if !entry.pcr_includes.is_empty() {
                    return Err(FlavorError::PcrRuleConflict(rule.pcr.to_string()));
                }
                entry.pcr_equals.is_equals = true;
                entry.pcr_equals.excluding_tags.extend(equals.excluding_tags.iter().cloned());
            }

            if let Some(includes) = &rule.eventlog_includes {
                if entry.pcr_equals.is_equals {
                    return Err(FlavorError::PcrRuleConflict(rule.pcr.to_string()));
                }
                entry.pcr_includes.extend(includes.iter().cloned());
            }
        }
    }

    Ok(merged)
}
