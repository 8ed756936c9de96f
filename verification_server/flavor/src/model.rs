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

//! Flavor content model.
//!
//! A flavor describes the good-known measurement state for one class of host
//! configuration, split by flavor part: PLATFORM and OS carry PCR
//! expectations, HOST_UNIQUE carries per-host PCR expectations, ASSET_TAG
//! carries the provisioned tag digest, SOFTWARE carries application
//! measurement expectations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use host_manifest::{EventLogEntry, HostVendor, Pcr};

use crate::error::FlavorError;

/// The section of host state a flavor describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlavorPart {
    #[serde(rename = "PLATFORM")]
    Platform,
    #[serde(rename = "OS")]
    Os,
    #[serde(rename = "HOST_UNIQUE")]
    HostUnique,
    #[serde(rename = "ASSET_TAG")]
    AssetTag,
    #[serde(rename = "SOFTWARE")]
    Software,
}

impl fmt::Display for FlavorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlavorPart::Platform => "PLATFORM",
            FlavorPart::Os => "OS",
            FlavorPart::HostUnique => "HOST_UNIQUE",
            FlavorPart::AssetTag => "ASSET_TAG",
            FlavorPart::Software => "SOFTWARE",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorDescription {
    pub flavor_part: FlavorPart,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<HostVendor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorMeta {
    pub id: Uuid,
    pub description: FlavorDescription,
    pub created: DateTime<Utc>,
}

impl FlavorMeta {
    pub fn new(description: FlavorDescription) -> Self {
        Self { id: Uuid::new_v4(), description, created: Utc::now() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bios {
    pub bios_name: String,
    pub bios_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hardware {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_info: Option<String>,
    pub tpm_enabled: bool,
}

/// Expected event-log state for the equals validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEquals {
    pub events: Vec<EventLogEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_tags: Vec<String>,
}

/// Expected measurement state for one PCR.
///
/// `event_log_equals` and `event_log_includes` are mutually exclusive
/// validation strategies for the same measurement stream; declaring both is
/// a configuration error, never a runtime fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorPcrs {
    pub pcr: Pcr,
    pub measurement: String,
    #[serde(default)]
    pub pcr_matches: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log_equals: Option<EventLogEquals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log_includes: Option<Vec<EventLogEntry>>,
}

impl FlavorPcrs {
    /// # Errors
    ///
    /// * `FlavorError::ExclusiveEventLogRules` - both strategies declared.
    pub fn validate(&self) -> Result<(), FlavorError> {
        if self.event_log_equals.is_some() && self.event_log_includes.is_some() {
            return Err(FlavorError::ExclusiveEventLogRules(self.pcr.to_string()));
        }
        Ok(())
    }
}

/// Asset-tag section of an ASSET_TAG flavor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct External {
    /// Base64 of the digest expected to be provisioned in the host TPM
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_tag_digest: Option<String>,
    /// Base64 DER of the tag certificate bound to the host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_certificate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareMeasurement {
    /// File/Dir/Symlink kind of the measured path
    pub kind: String,
    pub path: String,
    /// Hex SHA-384 of the measured content
    pub value: String,
}

/// Software section of a SOFTWARE flavor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Software {
    /// Label binding the flavor to one reported measurement document
    pub label: String,
    pub measurements: Vec<SoftwareMeasurement>,
    /// Hex cumulative hash over the measurement values, in document order
    pub cumulative_hash: String,
    /// Hex SHA-384 over the raw measurement document bytes
    pub xml_digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flavor {
    pub meta: FlavorMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bios: Option<Bios>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware: Option<Hardware>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pcrs: Vec<FlavorPcrs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<External>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<Software>,
}

impl Flavor {
    pub fn new(meta: FlavorMeta) -> Self {
        Self { meta, bios: None, hardware: None, pcrs: Vec::new(), external: None, software: None }
    }

    pub fn part(&self) -> FlavorPart {
        self.meta.description.flavor_part
    }

    /// Validate flavor invariants
    ///
    /// # Errors
    ///
    /// * `FlavorError::ExclusiveEventLogRules` - a PCR declares both event-log strategies.
    pub fn validate(&self) -> Result<(), FlavorError> {
        for pcr in &self.pcrs {
            pcr.validate()?;
        }
        Ok(())
    }
}
