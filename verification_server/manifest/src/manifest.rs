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

//! Host and PCR manifest types.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use openssl::hash::MessageDigest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ManifestError;
use crate::eventlog::EventLog;

/// Valid PCR index range (0-23)
const PCR_INDEX_MIN: u32 = 0;
const PCR_INDEX_MAX: u32 = 23;

/// Manifests are untrusted input; cap their serialized size.
const MAX_MANIFEST_BYTES: usize = 5 * 1024 * 1024;

/// PCR bank hash algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Digest width in bytes for this bank
    pub fn digest_size(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    pub fn message_digest(&self) -> MessageDigest {
        match self {
            DigestAlgorithm::Sha1 => MessageDigest::sha1(),
            DigestAlgorithm::Sha256 => MessageDigest::sha256(),
            DigestAlgorithm::Sha384 => MessageDigest::sha384(),
            DigestAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SHA1" => Ok(DigestAlgorithm::Sha1),
            "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA384" => Ok(DigestAlgorithm::Sha384),
            "SHA512" => Ok(DigestAlgorithm::Sha512),
            other => Err(ManifestError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// A PCR identified by bank and register index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pcr {
    pub index: u32,
    pub bank: DigestAlgorithm,
}

impl Pcr {
    /// # Errors
    ///
    /// * `ManifestError::InvalidPcrIndex` - If the index is outside 0-23.
    pub fn new(index: u32, bank: DigestAlgorithm) -> Result<Self, ManifestError> {
        if !(PCR_INDEX_MIN..=PCR_INDEX_MAX).contains(&index) {
            return Err(ManifestError::InvalidPcrIndex(index));
        }
        Ok(Self { index, bank })
    }
}

impl fmt::Display for Pcr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pcr_{}_{}", self.index, self.bank)
    }
}

/// A single PCR reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcrReading {
    pub pcr: Pcr,
    pub value: String,
}

impl PcrReading {
    pub fn new(pcr: Pcr, value: impl Into<String>) -> Self {
        Self { pcr, value: value.into() }
    }
}

/// Per-bank PCR readings plus the event logs keyed by `(bank, index)`.
///
/// Invariant: at most one reading and at most one event log per `(bank, index)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PcrManifest {
    pub pcrs: Vec<PcrReading>,
    pub event_logs: Vec<EventLog>,
}

impl PcrManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a PCR reading
    ///
    /// # Errors
    ///
    /// * `ManifestError::InputError` - If a reading for the same `(bank, index)` already exists
    ///   or the value is not valid hex.
    pub fn add_reading(&mut self, reading: PcrReading) -> Result<(), ManifestError> {
        if !is_valid_hex_string(&reading.value) {
            return Err(ManifestError::InputError(format!(
                "Invalid hex format for PCR value: {} = '{}'",
                reading.pcr, reading.value
            )));
        }
        if self.pcr_value(reading.pcr.bank, reading.pcr.index).is_some() {
            return Err(ManifestError::InputError(format!(
                "Duplicate PCR reading: {}",
                reading.pcr
            )));
        }
        self.pcrs.push(reading);
        Ok(())
    }

    /// Add an event log
    ///
    /// # Errors
    ///
    /// * `ManifestError::InputError` - If an event log for the same `(bank, index)` already exists.
    pub fn add_event_log(&mut self, event_log: EventLog) -> Result<(), ManifestError> {
        if self.event_log(event_log.pcr.bank, event_log.pcr.index).is_some() {
            return Err(ManifestError::InputError(format!(
                "Duplicate event log: {}",
                event_log.pcr
            )));
        }
        self.event_logs.push(event_log);
        Ok(())
    }

    /// Get the PCR reading for a specific bank and index
    pub fn pcr_value(&self, bank: DigestAlgorithm, index: u32) -> Option<&PcrReading> {
        self.pcrs.iter().find(|r| r.pcr.bank == bank && r.pcr.index == index)
    }

    /// Get the event log for a specific bank and index
    pub fn event_log(&self, bank: DigestAlgorithm, index: u32) -> Option<&EventLog> {
        self.event_logs.iter().find(|l| l.pcr.bank == bank && l.pcr.index == index)
    }

    /// True if the manifest carries no PCR readings at all
    pub fn is_empty(&self) -> bool {
        self.pcrs.is_empty()
    }

    /// Validate manifest invariants after deserialization
    ///
    /// # Errors
    ///
    /// * `ManifestError::InputError` - duplicate `(bank, index)` readings or invalid hex values.
    /// * `ManifestError::InvalidPcrIndex` - an index outside the register range.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for reading in &self.pcrs {
            if !(PCR_INDEX_MIN..=PCR_INDEX_MAX).contains(&reading.pcr.index) {
                return Err(ManifestError::InvalidPcrIndex(reading.pcr.index));
            }
            if !seen.insert(reading.pcr) {
                return Err(ManifestError::InputError(format!(
                    "Duplicate PCR reading: {}",
                    reading.pcr
                )));
            }
            if !is_valid_hex_string(&reading.value) {
                return Err(ManifestError::InputError(format!(
                    "Invalid hex format for PCR value: {} = '{}'",
                    reading.pcr, reading.value
                )));
            }
        }
        let mut seen_logs = HashSet::new();
        for event_log in &self.event_logs {
            if !seen_logs.insert(event_log.pcr) {
                return Err(ManifestError::InputError(format!(
                    "Duplicate event log: {}",
                    event_log.pcr
                )));
            }
        }
        Ok(())
    }
}

/// Host platform vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostVendor {
    Intel,
    Vmware,
}

impl fmt::Display for HostVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostVendor::Intel => write!(f, "INTEL"),
            HostVendor::Vmware => write!(f, "VMWARE"),
        }
    }
}

/// TPM specification version reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TpmVersion {
    #[serde(rename = "1.2")]
    V1_2,
    #[serde(rename = "2.0")]
    V2_0,
}

impl fmt::Display for TpmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TpmVersion::V1_2 => write!(f, "1.2"),
            TpmVersion::V2_0 => write!(f, "2.0"),
        }
    }
}

/// Host identity and platform description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    pub host_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_uuid: Option<Uuid>,
    pub vendor: HostVendor,
    pub tpm_version: TpmVersion,
}

/// Read-only snapshot of a host's measurement state, produced by the host
/// data fetcher and consumed by the policy rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostManifest {
    pub host_info: HostInfo,
    pub pcr_manifest: PcrManifest,
    /// Base64 of the provisioned asset-tag digest, when one is written to the TPM
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_tag_digest: Option<String>,
    /// Base64 DER of the host's attestation identity key certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aik_certificate: Option<String>,
    /// Raw XML application measurement logs reported by the host
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measurement_xmls: Vec<String>,
}

impl HostManifest {
    pub fn new(host_info: HostInfo) -> Self {
        Self {
            host_info,
            pcr_manifest: PcrManifest::new(),
            asset_tag_digest: None,
            aik_certificate: None,
            measurement_xmls: Vec::new(),
        }
    }

    /// Parse a host manifest from JSON and validate its invariants
    ///
    /// # Errors
    ///
    /// * `ManifestError::InputError` - oversized input, JSON that does not
    ///   parse, or a manifest violating the one-reading-per-PCR invariant.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ManifestError> {
        if json.to_string().len() > MAX_MANIFEST_BYTES {
            return Err(ManifestError::InputError("Manifest size exceeds 5MB limit".to_string()));
        }
        let manifest: HostManifest = serde_json::from_value(json.clone())
            .map_err(|e| ManifestError::InputError(format!("Failed to parse host manifest: {}", e)))?;
        manifest.pcr_manifest.validate()?;
        Ok(manifest)
    }
}

/// Validates if the given string is valid hexadecimal format
fn is_valid_hex_string(hex_str: &str) -> bool {
    !hex_str.is_empty() && hex_str.len() % 2 == 0 && hex_str.chars().all(|c| c.is_ascii_hexdigit())
}
