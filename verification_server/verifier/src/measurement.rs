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

//! Application measurement log parsing and digest computation.
//!
//! Hosts report software measurements as XML documents of the form
//!
//! ```xml
//! <Measurement Label="app" DigestAlg="SHA384">
//!   <File Path="/opt/app/bin/run">{hex}</File>
//!   <Dir Path="/opt/app/etc">{hex}</Dir>
//!   <CumulativeHash>{hex}</CumulativeHash>
//! </Measurement>
//! ```
//!
//! The extraction here only needs the measured entries, the label, and the
//! declared cumulative hash.

use once_cell::sync::Lazy;
use openssl::hash::Hasher;
use regex::Regex;

use flavor::SoftwareMeasurement;
use host_manifest::DigestAlgorithm;

use crate::error::VerifierError;

/// Measurement documents are untrusted input; cap their size.
const MAX_MEASUREMENT_BYTES: usize = 5 * 1024 * 1024;

static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<Measurement\b[^>]*\bLabel="([^"]*)""#).expect("label regex"));
static ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(File|Dir|Symlink)\b[^>]*\bPath="([^"]*)"[^>]*>([0-9a-fA-F]+)</(?:File|Dir|Symlink)>"#)
        .expect("entry regex")
});
static CUMULATIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<CumulativeHash>([0-9a-fA-F]+)</CumulativeHash>"#).expect("cumulative regex"));

/// Parsed view of one reported measurement document
#[derive(Debug, Clone)]
pub struct MeasurementXml {
    pub label: String,
    pub entries: Vec<SoftwareMeasurement>,
    pub cumulative_hash: Option<String>,
    pub raw: String,
}

impl MeasurementXml {
    /// Parse a raw measurement document
    ///
    /// # Errors
    ///
    /// * `VerifierError::InputError` - oversized input or no `Measurement` label.
    pub fn parse(raw: &str) -> Result<Self, VerifierError> {
        if raw.len() > MAX_MEASUREMENT_BYTES {
            return Err(VerifierError::InputError("Measurement log exceeds 5MB limit".to_string()));
        }
        let label = LABEL_RE
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                VerifierError::InputError("Measurement log carries no Measurement label".to_string())
            })?;

        let entries = ENTRY_RE
            .captures_iter(raw)
            .map(|c| SoftwareMeasurement {
                kind: c[1].to_string(),
                path: c[2].to_string(),
                value: c[3].to_lowercase(),
            })
            .collect();

        let cumulative_hash =
            CUMULATIVE_RE.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str().to_lowercase());

        Ok(Self { label, entries, cumulative_hash, raw: raw.to_string() })
    }

    /// Parse every document and return the one matching `label`
    ///
    /// # Errors
    ///
    /// * `VerifierError::InputError` - a document fails to parse.
    pub fn find_by_label(raw_xmls: &[String], label: &str) -> Result<Option<MeasurementXml>, VerifierError> {
        for raw in raw_xmls {
            let parsed = Self::parse(raw)?;
            if parsed.label == label {
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }

    /// SHA-384 hex over the raw document bytes
    ///
    /// # Errors
    ///
    /// * `VerifierError::CryptoError` - the crypto backend fails.
    pub fn document_digest(&self) -> Result<String, VerifierError> {
        let mut hasher = Hasher::new(DigestAlgorithm::Sha384.message_digest())
            .map_err(|e| VerifierError::CryptoError(format!("Failed to create hasher: {}", e)))?;
        hasher
            .update(self.raw.as_bytes())
            .map_err(|e| VerifierError::CryptoError(format!("Failed to update hash: {}", e)))?;
        let digest = hasher
            .finish()
            .map_err(|e| VerifierError::CryptoError(format!("Failed to finalize hash: {}", e)))?;
        Ok(hex::encode(digest))
    }

    /// Fold the entry values into the cumulative hash, in document order:
    /// starting from a zero buffer, `H(previous || value)` with SHA-384.
    ///
    /// # Errors
    ///
    /// * `VerifierError::InputError` - an entry value is not SHA-384-width hex.
    /// * `VerifierError::CryptoError` - the crypto backend fails.
    pub fn replay_cumulative(&self) -> Result<String, VerifierError> {
        let width = DigestAlgorithm::Sha384.digest_size();
        let mut current = vec![0u8; width];
        for entry in &self.entries {
            let value = hex::decode(&entry.value).map_err(|e| {
                VerifierError::InputError(format!(
                    "Failed to decode measurement for '{}': {}",
                    entry.path, e
                ))
            })?;
            if value.len() != width {
                return Err(VerifierError::InputError(format!(
                    "Measurement width {} for '{}' does not match SHA384",
                    value.len(),
                    entry.path
                )));
            }
            let mut hasher = Hasher::new(DigestAlgorithm::Sha384.message_digest())
                .map_err(|e| VerifierError::CryptoError(format!("Failed to create hasher: {}", e)))?;
            hasher
                .update(&current)
                .map_err(|e| VerifierError::CryptoError(format!("Failed to update hash: {}", e)))?;
            hasher
                .update(&value)
                .map_err(|e| VerifierError::CryptoError(format!("Failed to update hash: {}", e)))?;
            current = hasher
                .finish()
                .map_err(|e| VerifierError::CryptoError(format!("Failed to finalize hash: {}", e)))?
                .to_vec();
        }
        Ok(hex::encode(current))
    }
}
