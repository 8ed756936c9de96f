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

//! Event-log algebra: cumulative hash replay, set difference and tag filtering.
//!
//! An event log is the ordered list of measurement records extended into one
//! PCR. Replaying the log must reproduce the PCR reading; comparing two logs
//! keyed by `(type_id, measurement)` yields the missing/unexpected entry sets
//! the policy rules report as faults.

use std::collections::{HashMap, HashSet};

use openssl::hash::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::manifest::Pcr;

/// TCG event type id of EV_NO_ACTION informational events
pub const EV_NO_ACTION_TYPE_ID: &str = "0x00000003";

/// Tag carried by the TPM startup-locality EV_NO_ACTION event for locality 3
pub const STARTUP_LOCALITY3_TAG: &str = "StartupLocality3";

/// A single measurement record within a PCR's event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub type_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Hex digest extended into the PCR, bank-width bytes
    pub measurement: String,
}

impl EventLogEntry {
    pub fn new(type_id: impl Into<String>, measurement: impl Into<String>) -> Self {
        Self { type_id: type_id.into(), type_name: None, tags: Vec::new(), measurement: measurement.into() }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// EV_NO_ACTION events carry no measurement and are skipped during replay
    pub fn is_no_action(&self) -> bool {
        self.type_id == EV_NO_ACTION_TYPE_ID || self.type_name.as_deref() == Some("EV_NO_ACTION")
    }

    /// Comparison key: two entries are the same event iff type id and measurement match
    fn key(&self) -> (&str, &str) {
        (self.type_id.as_str(), self.measurement.as_str())
    }

    /// True when the keyed fields match but name or tags differ
    fn fields_differ(&self, other: &EventLogEntry) -> bool {
        let self_tags: HashSet<&str> = self.tags.iter().map(String::as_str).collect();
        let other_tags: HashSet<&str> = other.tags.iter().map(String::as_str).collect();
        self.type_name != other.type_name || self_tags != other_tags
    }
}

/// The ordered event log of one PCR. Order is the extend order and is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub pcr: Pcr,
    pub events: Vec<EventLogEntry>,
}

impl EventLog {
    pub fn new(pcr: Pcr, events: Vec<EventLogEntry>) -> Self {
        Self { pcr, events }
    }

    /// Replay the log into the cumulative PCR value.
    ///
    /// Starts from a bank-width zero buffer; when the first event is the
    /// EV_NO_ACTION startup-locality event tagged `StartupLocality3`, the
    /// final byte of the initial value is `0x03`. Every other EV_NO_ACTION
    /// event is skipped; all remaining events fold as
    /// `H(previous || measurement)` using the bank's hash.
    ///
    /// # Returns
    /// * `Result<String, ManifestError>` - Hex of the cumulative value
    ///
    /// # Errors
    ///
    /// * `ManifestError::InputError` - a measurement is not valid hex or is
    ///   not exactly the bank's digest width.
    /// * `ManifestError::InternalError` - the crypto backend fails.
    pub fn replay(&self) -> Result<String, ManifestError> {
        let width = self.pcr.bank.digest_size();
        let mut current = vec![0u8; width];

        if let Some(first) = self.events.first() {
            if first.is_no_action() && first.tags.iter().any(|t| t == STARTUP_LOCALITY3_TAG) {
                current[width - 1] = 0x03;
            }
        }

        for event in &self.events {
            if event.is_no_action() {
                continue;
            }
            let measurement = hex::decode(&event.measurement).map_err(|e| {
                ManifestError::InputError(format!(
                    "Failed to decode measurement for {}: '{}', error: {}",
                    self.pcr, event.measurement, e
                ))
            })?;
            if measurement.len() != width {
                return Err(ManifestError::InputError(format!(
                    "Measurement width {} does not match bank {} for {}",
                    measurement.len(),
                    self.pcr.bank,
                    self.pcr
                )));
            }
            let mut hasher = Hasher::new(self.pcr.bank.message_digest())
                .map_err(|e| ManifestError::InternalError(format!("Failed to create hasher: {}", e)))?;
            hasher
                .update(&current)
                .map_err(|e| ManifestError::InternalError(format!("Failed to update hash: {}", e)))?;
            hasher
                .update(&measurement)
                .map_err(|e| ManifestError::InternalError(format!("Failed to update hash: {}", e)))?;
            current = hasher
                .finish()
                .map_err(|e| ManifestError::InternalError(format!("Failed to finalize hash: {}", e)))?
                .to_vec();
        }

        Ok(hex::encode(current))
    }

    /// Set difference against another log over the same PCR.
    ///
    /// Returns `(only_in_self, field_mismatches)`: entries of `self` whose
    /// `(type_id, measurement)` key is absent from `other`, and entries of
    /// `self` whose key is present in `other` but whose `type_name` or `tags`
    /// differ.
    ///
    /// # Errors
    ///
    /// * `ManifestError::PcrMismatch` - the logs cover different `(bank, index)`.
    pub fn subtract(&self, other: &EventLog) -> Result<(EventLog, EventLog), ManifestError> {
        if self.pcr != other.pcr {
            return Err(ManifestError::PcrMismatch {
                left: self.pcr.to_string(),
                right: other.pcr.to_string(),
            });
        }

        let mut keyed: HashMap<(&str, &str), &EventLogEntry> = HashMap::new();
        for event in &other.events {
            keyed.entry(event.key()).or_insert(event);
        }

        let mut only_in_self = Vec::new();
        let mut mismatched = Vec::new();
        for event in &self.events {
            match keyed.get(&event.key()) {
                None => only_in_self.push(event.clone()),
                Some(counterpart) if event.fields_differ(counterpart) => mismatched.push(event.clone()),
                Some(_) => {}
            }
        }

        Ok((EventLog::new(self.pcr, only_in_self), EventLog::new(self.pcr, mismatched)))
    }

    /// Copy of this log without events carrying any tag in the exclude set
    pub fn without_tags(&self, exclude: &HashSet<String>) -> EventLog {
        if exclude.is_empty() {
            return self.clone();
        }
        let events = self
            .events
            .iter()
            .filter(|e| !e.tags.iter().any(|t| exclude.contains(t)))
            .cloned()
            .collect();
        EventLog::new(self.pcr, events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
