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

//! Signed flavor envelope and signature verification.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use openssl::hash::MessageDigest;
use openssl::sign::{Signer, Verifier};
use openssl::x509::X509;
use serde::{Deserialize, Serialize};

use crate::error::FlavorError;
use crate::model::Flavor;

/// A flavor plus a detached signature over its canonical JSON bytes.
/// Immutable once created; verified against a trusted flavor-signing
/// certificate before use unless verification is explicitly skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedFlavor {
    pub flavor: Flavor,
    /// Base64 RSA-SHA384 signature over the flavor's canonical JSON bytes
    pub signature: String,
}

impl SignedFlavor {
    pub fn new(flavor: Flavor, signature: impl Into<String>) -> Self {
        Self { flavor, signature: signature.into() }
    }

    /// Canonical byte representation the signature covers
    ///
    /// # Errors
    ///
    /// * `FlavorError::InputError` - flavor content does not serialize.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, FlavorError> {
        serde_json::to_vec(&self.flavor)
            .map_err(|e| FlavorError::InputError(format!("Failed to serialize flavor: {}", e)))
    }

    /// Verify the detached signature against a flavor-signing certificate
    ///
    /// # Arguments
    /// * `cert` - Trusted flavor-signing certificate
    ///
    /// # Returns
    /// * `Result<bool, FlavorError>` - true when the signature checks out
    ///
    /// # Errors
    ///
    /// * `FlavorError::InputError` - signature is not valid base64.
    /// * `FlavorError::CryptoError` - the certificate key cannot be used.
    pub fn verify_signature(&self, cert: &X509) -> Result<bool, FlavorError> {
        let signature = BASE64
            .decode(self.signature.as_bytes())
            .map_err(|e| FlavorError::InputError(format!("Failed to decode flavor signature: {}", e)))?;
        let payload = self.canonical_bytes()?;
        let public_key = cert
            .public_key()
            .map_err(|e| FlavorError::CryptoError(format!("Failed to extract public key: {}", e)))?;
        let mut verifier = Verifier::new(MessageDigest::sha384(), &public_key)
            .map_err(|e| FlavorError::CryptoError(format!("Failed to create verifier: {}", e)))?;
        verifier
            .update(&payload)
            .map_err(|e| FlavorError::CryptoError(format!("Failed to feed verifier: {}", e)))?;
        verifier
            .verify(&signature)
            .map_err(|e| FlavorError::CryptoError(format!("Failed to verify signature: {}", e)))
    }

    /// Sign a flavor with a private key. Test and provisioning helper; the
    /// verification service itself never signs.
    ///
    /// # Errors
    ///
    /// * `FlavorError::CryptoError` - the key cannot produce a signature.
    pub fn sign(flavor: Flavor, key: &openssl::pkey::PKey<openssl::pkey::Private>) -> Result<Self, FlavorError> {
        let payload = serde_json::to_vec(&flavor)
            .map_err(|e| FlavorError::InputError(format!("Failed to serialize flavor: {}", e)))?;
        let mut signer = Signer::new(MessageDigest::sha384(), key)
            .map_err(|e| FlavorError::CryptoError(format!("Failed to create signer: {}", e)))?;
        signer
            .update(&payload)
            .map_err(|e| FlavorError::CryptoError(format!("Failed to feed signer: {}", e)))?;
        let signature = signer
            .sign_to_vec()
            .map_err(|e| FlavorError::CryptoError(format!("Failed to sign flavor: {}", e)))?;
        Ok(Self { flavor, signature: BASE64.encode(signature) })
    }
}
