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

use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder, X509};

use flavor::{Flavor, FlavorDescription, FlavorMeta, FlavorPart, SignedFlavor};

fn generate_key() -> PKey<Private> {
    let rsa = Rsa::generate(2048).unwrap();
    PKey::from_rsa(rsa).unwrap()
}

fn self_signed_cert(key: &PKey<Private>) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "flavor-signing").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    builder.sign(key, MessageDigest::sha384()).unwrap();
    builder.build()
}

fn platform_flavor() -> Flavor {
    Flavor::new(FlavorMeta::new(FlavorDescription {
        flavor_part: FlavorPart::Platform,
        label: "platform-test".to_string(),
        vendor: None,
    }))
}

#[test]
fn test_sign_and_verify_round_trip() {
    let key = generate_key();
    let cert = self_signed_cert(&key);

    let signed = SignedFlavor::sign(platform_flavor(), &key).unwrap();
    assert!(signed.verify_signature(&cert).unwrap());
}

#[test]
fn test_tampered_flavor_fails_verification() {
    let key = generate_key();
    let cert = self_signed_cert(&key);

    let mut signed = SignedFlavor::sign(platform_flavor(), &key).unwrap();
    signed.flavor.meta.description.label = "tampered".to_string();

    assert!(!signed.verify_signature(&cert).unwrap());
}

#[test]
fn test_garbage_signature_is_input_error() {
    let key = generate_key();
    let cert = self_signed_cert(&key);

    let signed = SignedFlavor::new(platform_flavor(), "not-base64!!!");
    assert!(signed.verify_signature(&cert).is_err());
}
