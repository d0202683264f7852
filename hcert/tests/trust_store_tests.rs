// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod common;

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{TimeZone as _, Utc};
use common::{vaccinated_payload, Issuer};
use hcert::{
    parse_trust_list, ArrayTrustStore, CertificateVerifier, InvalidSignatureError, JsonTrustStore, TrustAnchor,
    TrustAnchorRecord, TrustStore, TrustStoreError, VerificationStage, VerifyError,
};
use serde_json::json;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hcert-{}-{name}.json", std::process::id()))
}

fn trust_list(issuers: &[&Issuer]) -> String {
    let certificates: Vec<_> = issuers
        .iter()
        .map(|i| {
            json!({
                "certificateType": "DSC",
                "country": i.country,
                "kid": i.kid_b64(),
                "rawData": STANDARD.encode(&i.cert_der),
                "signature": "",
                "thumbprint": "0f6b1a2d",
                "timestamp": "2021-05-31T12:00:00+02:00",
            })
        })
        .collect();
    json!({ "certificates": certificates }).to_string()
}

#[test]
fn trust_list_json_is_parsed() {
    let at = Issuer::new("AT");
    let de = Issuer::new("DE");

    let anchors = parse_trust_list(&trust_list(&[&at, &de])).unwrap();
    assert_eq!(anchors.len(), 2);

    let first = &anchors[0];
    assert_eq!(first.certificate_type(), "DSC");
    assert_eq!(first.country(), "AT");
    assert_eq!(first.kid(), at.kid.as_slice());
    assert_eq!(first.kid_base64(), at.kid_b64());
    assert_eq!(first.key_material(), at.cert_der.as_slice());
    assert_eq!(first.signature(), None);
    assert_eq!(first.thumbprint(), Some("0f6b1a2d"));
    assert_eq!(first.timestamp(), Utc.with_ymd_and_hms(2021, 5, 31, 10, 0, 0).unwrap());
    assert_eq!(anchors[1].country(), "DE");
}

#[test]
fn pem_and_base64_key_material_are_equivalent() {
    let issuer = Issuer::new("AT");
    let from_pem = issuer.anchor();
    let from_b64 = TrustAnchor::new(
        "DSC",
        "AT",
        &issuer.kid_b64(),
        &STANDARD.encode(&issuer.cert_der),
        None,
        None,
        from_pem.timestamp(),
    )
    .unwrap();

    assert_eq!(from_pem, from_b64);
    assert!(from_pem.is_current_at(Utc::now()));
}

#[test]
fn invalid_entries_reject_the_whole_list() {
    let issuer = Issuer::new("AT");
    let record = |kid: &str, raw: &str, ts: &str| {
        json!({ "certificates": [{
            "certificateType": "DSC",
            "country": "AT",
            "kid": kid,
            "rawData": raw,
            "timestamp": ts,
        }]})
        .to_string()
    };
    let raw = STANDARD.encode(&issuer.cert_der);
    let kid = issuer.kid_b64();

    assert!(matches!(
        parse_trust_list(&record("not base64!", &raw, "2021-05-31T00:00:00Z")),
        Err(TrustStoreError::InvalidKeyId { .. })
    ));
    assert!(matches!(
        parse_trust_list(&record("", &raw, "2021-05-31T00:00:00Z")),
        Err(TrustStoreError::InvalidKeyId { .. })
    ));
    assert!(matches!(
        parse_trust_list(&record(&kid, "%%%", "2021-05-31T00:00:00Z")),
        Err(TrustStoreError::InvalidKeyMaterial { .. })
    ));
    assert!(matches!(
        parse_trust_list(&record(&kid, &raw, "yesterday")),
        Err(TrustStoreError::InvalidTimestamp { .. })
    ));
    assert!(matches!(parse_trust_list("{\"anchors\": []}"), Err(TrustStoreError::Json(_))));
    assert!(matches!(parse_trust_list("[]"), Err(TrustStoreError::Json(_))));
}

#[test]
fn records_convert_into_an_array_store() {
    let issuer = Issuer::new("AT");
    let record = TrustAnchorRecord {
        certificate_type: "DSC".to_string(),
        country: "AT".to_string(),
        kid: issuer.kid_b64(),
        raw_data: issuer.cert_pem.clone(),
        signature: Some("c2lnbmF0dXJl".to_string()),
        thumbprint: None,
        timestamp: "2021-05-31T00:00:00Z".to_string(),
    };

    let store = ArrayTrustStore::from_records([record]).unwrap();
    assert_eq!(store.anchors().len(), 1);
    assert_eq!(store.anchors()[0].signature(), Some("c2lnbmF0dXJl"));
    assert_eq!(store.fetch_trust_anchors().unwrap(), store.anchors());

    let store = ArrayTrustStore::from_json(&trust_list(&[&issuer])).unwrap();
    CertificateVerifier::new(store)
        .verify_and_decode(&issuer.token(&vaccinated_payload()))
        .unwrap();
}

#[test]
fn json_store_rereads_its_file_on_every_fetch() {
    let issuer = Issuer::new("AT");
    let other = Issuer::new("DE");
    let token = issuer.token(&vaccinated_payload());
    let path = temp_path("rereads");

    std::fs::write(&path, trust_list(&[&issuer])).unwrap();
    let verifier = CertificateVerifier::new(JsonTrustStore::new(&path));
    assert_eq!(verifier.store().path(), path.as_path());
    assert_eq!(verifier.verify_and_decode(&token).unwrap().signer.country, "AT");

    std::fs::write(&path, trust_list(&[&other])).unwrap();
    let err = verifier.verify_and_decode(&token).unwrap_err();
    assert!(matches!(err, VerifyError::Signature(InvalidSignatureError::UnknownKeyId { .. })));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn unreadable_json_store_fails_closed() {
    let issuer = Issuer::new("AT");
    let token = issuer.token(&vaccinated_payload());

    let missing = CertificateVerifier::new(JsonTrustStore::new(temp_path("does-not-exist")));
    let err = missing.verify_and_decode(&token).unwrap_err();
    assert_eq!(err.stage(), VerificationStage::TrustStore);
    assert!(matches!(err, VerifyError::TrustStore(TrustStoreError::Io(_))));

    let path = temp_path("garbage");
    std::fs::write(&path, "certificates").unwrap();
    let err = CertificateVerifier::new(JsonTrustStore::new(&path))
        .verify_and_decode(&token)
        .unwrap_err();
    assert!(matches!(err, VerifyError::TrustStore(TrustStoreError::Json(_))));
    std::fs::remove_file(&path).unwrap();
}
