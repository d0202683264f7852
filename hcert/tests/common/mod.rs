// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{TimeZone as _, Utc};
use hcert::{encode_token, ArrayTrustStore, CertificateVerifier, HealthCertificate, TrustAnchor, HC1_PREFIX};
use minicbor::data::Tag;
use minicbor::Encoder;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::SigningKey;
use p256::pkcs8::DecodePrivateKey as _;
use sha2::{Digest as _, Sha256};

/// Minimal CBOR tree for building payloads, including malformed ones.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Node>),
    Map(Vec<(Node, Node)>),
    Tagged(u64, Box<Node>),
}

pub(crate) fn text(s: &str) -> Node {
    Node::Text(s.to_string())
}

pub(crate) fn obj(fields: Vec<(&str, Node)>) -> Node {
    Node::Map(fields.into_iter().map(|(k, v)| (text(k), v)).collect())
}

pub(crate) fn encode(node: &Node) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = Encoder::new(&mut out);
    write_node(&mut enc, node);
    out
}

fn write_node(enc: &mut Encoder<&mut Vec<u8>>, node: &Node) {
    match node {
        Node::Int(i) => {
            enc.i64(*i).unwrap();
        }
        Node::Text(s) => {
            enc.str(s).unwrap();
        }
        Node::Bytes(b) => {
            enc.bytes(b).unwrap();
        }
        Node::Array(items) => {
            enc.array(items.len() as u64).unwrap();
            for item in items {
                write_node(enc, item);
            }
        }
        Node::Map(entries) => {
            enc.map(entries.len() as u64).unwrap();
            for (k, v) in entries {
                write_node(enc, k);
                write_node(enc, v);
            }
        }
        Node::Tagged(tag, inner) => {
            enc.tag(Tag::new(*tag)).unwrap();
            write_node(enc, inner);
        }
    }
}

pub(crate) fn anna_mueller() -> Node {
    obj(vec![
        ("fn", text("Müller")),
        ("fnt", text("MUELLER")),
        ("gn", text("Anna")),
        ("gnt", text("ANNA")),
    ])
}

/// EU DCC with `ver`, `nam` and `dob` plus `entries`.
pub(crate) fn dcc(entries: Vec<(&str, Node)>) -> Node {
    let mut fields = vec![
        ("ver", text("1.3.0")),
        ("nam", anna_mueller()),
        ("dob", text("1964-08-12")),
    ];
    fields.extend(entries);
    obj(fields)
}

pub(crate) fn vaccination(dose_number: i64, total_doses: i64, date: &str) -> Node {
    obj(vec![
        ("tg", text("840539006")),
        ("vp", text("1119349007")),
        ("mp", text("EU/1/20/1528")),
        ("ma", text("ORG-100030215")),
        ("dn", Node::Int(dose_number)),
        ("sd", Node::Int(total_doses)),
        ("dt", text(date)),
        ("co", text("AT")),
        ("is", text("Ministry of Health, Austria")),
        ("ci", text("URN:UVCI:01:AT:10807843F94AEE0EE5093FBC254BD813#B")),
    ])
}

pub(crate) fn test_entry(test_type: &str, collected: &str, result: &str) -> Node {
    obj(vec![
        ("tg", text("840539006")),
        ("tt", text(test_type)),
        ("nm", text("Roche LightCycler qPCR")),
        ("sc", text(collected)),
        ("tr", text(result)),
        ("tc", text("Testing center Vienna 1")),
        ("co", text("AT")),
        ("is", text("Ministry of Health, Austria")),
        ("ci", text("URN:UVCI:01:AT:71EE2559DE38C6BF7304FB65A1A451EC#3")),
    ])
}

pub(crate) fn recovery(valid_from: &str, valid_until: &str) -> Node {
    obj(vec![
        ("tg", text("840539006")),
        ("fr", text("2021-02-20")),
        ("co", text("AT")),
        ("is", text("Ministry of Health, Austria")),
        ("df", text(valid_from)),
        ("du", text(valid_until)),
        ("ci", text("URN:UVCI:01:AT:858CC18CFCF5965EF82F60E493349AA5#K")),
    ])
}

/// CWT claims wrapping `dcc` under `-260 -> 1`.
pub(crate) fn cwt(dcc: Node) -> Vec<u8> {
    let issued = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap().timestamp();
    let expires = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap().timestamp();
    encode(&Node::Map(vec![
        (Node::Int(1), text("AT")),
        (Node::Int(4), Node::Int(expires)),
        (Node::Int(6), Node::Int(issued)),
        (Node::Int(-260), Node::Map(vec![(Node::Int(1), dcc)])),
    ]))
}

/// Payload of a fully vaccinated Anna Müller.
pub(crate) fn vaccinated_payload() -> Vec<u8> {
    cwt(dcc(vec![("v", Node::Array(vec![vaccination(2, 2, "2021-05-29")]))]))
}

/// Document signer with a self-signed P-256 certificate.
pub(crate) struct Issuer {
    pub(crate) country: String,
    pub(crate) kid: Vec<u8>,
    pub(crate) cert_pem: String,
    pub(crate) cert_der: Vec<u8>,
    signing_key: SigningKey,
}

impl Issuer {
    pub(crate) fn new(country: &str) -> Self {
        let certified = rcgen::generate_simple_self_signed([format!("dsc.{}", country.to_lowercase())]).unwrap();
        Self::from_parts(country, certified.cert, &certified.key_pair)
    }

    pub(crate) fn from_parts(country: &str, cert: rcgen::Certificate, key_pair: &rcgen::KeyPair) -> Self {
        let cert_der = cert.der().to_vec();
        let kid = Sha256::digest(&cert_der)[..8].to_vec();
        Self {
            country: country.to_string(),
            kid,
            cert_pem: cert.pem(),
            cert_der,
            signing_key: SigningKey::from_pkcs8_der(&key_pair.serialize_der()).unwrap(),
        }
    }

    pub(crate) fn kid_b64(&self) -> String {
        STANDARD.encode(&self.kid)
    }

    pub(crate) fn anchor(&self) -> TrustAnchor {
        TrustAnchor::new(
            "DSC",
            self.country.as_str(),
            &self.kid_b64(),
            &self.cert_pem,
            None,
            None,
            Utc.with_ymd_and_hms(2021, 5, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    pub(crate) fn store(&self) -> ArrayTrustStore {
        ArrayTrustStore::new(vec![self.anchor()])
    }

    /// ES256 COSE_Sign1 with the kid in the protected header.
    pub(crate) fn sign(&self, payload: &[u8]) -> Vec<u8> {
        self.sign_with_kids(payload, Some(&self.kid), None)
    }

    pub(crate) fn sign_with_kids(
        &self,
        payload: &[u8],
        protected_kid: Option<&[u8]>,
        unprotected_kid: Option<&[u8]>,
    ) -> Vec<u8> {
        let mut protected = vec![(Node::Int(1), Node::Int(-7))];
        if let Some(kid) = protected_kid {
            protected.push((Node::Int(4), Node::Bytes(kid.to_vec())));
        }
        let protected = encode(&Node::Map(protected));

        let unprotected = match unprotected_kid {
            Some(kid) => Node::Map(vec![(Node::Int(4), Node::Bytes(kid.to_vec()))]),
            None => Node::Map(vec![]),
        };

        let sig_structure = encode(&Node::Array(vec![
            text("Signature1"),
            Node::Bytes(protected.clone()),
            Node::Bytes(Vec::new()),
            Node::Bytes(payload.to_vec()),
        ]));
        let signature: p256::ecdsa::Signature = self.signing_key.sign(&sig_structure);

        encode(&Node::Tagged(
            18,
            Box::new(Node::Array(vec![
                Node::Bytes(protected),
                unprotected,
                Node::Bytes(payload.to_vec()),
                Node::Bytes(signature.to_bytes().to_vec()),
            ])),
        ))
    }

    pub(crate) fn token(&self, payload: &[u8]) -> String {
        encode_token(&self.sign(payload), HC1_PREFIX).unwrap()
    }
}

/// Certificate for Anna Müller carrying `entries`, taken through the full pipeline.
pub(crate) fn certificate(entries: Vec<(&str, Node)>) -> HealthCertificate {
    let issuer = Issuer::new("AT");
    let token = issuer.token(&cwt(dcc(entries)));
    CertificateVerifier::new(issuer.store()).verify_and_decode(&token).unwrap()
}
