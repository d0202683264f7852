// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Consumer example for the hcert verifier.
//!
//! Verifies one token against a JSON trust list and prints who it belongs to,
//! who signed it, and whether it covers COVID-19 by vaccination or recovery.

use anyhow::{bail, Context as _};
use hcert::{CertificateVerifier, JsonTrustStore, ProofTypes, Target, VerificationStage};
use tracing_subscriber::EnvFilter;

fn get_arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1).cloned())
}

fn usage_and_exit(exe: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {exe} --trust-list <json> --token <HC1:...>");
    eprintln!("  {exe} --trust-list <json> --token-file <file>");
    eprintln!();
    eprintln!("Set RUST_LOG=hcert=debug to trace the verification stages.");
    std::process::exit(2);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let exe = args.first().map(String::as_str).unwrap_or("hcert-hello-world");

    let Some(trust_list) = get_arg_value(&args, "--trust-list") else {
        usage_and_exit(exe);
    };
    let token = match (get_arg_value(&args, "--token"), get_arg_value(&args, "--token-file")) {
        (Some(token), None) => token,
        (None, Some(path)) => std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?,
        _ => usage_and_exit(exe),
    };

    let verifier = CertificateVerifier::new(JsonTrustStore::new(&trust_list));
    let cert = match verifier.verify_and_decode(token.trim()) {
        Ok(cert) => cert,
        Err(e) => {
            let summary = match e.stage() {
                VerificationStage::Transport | VerificationStage::Envelope => "unreadable code",
                VerificationStage::TrustStore => "trust list unavailable",
                VerificationStage::Signature => "untrusted issuer",
                VerificationStage::Payload => "certificate format not understood",
            };
            bail!("{summary}: {e}");
        }
    };

    let subject = cert.subject();
    println!(
        "subject: {} {}",
        subject.first_name().unwrap_or_default(),
        subject.last_name()
    );
    println!("born: {}", subject.date_of_birth);
    println!(
        "signer: {} {} (kid {} bytes, {:?})",
        cert.signer.country,
        cert.signer.certificate_type,
        cert.signer.kid.len(),
        cert.signer.algorithm
    );
    if let Some(exp) = cert.expires_at {
        println!("expires: {}", exp.to_rfc3339());
    }
    println!(
        "entries: {} vaccination(s), {} test(s), {} recovery(ies)",
        cert.vaccinations.len(),
        cert.tests.len(),
        cert.recoveries.len()
    );

    let covered = cert.is_covered(&Target::Covid19, ProofTypes::VACCINATION | ProofTypes::RECOVERY);
    println!("covered ({}, vaccination|recovery): {covered}", Target::Covid19);
    Ok(())
}
