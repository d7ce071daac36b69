//! Certificate Generation Module
//!
//! Builds, keys and signs one X.509v3 certificate from a [`CertData`]. Root
//! CAs, intermediate CAs and leaf certificates all go through [`generate`];
//! what differs is decided by the descriptor's `is_ca` flag and by the
//! [`Issuer`] passed in.
//!
//! # Certificate Properties
//! - **Version**: X.509v3
//! - **Signature Algorithm**: SHA-256 with RSA
//! - **Basic Constraints**: critical, CA flag from the descriptor, no path length
//! - **Key Usage** (critical):
//!   - CA: keyCertSign, cRLSign
//!   - leaf: digitalSignature, dataEncipherment
//! - **Extended Key Usage** (leaf only): serverAuth, clientAuth
//! - **Subject Alternative Name** (leaf only, when DNS names or IPs are given)
//! - **Subject Key Identifier**: CA certificates
//! - **Authority Key Identifier**: chained certificates whose parent has a
//!   subject key identifier
//! - **Serial Number**: the descriptor's serial, `0` when unset
//!
//! The serial is never randomised. Two certificates issued by the same CA
//! without an explicit serial therefore share serial `0`, which strict
//! relying parties may reject.

use chrono::{DateTime, Months, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
    SubjectKeyIdentifier,
};
use openssl::x509::{X509Extension, X509};
use tracing::debug;

use crate::cert_data::CertData;
use crate::error::{signing, PkiError, Result};
use crate::pair_store::CertificatePair;

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2

/// Who signs the certificate being generated.
#[derive(Debug, Clone, Copy)]
pub enum Issuer<'a> {
    /// Signed with its own fresh key; issuer name is `CertData::issuer`.
    SelfSigned,
    /// Signed with the parent's key; issuer name is the parent's subject.
    Parent(&'a CertificatePair),
}

/// Output of [`generate`]: the signed certificate and the DER blobs ready to
/// be saved.
pub struct IssuedPair {
    pub certificate: X509,
    pub certificate_der: Vec<u8>,
    /// PKCS#1 `RSAPrivateKey` DER.
    pub private_key_der: Vec<u8>,
}

/// `[now, now + years]`, adding calendar years rather than a fixed number of days.
///
/// A start on Feb 29 ends on Feb 28 when the end year is not a leap year.
pub fn validity_bounds(now: DateTime<Utc>, years: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let not_after = years
        .checked_mul(12)
        .and_then(|months| now.checked_add_months(Months::new(months)))
        .ok_or(PkiError::InvalidValidity { years })?;
    Ok((now, not_after))
}

fn basic_constraints(is_ca: bool) -> Result<X509Extension> {
    let mut bc = BasicConstraints::new();
    bc.critical();
    if is_ca {
        bc.ca();
    }
    bc.build().map_err(signing("build BasicConstraints"))
}

fn key_usage(is_ca: bool) -> Result<X509Extension> {
    let mut ku = KeyUsage::new();
    ku.critical();
    if is_ca {
        ku.key_cert_sign().crl_sign();
    } else {
        ku.data_encipherment().digital_signature();
    }
    ku.build().map_err(signing("build KeyUsage"))
}

/// Generate a keypair and a signed certificate for `request`.
///
/// Nothing is written to disk; the caller persists the returned DER.
///
/// # Errors
/// [`PkiError::Signing`] for any OpenSSL failure (name encoding, key
/// generation, extension building, signing), and
/// [`PkiError::InvalidValidity`] when the validity end date overflows.
pub fn generate(request: &CertData, issuer: Issuer<'_>) -> Result<IssuedPair> {
    let mut builder = X509::builder().map_err(signing("create X509 builder"))?;
    builder
        .set_version(X509_VERSION_3)
        .map_err(signing("set version"))?;

    let subject_name = request.subject.to_x509_name()?;
    builder
        .set_subject_name(&subject_name)
        .map_err(signing("set subject"))?;

    let (not_before, not_after) = validity_bounds(Utc::now(), request.valid_years)?;
    let not_before =
        Asn1Time::from_unix(not_before.timestamp()).map_err(signing("create not_before"))?;
    builder
        .set_not_before(&not_before)
        .map_err(signing("set not_before"))?;
    let not_after =
        Asn1Time::from_unix(not_after.timestamp()).map_err(signing("create not_after"))?;
    builder
        .set_not_after(&not_after)
        .map_err(signing("set not_after"))?;

    builder
        .append_extension(basic_constraints(request.is_ca)?)
        .map_err(signing("add BasicConstraints"))?;
    builder
        .append_extension(key_usage(request.is_ca)?)
        .map_err(signing("add KeyUsage"))?;

    match issuer {
        Issuer::SelfSigned => {
            let issuer_name = request.issuer.to_x509_name()?;
            builder
                .set_issuer_name(&issuer_name)
                .map_err(signing("set issuer"))?;
        }
        Issuer::Parent(parent) => {
            builder
                .set_issuer_name(parent.certificate.subject_name())
                .map_err(signing("set issuer from parent certificate"))?;
        }
    }

    let serial = BigNum::from_slice(&request.serial.to_be_bytes())
        .and_then(|bn| bn.to_asn1_integer())
        .map_err(signing("encode serial number"))?;
    builder
        .set_serial_number(&serial)
        .map_err(signing("set serial number"))?;

    if !request.is_ca {
        let eku = ExtendedKeyUsage::new()
            .client_auth()
            .server_auth()
            .build()
            .map_err(signing("build ExtendedKeyUsage"))?;
        builder
            .append_extension(eku)
            .map_err(signing("add ExtendedKeyUsage"))?;

        if !request.dns_names.is_empty() || !request.ip_addresses.is_empty() {
            let mut san = SubjectAlternativeName::new();
            for dns in &request.dns_names {
                san.dns(dns);
            }
            for ip in &request.ip_addresses {
                san.ip(&ip.to_string());
            }
            let san = san
                .build(&builder.x509v3_context(None, None))
                .map_err(signing("build SubjectAlternativeName"))?;
            builder
                .append_extension(san)
                .map_err(signing("add SubjectAlternativeName"))?;
        }
    }

    debug!(alias = %request.alias, bits = request.key_size_bits, "generating RSA keypair");
    let rsa = Rsa::generate(request.key_size_bits).map_err(signing("generate RSA keypair"))?;
    let private_key = PKey::from_rsa(rsa).map_err(signing("create private key"))?;
    builder
        .set_pubkey(&private_key)
        .map_err(signing("set public key"))?;

    if request.is_ca {
        let ski = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(None, None))
            .map_err(signing("build SubjectKeyIdentifier"))?;
        builder
            .append_extension(ski)
            .map_err(signing("add SubjectKeyIdentifier"))?;
    }

    let signing_key: &PKey<Private> = match issuer {
        Issuer::SelfSigned => &private_key,
        Issuer::Parent(parent) => {
            if parent.certificate.subject_key_id().is_some() {
                let aki = AuthorityKeyIdentifier::new()
                    .keyid(false)
                    .build(&builder.x509v3_context(Some(&*parent.certificate), None))
                    .map_err(signing("build AuthorityKeyIdentifier"))?;
                builder
                    .append_extension(aki)
                    .map_err(signing("add AuthorityKeyIdentifier"))?;
            }
            &parent.private_key
        }
    };

    builder
        .sign(signing_key, MessageDigest::sha256())
        .map_err(signing("sign certificate"))?;
    let certificate = builder.build();

    let certificate_der = certificate
        .to_der()
        .map_err(signing("encode certificate"))?;
    let private_key_der = private_key
        .rsa()
        .and_then(|rsa| rsa.private_key_to_der())
        .map_err(signing("encode private key"))?;

    Ok(IssuedPair {
        certificate,
        certificate_der,
        private_key_der,
    })
}
