//! Read-only view of a stored pair, used for `show` and `list`.
//!
//! Extensions are decoded with `x509-parser`, which exposes key usage, extended
//! key usage and basic constraints directly. The label tables are plain
//! constant data.

use std::net::IpAddr;

use serde::Serialize;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{ExtendedKeyUsage, GeneralName, KeyUsage};
use x509_parser::prelude::FromDer;

use crate::error::{PkiError, Result};
use crate::pair_store::CertificatePair;

/// Key usage bits, in RFC 5280 bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsageBit {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    CertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl KeyUsageBit {
    pub const ALL: [KeyUsageBit; 9] = [
        KeyUsageBit::DigitalSignature,
        KeyUsageBit::NonRepudiation,
        KeyUsageBit::KeyEncipherment,
        KeyUsageBit::DataEncipherment,
        KeyUsageBit::KeyAgreement,
        KeyUsageBit::CertSign,
        KeyUsageBit::CrlSign,
        KeyUsageBit::EncipherOnly,
        KeyUsageBit::DecipherOnly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            KeyUsageBit::DigitalSignature => "Digital Signature",
            KeyUsageBit::NonRepudiation => "Non Repudiation",
            KeyUsageBit::KeyEncipherment => "Key Encipherment",
            KeyUsageBit::DataEncipherment => "Data Encipherment",
            KeyUsageBit::KeyAgreement => "Key Agreement",
            KeyUsageBit::CertSign => "Certificate Sign",
            KeyUsageBit::CrlSign => "CRL Sign",
            KeyUsageBit::EncipherOnly => "Encipher Only",
            KeyUsageBit::DecipherOnly => "Decipher Only",
        }
    }

    fn is_set(self, ku: &KeyUsage) -> bool {
        match self {
            KeyUsageBit::DigitalSignature => ku.digital_signature(),
            KeyUsageBit::NonRepudiation => ku.non_repudiation(),
            KeyUsageBit::KeyEncipherment => ku.key_encipherment(),
            KeyUsageBit::DataEncipherment => ku.data_encipherment(),
            KeyUsageBit::KeyAgreement => ku.key_agreement(),
            KeyUsageBit::CertSign => ku.key_cert_sign(),
            KeyUsageBit::CrlSign => ku.crl_sign(),
            KeyUsageBit::EncipherOnly => ku.encipher_only(),
            KeyUsageBit::DecipherOnly => ku.decipher_only(),
        }
    }
}

/// Extended key usage purposes that get a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtKeyUsagePurpose {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl ExtKeyUsagePurpose {
    pub const ALL: [ExtKeyUsagePurpose; 7] = [
        ExtKeyUsagePurpose::Any,
        ExtKeyUsagePurpose::ServerAuth,
        ExtKeyUsagePurpose::ClientAuth,
        ExtKeyUsagePurpose::CodeSigning,
        ExtKeyUsagePurpose::EmailProtection,
        ExtKeyUsagePurpose::TimeStamping,
        ExtKeyUsagePurpose::OcspSigning,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExtKeyUsagePurpose::Any => "Any",
            ExtKeyUsagePurpose::ServerAuth => "Server Auth",
            ExtKeyUsagePurpose::ClientAuth => "Client Auth",
            ExtKeyUsagePurpose::CodeSigning => "Code Signing",
            ExtKeyUsagePurpose::EmailProtection => "Email Protection",
            ExtKeyUsagePurpose::TimeStamping => "Time Stamping",
            ExtKeyUsagePurpose::OcspSigning => "OCSP Signing",
        }
    }

    fn is_set(self, eku: &ExtendedKeyUsage) -> bool {
        match self {
            ExtKeyUsagePurpose::Any => eku.any,
            ExtKeyUsagePurpose::ServerAuth => eku.server_auth,
            ExtKeyUsagePurpose::ClientAuth => eku.client_auth,
            ExtKeyUsagePurpose::CodeSigning => eku.code_signing,
            ExtKeyUsagePurpose::EmailProtection => eku.email_protection,
            ExtKeyUsagePurpose::TimeStamping => eku.time_stamping,
            ExtKeyUsagePurpose::OcspSigning => eku.ocsp_signing,
        }
    }
}

/// Displayable properties of one certificate/key pair.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateDetails {
    pub subject: String,
    pub issuer: String,
    pub not_before: String,
    pub not_after: String,
    pub is_ca: bool,
    pub basic_constraints_valid: bool,
    pub serial: String,
    pub public_exponent: String,
    pub key_size_bits: u32,
    pub key_usage: Vec<&'static str>,
    pub ext_key_usage: Vec<&'static str>,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl CertificateDetails {
    pub fn inspect(pair: &CertificatePair) -> Result<Self> {
        let der = pair
            .certificate
            .to_der()
            .map_err(|e| PkiError::Inspect(e.to_string()))?;
        let (_, cert) =
            X509Certificate::from_der(&der).map_err(|e| PkiError::Inspect(e.to_string()))?;

        let basic_constraints = cert
            .basic_constraints()
            .map_err(|e| PkiError::Inspect(e.to_string()))?
            .map(|ext| ext.value.ca);

        let key_usage = match cert
            .key_usage()
            .map_err(|e| PkiError::Inspect(e.to_string()))?
        {
            Some(ku) => KeyUsageBit::ALL
                .into_iter()
                .filter(|bit| bit.is_set(ku.value))
                .map(KeyUsageBit::label)
                .collect(),
            None => Vec::new(),
        };

        let ext_key_usage = match cert
            .extended_key_usage()
            .map_err(|e| PkiError::Inspect(e.to_string()))?
        {
            Some(eku) => ExtKeyUsagePurpose::ALL
                .into_iter()
                .filter(|purpose| purpose.is_set(eku.value))
                .map(ExtKeyUsagePurpose::label)
                .collect(),
            None => Vec::new(),
        };

        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();
        if let Some(san) = cert
            .subject_alternative_name()
            .map_err(|e| PkiError::Inspect(e.to_string()))?
        {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                    GeneralName::IPAddress(bytes) => {
                        if let Some(ip) = ip_from_bytes(bytes) {
                            ip_addresses.push(ip);
                        }
                    }
                    _ => {}
                }
            }
        }

        let rsa = pair
            .private_key
            .rsa()
            .map_err(|e| PkiError::Inspect(e.to_string()))?;
        let public_exponent = rsa
            .e()
            .to_dec_str()
            .map_err(|e| PkiError::Inspect(e.to_string()))?
            .to_string();

        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_before: cert.validity().not_before.to_string(),
            not_after: cert.validity().not_after.to_string(),
            is_ca: basic_constraints.unwrap_or(false),
            basic_constraints_valid: basic_constraints.is_some(),
            serial: cert.tbs_certificate.serial.to_string(),
            public_exponent,
            key_size_bits: pair.private_key.bits(),
            key_usage,
            ext_key_usage,
            dns_names,
            ip_addresses,
        })
    }

    /// Property name/value rows, sorted by property name.
    pub fn properties(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Subject", self.subject.clone()),
            ("Issuer", self.issuer.clone()),
            ("Valid from", self.not_before.clone()),
            ("Valid to", self.not_after.clone()),
            ("Is CA?", self.is_ca.to_string()),
            (
                "Basic constraints valid?",
                self.basic_constraints_valid.to_string(),
            ),
            ("Serial", self.serial.clone()),
            ("Public exponent", self.public_exponent.clone()),
            ("Key size", self.key_size_bits.to_string()),
            ("Key usage", self.key_usage.join(",")),
            ("Ext. key usage", self.ext_key_usage.join(",")),
            ("DNS names", self.dns_names.join(",")),
            (
                "IP addresses",
                self.ip_addresses
                    .iter()
                    .map(IpAddr::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        ];
        rows.sort_by_key(|(name, _)| *name);
        rows
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}
