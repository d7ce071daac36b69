//! Certificate request descriptor
//!
//! [`CertData`] is what a caller fills in before asking the
//! [`CertManager`](crate::cert_manager::CertManager) for a new certificate.
//! It lives for exactly one issue operation, which takes it by value.
//!
//! # Distinguished names
//! ```text
//! C=US, O=ACME, OU=Security, L=Seattle, ST=Washington, STREET=..., POSTALCODE=..., CN=ACME Root
//! ```
//! Every attribute except the common name may hold several values. Names are
//! written into certificates in the order above, and rendered as strings in
//! the reverse order (most specific first), e.g. `CN=ACME Root,O=ACME,C=US`.

use std::fmt;
use std::net::IpAddr;

use openssl::nid::Nid;
use openssl::x509::X509Name;
use serde::Serialize;

use crate::error::{signing, Result};

/// Structured X.509 distinguished name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistinguishedName {
    pub country: Vec<String>,
    pub organization: Vec<String>,
    pub organizational_unit: Vec<String>,
    pub locality: Vec<String>,
    pub province: Vec<String>,
    pub street_address: Vec<String>,
    pub postal_code: Vec<String>,
    pub common_name: String,
}

impl DistinguishedName {
    /// Name consisting of a single common name.
    pub fn with_common_name(cn: impl Into<String>) -> Self {
        Self {
            common_name: cn.into(),
            ..Self::default()
        }
    }

    /// True when the string form is empty. Empty attribute values are never
    /// written, so a name made only of empty values counts as empty.
    pub fn is_empty(&self) -> bool {
        self.attributes().next().is_none()
    }

    /// Attributes in certificate order: (nid, short label, value).
    fn attributes(&self) -> impl Iterator<Item = (Nid, &'static str, &str)> + '_ {
        let multi = [
            (Nid::COUNTRYNAME, "C", &self.country),
            (Nid::ORGANIZATIONNAME, "O", &self.organization),
            (Nid::ORGANIZATIONALUNITNAME, "OU", &self.organizational_unit),
            (Nid::LOCALITYNAME, "L", &self.locality),
            (Nid::STATEORPROVINCENAME, "ST", &self.province),
            (Nid::STREETADDRESS, "STREET", &self.street_address),
            (Nid::POSTALCODE, "POSTALCODE", &self.postal_code),
        ];
        multi
            .into_iter()
            .flat_map(|(nid, label, values)| {
                values.iter().map(move |value| (nid, label, value.as_str()))
            })
            .chain(std::iter::once((
                Nid::COMMONNAME,
                "CN",
                self.common_name.as_str(),
            )))
            .filter(|(_, _, value)| !value.is_empty())
    }

    /// Build the OpenSSL representation of this name.
    pub fn to_x509_name(&self) -> Result<X509Name> {
        let mut name_builder = X509Name::builder().map_err(signing("create name builder"))?;
        for (nid, _, value) in self.attributes() {
            name_builder
                .append_entry_by_nid(nid, value)
                .map_err(signing("append name entry"))?;
        }
        Ok(name_builder.build())
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes: Vec<_> = self.attributes().collect();
        for (i, (_, label, value)) in attributes.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", label, escape_value(value))?;
        }
        Ok(())
    }
}

// RFC 2253 section 2.4
fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && (c == ' ' || c == '#'))
            || (i == last && c == ' ');
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Certificate request descriptor.
///
/// `is_ca` and `self_signed` are overwritten by whichever issue operation
/// consumes the descriptor.
#[derive(Debug, Clone, Default)]
pub struct CertData {
    pub alias: String,
    /// Alias of the issuing certificate, empty for a root CA.
    pub parent_alias: String,
    pub subject: DistinguishedName,
    /// Only used for self-signed certificates.
    pub issuer: DistinguishedName,
    pub key_size_bits: u32,
    pub valid_years: u32,
    pub is_ca: bool,
    pub self_signed: bool,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    /// Zero means unset; the certificate then carries serial number 0.
    /// Unsigned, so a negative serial cannot be requested.
    pub serial: u64,
}
