//! pkitool - Local Certificate Authority Library
//!
//! Issues and manages a small X.509 hierarchy in one flat directory. Every
//! certificate is addressed by a short alias and stored as a PEM pair:
//!
//! ```text
//! <dir>/<alias>.pem   CERTIFICATE
//! <dir>/<alias>.key   RSA PRIVATE KEY (PKCS#1)
//! ```
//!
//! # Overview
//!
//! ```text
//! Root CA (self-signed, CA=true)
//!   └── Intermediate CA (signed by its parent, CA=true)
//!       └── Leaf certificate (signed by its parent, CA=false, serverAuth + clientAuth)
//! ```
//!
//! - 🔑 **RSA keys** of any size OpenSSL accepts, SHA-256 signatures
//! - 📅 **Calendar-year validity** starting at issuance time
//! - 🌐 **Subject alternative names** (DNS and IP) on leaf certificates
//! - 📁 **Plain files**: interoperable with `openssl x509` and friends
//!
//! # Example
//!
//! ```no_run
//! use pkitool::cert_data::{CertData, DistinguishedName};
//! use pkitool::cert_manager::CertManager;
//!
//! fn main() -> pkitool::Result<()> {
//!     let manager = CertManager::new("/var/lib/pki");
//!
//!     let root = DistinguishedName::with_common_name("Example Root CA");
//!     manager.issue_root_ca(CertData {
//!         alias: "root".to_string(),
//!         issuer: root.clone(),
//!         subject: root,
//!         key_size_bits: 4096,
//!         valid_years: 10,
//!         ..Default::default()
//!     })?;
//!
//!     manager.issue_leaf(CertData {
//!         alias: "web".to_string(),
//!         parent_alias: "root".to_string(),
//!         subject: DistinguishedName::with_common_name("www.example.com"),
//!         key_size_bits: 2048,
//!         valid_years: 1,
//!         dns_names: vec!["www.example.com".to_string()],
//!         ..Default::default()
//!     })?;
//!
//!     for alias in manager.list_aliases()? {
//!         println!("{}", alias);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`cert_manager`]: issue, load, list and delete pairs by alias
//! - [`cert_data`]: the request descriptor and distinguished names
//! - [`pki_generator`]: X.509 building and signing
//! - [`pair_store`] / [`storage`]: PEM pair persistence on disk
//! - [`validation`]: per-operation request checks
//! - [`certificate_details`] / [`render`]: inspection and output for the CLI
//! - [`configs`]: TOML configuration for the CLI

pub mod cert_data;
pub mod cert_manager;
pub mod certificate_details;
pub mod configs;
pub mod error;
pub mod pair_store;
pub mod pki_generator;
pub mod render;
pub mod storage;
pub mod validation;

pub use cert_data::{CertData, DistinguishedName};
pub use cert_manager::CertManager;
pub use error::{MissingField, PkiError, Result};
