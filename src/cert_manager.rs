//! Certificate Manager
//!
//! The public entry point of the library. A [`CertManager`] is bound to one
//! storage directory and issues, loads, lists and deletes certificate pairs
//! in it by alias.
//!
//! # Issuance
//! Every issue operation follows the same sequence:
//! 1. run the operation's validation rules (no I/O before they pass)
//! 2. refuse an alias that already has a file
//! 3. force the `is_ca` / `self_signed` flags for the kind of certificate
//! 4. load the parent pair when chained
//! 5. generate and sign, then save certificate and key
//!
//! | Operation | `is_ca` | `self_signed` | Signed by |
//! |---|---|---|---|
//! | [`CertManager::issue_root_ca`] | true | true | its own key |
//! | [`CertManager::issue_intermediate_ca`] | true | false | parent |
//! | [`CertManager::issue_leaf`] | false | false | parent |

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cert_data::CertData;
use crate::error::{PkiError, Result};
use crate::pair_store::{CertificatePair, PairStore};
use crate::pki_generator::{generate, Issuer};
use crate::storage::AliasStorage;
use crate::validation::{self, Rule, INTERMEDIATE_CA_RULES, LEAF_RULES, ROOT_CA_RULES};

#[derive(Debug, Clone)]
pub struct CertManager {
    pairs: PairStore,
}

impl CertManager {
    /// Manager over `dir`. The directory is not checked or created.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            pairs: PairStore::new(AliasStorage::new(dir)),
        }
    }

    pub fn dir(&self) -> &Path {
        self.pairs.storage().dir()
    }

    /// Issue a self-signed root CA.
    pub fn issue_root_ca(&self, mut data: CertData) -> Result<()> {
        self.admit(&data, ROOT_CA_RULES)?;
        data.self_signed = true;
        data.is_ca = true;
        self.create(data)
    }

    /// Issue an intermediate CA signed by `data.parent_alias`.
    pub fn issue_intermediate_ca(&self, mut data: CertData) -> Result<()> {
        self.admit(&data, INTERMEDIATE_CA_RULES)?;
        data.self_signed = false;
        data.is_ca = true;
        self.create(data)
    }

    /// Issue an end-entity certificate signed by `data.parent_alias`.
    pub fn issue_leaf(&self, mut data: CertData) -> Result<()> {
        self.admit(&data, LEAF_RULES)?;
        data.self_signed = false;
        data.is_ca = false;
        self.create(data)
    }

    /// Every alias with at least one file in the directory.
    pub fn list_aliases(&self) -> Result<BTreeSet<String>> {
        self.pairs.storage().list_aliases()
    }

    /// Remove both files of an alias; absent files are not an error.
    pub fn delete_alias(&self, alias: &str) -> Result<()> {
        self.pairs.storage().delete(alias)
    }

    pub fn get_pair(&self, alias: &str) -> Result<CertificatePair> {
        self.pairs.load(alias)
    }

    fn admit(&self, data: &CertData, rules: &[Rule]) -> Result<()> {
        validation::check(data, rules)?;
        if self.pairs.storage().alias_taken(&data.alias)? {
            return Err(PkiError::AliasExists {
                alias: data.alias.clone(),
                dir: self.dir().to_path_buf(),
            });
        }
        Ok(())
    }

    fn create(&self, data: CertData) -> Result<()> {
        let issued = if data.self_signed {
            generate(&data, Issuer::SelfSigned)?
        } else {
            debug!(alias = %data.alias, parent = %data.parent_alias, "loading parent pair");
            let parent = self.pairs.load(&data.parent_alias)?;
            generate(&data, Issuer::Parent(&parent))?
        };

        self.pairs
            .save(&issued.certificate_der, &issued.private_key_der, &data.alias)?;
        info!(
            alias = %data.alias,
            subject = %data.subject,
            parent = %data.parent_alias,
            is_ca = data.is_ca,
            serial = data.serial,
            "certificate issued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::cert_data::DistinguishedName;
    use crate::certificate_details::CertificateDetails;
    use crate::error::MissingField;
    use crate::storage::FileKind;

    const TEST_KEY_BITS: u32 = 2048;

    fn request(alias: &str, parent: &str, cn: &str) -> CertData {
        let subject = DistinguishedName::with_common_name(cn);
        CertData {
            alias: alias.to_string(),
            parent_alias: parent.to_string(),
            issuer: subject.clone(),
            subject,
            key_size_bits: TEST_KEY_BITS,
            valid_years: 1,
            ..Default::default()
        }
    }

    fn dir_entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn root_ca_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());
        let data = CertData {
            serial: 7,
            ..request("root", "", "Test Root")
        };
        manager.issue_root_ca(data).unwrap();

        let pair = manager.get_pair("root").unwrap();
        assert!(pair.certificate.verify(&pair.private_key).unwrap());
        assert!(pair
            .certificate
            .public_key()
            .unwrap()
            .public_eq(&pair.private_key));

        let details = CertificateDetails::inspect(&pair).unwrap();
        assert_eq!(details.subject, "CN=Test Root");
        assert_eq!(details.subject, details.issuer);
        assert!(details.is_ca);
        assert_eq!(details.serial, "7");
        assert_eq!(details.key_size_bits, TEST_KEY_BITS);
    }

    #[test]
    fn chain_issuer_names_match_parent_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());
        manager
            .issue_root_ca(request("root", "", "Test Root"))
            .unwrap();
        manager
            .issue_intermediate_ca(request("im", "root", "Test Intermediate"))
            .unwrap();

        let root = manager.get_pair("root").unwrap();
        let im = manager.get_pair("im").unwrap();
        assert!(im.certificate.verify(&root.private_key).unwrap());

        let root_details = CertificateDetails::inspect(&root).unwrap();
        let im_details = CertificateDetails::inspect(&im).unwrap();
        assert_eq!(im_details.issuer, root_details.subject);
        assert!(im_details.is_ca);
    }

    #[test]
    fn caller_flags_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());
        let root = CertData {
            is_ca: false,
            self_signed: false,
            ..request("root", "", "Test Root")
        };
        manager.issue_root_ca(root).unwrap();

        let leaf = CertData {
            is_ca: true,
            self_signed: true,
            ..request("leaf", "root", "leaf.example.com")
        };
        manager.issue_leaf(leaf).unwrap();

        let root = CertificateDetails::inspect(&manager.get_pair("root").unwrap()).unwrap();
        let leaf = CertificateDetails::inspect(&manager.get_pair("leaf").unwrap()).unwrap();
        assert!(root.is_ca);
        assert!(!leaf.is_ca);
        assert_eq!(leaf.issuer, "CN=Test Root");
    }

    #[test]
    fn key_usage_policy() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());
        manager
            .issue_root_ca(request("root", "", "Test Root"))
            .unwrap();
        manager
            .issue_leaf(request("leaf", "root", "leaf.example.com"))
            .unwrap();

        let root = CertificateDetails::inspect(&manager.get_pair("root").unwrap()).unwrap();
        assert_eq!(root.key_usage, vec!["Certificate Sign", "CRL Sign"]);
        assert!(root.ext_key_usage.is_empty());

        let leaf = CertificateDetails::inspect(&manager.get_pair("leaf").unwrap()).unwrap();
        assert_eq!(leaf.key_usage, vec!["Digital Signature", "Data Encipherment"]);
        assert_eq!(leaf.ext_key_usage, vec!["Server Auth", "Client Auth"]);
    }

    #[test]
    fn validation_fails_before_touching_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());

        let err = manager.issue_root_ca(request("", "", "No Alias")).unwrap_err();
        assert!(matches!(err, PkiError::MissingField(MissingField::Alias)));

        let err = manager
            .issue_leaf(request("", "root", "leaf.example.com"))
            .unwrap_err();
        assert!(matches!(err, PkiError::MissingField(MissingField::Alias)));

        let err = manager
            .issue_leaf(request("leaf", "", "leaf.example.com"))
            .unwrap_err();
        assert!(matches!(err, PkiError::MissingField(MissingField::ParentAlias)));

        let err = manager
            .issue_intermediate_ca(CertData {
                valid_years: 0,
                ..request("im", "root", "Test Intermediate")
            })
            .unwrap_err();
        assert!(matches!(
            err,
            PkiError::MissingField(MissingField::ValidYears {
                actual: 0,
                minimum: 1
            })
        ));

        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[test]
    fn validation_runs_before_directory_access() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path().join("absent"));
        let err = manager
            .issue_root_ca(CertData {
                subject: DistinguishedName::default(),
                ..request("root", "", "")
            })
            .unwrap_err();
        assert!(matches!(err, PkiError::MissingField(MissingField::Subject)));
    }

    #[test]
    fn missing_parent_is_not_found_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());
        let err = manager
            .issue_leaf(request("leaf", "ghost", "leaf.example.com"))
            .unwrap_err();
        match err {
            PkiError::NotFound { alias, kind, .. } => {
                assert_eq!(alias, "ghost");
                assert_eq!(kind, FileKind::Certificate);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[test]
    fn existing_alias_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());
        manager
            .issue_root_ca(request("root", "", "Test Root"))
            .unwrap();
        let before = fs::read(dir.path().join("root.pem")).unwrap();

        let err = manager
            .issue_root_ca(request("root", "", "Another Root"))
            .unwrap_err();
        assert!(matches!(err, PkiError::AliasExists { ref alias, .. } if alias == "root"));
        assert_eq!(fs::read(dir.path().join("root.pem")).unwrap(), before);
    }

    #[test]
    fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());
        manager
            .issue_root_ca(request("a", "", "A"))
            .unwrap();
        manager
            .issue_leaf(request("b", "a", "b.example.com"))
            .unwrap();
        manager
            .issue_leaf(request("c", "a", "c.example.com"))
            .unwrap();

        let aliases: Vec<_> = manager.list_aliases().unwrap().into_iter().collect();
        assert_eq!(aliases, vec!["a", "b", "c"]);

        manager.delete_alias("b").unwrap();
        manager.delete_alias("b").unwrap();
        let aliases: Vec<_> = manager.list_aliases().unwrap().into_iter().collect();
        assert_eq!(aliases, vec!["a", "c"]);
        assert!(matches!(
            manager.get_pair("b"),
            Err(PkiError::NotFound { .. })
        ));
    }

    #[test]
    fn deleted_alias_can_be_issued_again() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CertManager::new(dir.path());
        manager
            .issue_root_ca(request("root", "", "First"))
            .unwrap();
        manager.delete_alias("root").unwrap();
        manager
            .issue_root_ca(request("root", "", "Second"))
            .unwrap();

        let details = CertificateDetails::inspect(&manager.get_pair("root").unwrap()).unwrap();
        assert_eq!(details.subject, "CN=Second");
    }
}
