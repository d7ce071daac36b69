//! Request descriptor validation.
//!
//! Each issue operation runs an ordered chain of [`Rule`]s before any file is
//! touched or any key is generated. The first failing rule wins.

use crate::cert_data::CertData;
use crate::error::MissingField;

/// Minimum validity accepted by every issue operation.
pub const MIN_VALID_YEARS: u32 = 1;

/// One check over a [`CertData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    RequireAlias,
    RequireSubject,
    RequireParentAlias,
    ValidAtLeastYears(u32),
}

impl Rule {
    pub fn check(self, data: &CertData) -> Result<(), MissingField> {
        match self {
            Rule::RequireAlias if data.alias.is_empty() => Err(MissingField::Alias),
            Rule::RequireSubject if data.subject.is_empty() => Err(MissingField::Subject),
            Rule::RequireParentAlias if data.parent_alias.is_empty() => {
                Err(MissingField::ParentAlias)
            }
            Rule::ValidAtLeastYears(minimum) if data.valid_years < minimum => {
                Err(MissingField::ValidYears {
                    actual: data.valid_years,
                    minimum,
                })
            }
            _ => Ok(()),
        }
    }
}

pub const ROOT_CA_RULES: &[Rule] = &[
    Rule::RequireSubject,
    Rule::RequireAlias,
    Rule::ValidAtLeastYears(MIN_VALID_YEARS),
];

pub const INTERMEDIATE_CA_RULES: &[Rule] = &[
    Rule::RequireSubject,
    Rule::RequireAlias,
    Rule::RequireParentAlias,
    Rule::ValidAtLeastYears(MIN_VALID_YEARS),
];

pub const LEAF_RULES: &[Rule] = &[
    Rule::RequireSubject,
    Rule::RequireAlias,
    Rule::RequireParentAlias,
    Rule::ValidAtLeastYears(MIN_VALID_YEARS),
];

/// Run `rules` in order and stop at the first failure.
pub fn check(data: &CertData, rules: &[Rule]) -> Result<(), MissingField> {
    rules.iter().try_for_each(|rule| rule.check(data))
}
