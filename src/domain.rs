use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeggError;

/// A KEGG brite hierarchy id such as `ko00001` or `br08620`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BriteId(String);

impl BriteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The database-qualified form used by the `get` operation.
    pub fn qualified(&self) -> String {
        format!("br:{}", self.0)
    }

    /// KO hierarchies (`ko00001`, `ko01000`, ...) have `K\d{5}` leaves.
    pub fn is_orthology(&self) -> bool {
        self.0.starts_with("ko")
    }
}

impl fmt::Display for BriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BriteId {
    type Err = KeggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_lowercase();
        let normalized = lowered.strip_prefix("br:").unwrap_or(&lowered).to_string();
        if normalized.len() != 7 || !normalized.is_ascii() {
            return Err(KeggError::InvalidBriteId(value.to_string()));
        }
        let (letters, digits) = normalized.split_at(2);
        let is_valid = letters.chars().all(|ch| ch.is_ascii_lowercase())
            && digits.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(KeggError::InvalidBriteId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// A KEGG organism code (`eco`, `hsa`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgCode(String);

impl OrgCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrgCode {
    type Err = KeggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized.len() <= 8
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit());
        if !is_valid {
            return Err(KeggError::InvalidOrgCode(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Which sequence database the organism page links are collected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqDb {
    GenBank,
    RefSeq,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_brite_id_with_prefix() {
        let id: BriteId = "br:ko00001".parse().unwrap();
        assert_eq!(id.as_str(), "ko00001");
        assert_eq!(id.qualified(), "br:ko00001");
        assert!(id.is_orthology());
    }

    #[test]
    fn parse_brite_id_invalid() {
        let err = "ko001".parse::<BriteId>().unwrap_err();
        assert_matches!(err, KeggError::InvalidBriteId(_));
        let err = "".parse::<BriteId>().unwrap_err();
        assert_matches!(err, KeggError::InvalidBriteId(_));
    }

    #[test]
    fn parse_org_code() {
        let org: OrgCode = " eco ".parse().unwrap();
        assert_eq!(org.as_str(), "eco");
        assert_matches!("E coli".parse::<OrgCode>(), Err(KeggError::InvalidOrgCode(_)));
    }
}
