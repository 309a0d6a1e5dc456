use assert_matches::assert_matches;

use kegg_harvest::domain::{BriteId, OrgCode};
use kegg_harvest::error::KeggError;

#[test]
fn parse_brite_id_normalizes_case() {
    let id: BriteId = "BR:KO00001".parse().unwrap();
    assert_eq!(id.as_str(), "ko00001");
    assert_eq!(id.to_string(), "ko00001");
}

#[test]
fn virus_brite_is_not_orthology() {
    let id: BriteId = "br08620".parse().unwrap();
    assert!(!id.is_orthology());
    assert_eq!(id.qualified(), "br:br08620");
}

#[test]
fn parse_brite_id_rejects_non_ascii() {
    let err = "ko0000é".parse::<BriteId>().unwrap_err();
    assert_matches!(err, KeggError::InvalidBriteId(_));
    let err = "0100001".parse::<BriteId>().unwrap_err();
    assert_matches!(err, KeggError::InvalidBriteId(_));
}

#[test]
fn parse_org_code_limits() {
    assert!("t00007".parse::<OrgCode>().is_ok());
    assert_matches!(
        "toolongcode".parse::<OrgCode>(),
        Err(KeggError::InvalidOrgCode(_))
    );
    assert_matches!("Eco".parse::<OrgCode>(), Err(KeggError::InvalidOrgCode(_)));
}
