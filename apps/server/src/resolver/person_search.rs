//! Query strings for the backend person search API

use super::identity::person_key;
use crate::{Error, Result};
use arcadia_models::{ParamValue, SearchParameters};

/// Clause appended when no free-text `query=` was produced.
const MATCH_ALL: &str = "query=*";

/// Builds `/search/person?<query string>` from Patient search parameters.
///
/// Clauses are emitted in a fixed order (name, family, birthdate, `_id`,
/// identifier, gender) and joined with `&`. Values are percent-encoded.
pub fn build_query_string(params: &SearchParameters) -> Result<String> {
    let mut clauses: Vec<String> = Vec::new();
    let mut has_query = false;

    if let Some(name) = params.get("name") {
        let terms: Vec<String> = name
            .values()
            .map(|v| format!("givenName:{0} OR familyName:{0}", v.value()))
            .collect();
        clauses.push(clause("query", &terms.join(" OR ")));
        has_query = true;
    }

    if let Some(family) = params.first_value("family") {
        clauses.push(clause("query", &format!("familyName:{}", family.value())));
        has_query = true;
    }

    if let Some(birthdate) = params.first_value("birthdate") {
        clauses.push(clause("birthDate", birthdate.value()));
    }

    if let Some(id) = params.first_value("_id") {
        clauses.push(clause("id", &person_key(id.value())));
    }

    if let Some(identifier) = params.get("identifier") {
        for value in identifier.values() {
            clauses.push(identifier_clause(value)?);
        }
    }

    if let Some(gender) = params.first_value("gender") {
        let sex = match gender.value() {
            "male" => "m",
            "female" => "f",
            other => {
                return Err(Error::InvalidParameter(format!(
                    "Unknown gender type '{other}'"
                )))
            }
        };
        clauses.push(clause("sex", sex));
    }

    if !has_query {
        clauses.push(MATCH_ALL.to_string());
    }

    Ok(clauses.join("&"))
}

/// `MR|v` searches by medical record number, `MC|v` by Medicare id.
fn identifier_clause(value: &ParamValue) -> Result<String> {
    let ParamValue::Token { system, code } = value else {
        return Err(Error::InvalidParameter(
            "identifier must be a token".to_string(),
        ));
    };

    match system.as_deref() {
        Some("MR") => Ok(clause("mrn", code)),
        Some("MC") => Ok(clause("medicareId", code)),
        Some(other) => Err(Error::InvalidParameter(format!(
            "Unknown identifier type '{other}'"
        ))),
        None => Err(Error::InvalidParameter(
            "identifier requires a type, e.g. MR|12345".to_string(),
        )),
    }
}

fn clause(key: &str, value: &str) -> String {
    format!("{key}={}", urlencoding::encode(value))
}
