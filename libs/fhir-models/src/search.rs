//! Typed FHIR search parameters
//!
//! Inbound `name=value` pairs are grouped per parameter. Every occurrence of a
//! parameter is one AND clause; comma separated values inside an occurrence are
//! its OR alternatives. Values are typed by parameter name, following the search
//! parameter registry of the exposed resource types.

use super::error::{Error, Result};
use serde::Serialize;

pub const INCLUDE: &str = "_include";
pub const REVINCLUDE: &str = "_revinclude";

/// Value type of a search parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Reference,
    Token,
    Date,
    String,
}

impl ParamKind {
    pub fn for_name(name: &str) -> Self {
        match name {
            "patient" | "subject" | "organization" | "general-practitioner" | "link"
            | "encounter" | "performer" | "requester" => ParamKind::Reference,
            "_id" | "identifier" | "gender" | "code" | "category" | "status"
            | "clinical-status" | "telecom" | "phone" | "email" | "language" | "active"
            | "deceased" | "address-use" | "type" | "vaccine-code" => ParamKind::Token,
            "birthdate" | "death-date" | "date" | "onset-date" | "recorded-date" | "authored"
            | "period" => ParamKind::Date,
            _ => ParamKind::String,
        }
    }
}

/// Comparison prefix of a date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrefix {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Sa,
    Eb,
    Ap,
}

impl DatePrefix {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "eq" => DatePrefix::Eq,
            "ne" => DatePrefix::Ne,
            "gt" => DatePrefix::Gt,
            "lt" => DatePrefix::Lt,
            "ge" => DatePrefix::Ge,
            "le" => DatePrefix::Le,
            "sa" => DatePrefix::Sa,
            "eb" => DatePrefix::Eb,
            "ap" => DatePrefix::Ap,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParamValue {
    Reference {
        resource_type: Option<String>,
        id: String,
    },
    Token {
        system: Option<String>,
        code: String,
    },
    Date {
        prefix: DatePrefix,
        value: String,
    },
    String {
        value: String,
    },
}

impl ParamValue {
    pub fn parse(kind: ParamKind, raw: &str) -> Result<Self> {
        match kind {
            ParamKind::Reference => Ok(parse_reference(raw)),
            ParamKind::Token => Ok(match raw.split_once('|') {
                Some((system, code)) => ParamValue::Token {
                    system: Some(system.to_string()),
                    code: code.to_string(),
                },
                None => ParamValue::Token {
                    system: None,
                    code: raw.to_string(),
                },
            }),
            ParamKind::Date => parse_date(raw),
            ParamKind::String => Ok(ParamValue::String {
                value: raw.to_string(),
            }),
        }
    }

    /// The textual value a backend query would use: the id of a reference,
    /// the code of a token, the date or the string itself.
    pub fn value(&self) -> &str {
        match self {
            ParamValue::Reference { id, .. } => id,
            ParamValue::Token { code, .. } => code,
            ParamValue::Date { value, .. } => value,
            ParamValue::String { value } => value,
        }
    }
}

fn parse_reference(raw: &str) -> ParamValue {
    let trimmed = raw.trim_end_matches('/');
    let segments: Vec<&str> = trimmed.rsplitn(3, '/').collect();
    match segments.as_slice() {
        [id, resource_type, ..]
            if resource_type
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_uppercase()) =>
        {
            ParamValue::Reference {
                resource_type: Some(resource_type.to_string()),
                id: id.to_string(),
            }
        }
        _ => ParamValue::Reference {
            resource_type: None,
            id: trimmed.to_string(),
        },
    }
}

fn parse_date(raw: &str) -> Result<ParamValue> {
    let (prefix, value) = match raw.get(..2).and_then(DatePrefix::parse) {
        Some(prefix) => (prefix, &raw[2..]),
        None => (DatePrefix::Eq, raw),
    };
    if !value.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::InvalidFieldValue(format!(
            "'{raw}' is not a valid date"
        )));
    }
    Ok(ParamValue::Date {
        prefix,
        value: value.to_string(),
    })
}

/// One named search parameter with its AND-of-OR values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchParameter {
    pub name: String,
    pub modifier: Option<String>,
    pub kind: ParamKind,
    pub and: Vec<Vec<ParamValue>>,
}

impl SearchParameter {
    /// All values in declaration order, ignoring the AND/OR structure.
    pub fn values(&self) -> impl Iterator<Item = &ParamValue> {
        self.and.iter().flatten()
    }
}

/// Parsed search request, immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchParameters {
    params: Vec<SearchParameter>,
    includes: Vec<String>,
    rev_includes: Vec<String>,
}

impl SearchParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from decoded query/form pairs, preserving order.
    pub fn from_items(items: &[(String, String)]) -> Result<Self> {
        let mut params = Self::new();
        for (name, value) in items {
            params.push(name, value)?;
        }
        Ok(params)
    }

    /// Adds one `name=value` occurrence.
    pub fn with(mut self, name: &str, value: &str) -> Result<Self> {
        self.push(name, value)?;
        Ok(self)
    }

    fn push(&mut self, raw_name: &str, raw_value: &str) -> Result<()> {
        let (name, modifier) = match raw_name.split_once(':') {
            Some((name, modifier)) => (name, Some(modifier.to_string())),
            None => (raw_name, None),
        };

        if name == INCLUDE || name == REVINCLUDE {
            let target = if name == INCLUDE {
                &mut self.includes
            } else {
                &mut self.rev_includes
            };
            if !raw_value.is_empty() && !target.iter().any(|v| v == raw_value) {
                target.push(raw_value.to_string());
            }
            return Ok(());
        }

        // Result controls (_count, _format, ...) are not criteria.
        if name.starts_with('_') && name != "_id" {
            return Ok(());
        }
        if raw_value.is_empty() {
            return Ok(());
        }

        let kind = ParamKind::for_name(name);
        let alternatives = raw_value
            .split(',')
            .filter(|v| !v.is_empty())
            .map(|v| ParamValue::parse(kind, v))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::InvalidParameter {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        match self
            .params
            .iter_mut()
            .find(|p| p.name == name && p.modifier == modifier)
        {
            Some(existing) => existing.and.push(alternatives),
            None => self.params.push(SearchParameter {
                name: name.to_string(),
                modifier,
                kind,
                and: vec![alternatives],
            }),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SearchParameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn first_value(&self, name: &str) -> Option<&ParamValue> {
        self.get(name).and_then(|p| p.values().next())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchParameter> {
        self.params.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn rev_includes(&self) -> &[String] {
        &self.rev_includes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value([ParamKind::Reference, ParamKind::String]).unwrap(),
            serde_json::json!(["reference", "string"])
        );
    }

    fn items(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn repeated_parameters_become_and_clauses() {
        let params = SearchParameters::from_items(&items(&[
            ("name", "smith,jones"),
            ("name", "anna"),
        ]))
        .unwrap();

        let name = params.get("name").unwrap();
        assert_eq!(name.kind, ParamKind::String);
        assert_eq!(name.and.len(), 2);
        assert_eq!(name.and[0].len(), 2);
        assert_eq!(
            name.values().map(|v| v.value()).collect::<Vec<_>>(),
            vec!["smith", "jones", "anna"]
        );
    }

    #[test]
    fn references_accept_relative_and_absolute_forms() {
        let params = SearchParameters::from_items(&items(&[
            ("patient", "Patient/123"),
            ("subject", "http://example.org/fhir/Patient/456"),
            ("organization", "789"),
        ]))
        .unwrap();

        assert_eq!(
            params.first_value("patient"),
            Some(&ParamValue::Reference {
                resource_type: Some("Patient".to_string()),
                id: "123".to_string()
            })
        );
        assert_eq!(params.first_value("subject").unwrap().value(), "456");
        assert_eq!(
            params.first_value("organization"),
            Some(&ParamValue::Reference {
                resource_type: None,
                id: "789".to_string()
            })
        );
    }

    #[test]
    fn tokens_split_on_first_pipe() {
        let params =
            SearchParameters::from_items(&items(&[("identifier", "MR|12345|x")])).unwrap();
        assert_eq!(
            params.first_value("identifier"),
            Some(&ParamValue::Token {
                system: Some("MR".to_string()),
                code: "12345|x".to_string()
            })
        );
    }

    #[test]
    fn dates_keep_prefix() {
        let params = SearchParameters::from_items(&items(&[
            ("birthdate", "ge1970-01-01"),
            ("birthdate", "lt1980-01-01"),
        ]))
        .unwrap();
        let birthdate = params.get("birthdate").unwrap();
        assert_eq!(birthdate.and.len(), 2);
        assert_eq!(
            birthdate.and[0][0],
            ParamValue::Date {
                prefix: DatePrefix::Ge,
                value: "1970-01-01".to_string()
            }
        );

        let err = SearchParameters::from_items(&items(&[("birthdate", "yesterday")]));
        assert!(matches!(err, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn includes_are_collected_and_controls_ignored() {
        let params = SearchParameters::from_items(&items(&[
            ("_revinclude", "Provenance:target"),
            ("_revinclude", "Provenance:target"),
            ("_include", "Observation:patient"),
            ("_count", "10"),
            ("_id", "abc"),
        ]))
        .unwrap();

        assert_eq!(params.rev_includes(), &["Provenance:target".to_string()]);
        assert_eq!(params.includes(), &["Observation:patient".to_string()]);
        assert!(!params.contains("_count"));
        assert_eq!(params.first_value("_id").unwrap().value(), "abc");
    }

    #[test]
    fn modifiers_are_kept() {
        let params = SearchParameters::new().with("family:exact", "Smith").unwrap();
        let family = params.get("family").unwrap();
        assert_eq!(family.modifier.as_deref(), Some("exact"));
    }
}
