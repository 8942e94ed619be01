//! Label-selector matching over workload attributes.
//!
//! A selector is the conjunction of its `matchLabels` equalities and its
//! `matchExpressions`. The empty selector matches every workload.

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crossgate_core::error::{CrossgateError, Result};

use super::attrs::{Map, WorkloadAttrs};

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Expression {
    pub key: String,
    pub operator: Operator,
    #[serde(default)]
    pub values: BTreeSet<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// Selects a set of workloads by attribute.
#[derive(Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_labels: Option<Map>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_expressions: Option<Vec<Expression>>,
}

// === Selector ===

impl Selector {
    pub fn from_expressions(exprs: Vec<Expression>) -> Self {
        Self {
            match_labels: None,
            match_expressions: Some(exprs),
        }
    }

    pub fn from_map(map: Map) -> Self {
        Self {
            match_labels: Some(map),
            match_expressions: None,
        }
    }

    pub fn matches(&self, attrs: &WorkloadAttrs) -> bool {
        let attrs = attrs.as_ref();

        if let Some(labels) = self.match_labels.as_ref() {
            if labels.iter().any(|(k, v)| attrs.get(k) != Some(v)) {
                return false;
            }
        }

        self.match_expressions
            .iter()
            .flatten()
            .all(|expr| expr.matches(attrs))
    }

    /// Reject selectors that could never be stored by a label-selector API.
    pub fn validate(&self) -> Result<()> {
        for (k, v) in self.match_labels.iter().flatten() {
            validate_key(k)?;
            validate_value(v)?;
        }
        for expr in self.match_expressions.iter().flatten() {
            expr.validate()?;
        }
        Ok(())
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<'a> std::iter::FromIterator<(&'a str, &'a str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl std::iter::FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self::from_expressions(iter.into_iter().collect())
    }
}

// === Expression ===

impl Expression {
    pub fn new<I, S>(key: impl Into<String>, operator: Operator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, attrs: &Map) -> bool {
        let value = attrs.get(&self.key);
        match self.operator {
            Operator::In => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotIn => value.map_or(true, |v| !self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }

    fn validate(&self) -> Result<()> {
        validate_key(&self.key)?;
        match self.operator {
            Operator::In | Operator::NotIn if self.values.is_empty() => {
                Err(CrossgateError::InvalidPolicy(format!(
                    "operator {:?} on key {} requires at least one value",
                    self.operator, self.key
                )))
            }
            Operator::Exists | Operator::DoesNotExist if !self.values.is_empty() => {
                Err(CrossgateError::InvalidPolicy(format!(
                    "operator {:?} on key {} takes no values",
                    self.operator, self.key
                )))
            }
            _ => self.values.iter().try_for_each(|v| validate_value(v)),
        }
    }
}

// === Syntax ===

fn validate_key(key: &str) -> Result<()> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        let ok = !prefix.is_empty()
            && prefix.len() <= MAX_PREFIX_LEN
            && prefix.split('.').all(is_dns_label);
        if !ok {
            return Err(CrossgateError::InvalidPolicy(format!(
                "invalid selector key prefix: {key}"
            )));
        }
    }

    if name.is_empty() || !is_name(name) {
        return Err(CrossgateError::InvalidPolicy(format!(
            "invalid selector key: {key:?}"
        )));
    }
    Ok(())
}

/// Label-value syntax, or an IP address so `client.ip` can name IPv6
/// clients.
fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() || is_name(value) || value.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    Err(CrossgateError::InvalidPolicy(format!(
        "invalid selector value: {value:?}"
    )))
}

/// Alphanumeric at both ends, `-_.` allowed inside, at most 63 bytes.
fn is_name(s: &str) -> bool {
    let b = s.as_bytes();
    !b.is_empty()
        && b.len() <= MAX_NAME_LEN
        && b[0].is_ascii_alphanumeric()
        && b[b.len() - 1].is_ascii_alphanumeric()
        && b
            .iter()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'.'))
}

fn is_dns_label(s: &str) -> bool {
    let b = s.as_bytes();
    !b.is_empty()
        && b.len() <= MAX_NAME_LEN
        && b[0].is_ascii_alphanumeric()
        && b[b.len() - 1].is_ascii_alphanumeric()
        && b
            .iter()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::iter::FromIterator;

    #[test]
    fn test_matches() {
        for (selector, attrs, matches, msg) in &[
            (Selector::default(), WorkloadAttrs::default(), true, "empty match"),
            (
                Selector::from_iter(Some(("peer.name", "a"))),
                WorkloadAttrs::from_iter(Some(("peer.name", "a"))),
                true,
                "exact label match",
            ),
            (
                Selector::from_iter(Some(("peer.name", "a"))),
                WorkloadAttrs::from_iter(vec![("peer.name", "a"), ("service.name", "db")]),
                true,
                "sufficient label match",
            ),
            (
                Selector::from_iter(vec![("peer.name", "a"), ("service.name", "web")]),
                WorkloadAttrs::from_iter(vec![("peer.name", "a"), ("service.name", "db")]),
                false,
                "one label differs",
            ),
            (
                Selector::from_iter(Some(Expression::new("peer.name", Operator::In, ["a", "b"]))),
                WorkloadAttrs::from_iter(Some(("peer.name", "b"))),
                true,
                "in match",
            ),
            (
                Selector::from_iter(Some(Expression::new("peer.name", Operator::In, ["a"]))),
                WorkloadAttrs::default(),
                false,
                "in requires the key",
            ),
            (
                Selector::from_iter(Some(Expression::new("peer.name", Operator::NotIn, ["a"]))),
                WorkloadAttrs::from_iter(Some(("peer.name", "a"))),
                false,
                "not-in excludes value",
            ),
            (
                Selector::from_iter(Some(Expression::new("peer.name", Operator::NotIn, ["a"]))),
                WorkloadAttrs::default(),
                true,
                "not-in matches missing key",
            ),
            (
                Selector::from_iter(Some(Expression::new(
                    "client.ip",
                    Operator::Exists,
                    Vec::<String>::new(),
                ))),
                WorkloadAttrs::from_iter(Some(("client.ip", "10.0.0.1"))),
                true,
                "exists",
            ),
            (
                Selector::from_iter(Some(Expression::new(
                    "client.ip",
                    Operator::DoesNotExist,
                    Vec::<String>::new(),
                ))),
                WorkloadAttrs::from_iter(Some(("client.ip", "10.0.0.1"))),
                false,
                "does-not-exist",
            ),
        ] {
            assert_eq!(selector.matches(attrs), *matches, "{}", msg);
        }
    }

    #[test]
    fn test_validate() {
        let ok = [
            Selector::default(),
            Selector::from_iter(Some(("example.com/peer.name", "site-a"))),
            Selector::from_iter(Some(("service.name", ""))),
            Selector::from_iter(Some(Expression::new("peer.name", Operator::In, ["a"]))),
            Selector::from_iter(Some(("client.ip", "fd00::1"))),
            Selector::from_iter(Some(Expression::new(
                "client.ip",
                Operator::In,
                ["10.0.0.1", "2001:db8::7"],
            ))),
        ];
        for s in &ok {
            assert!(s.validate().is_ok(), "{s:?}");
        }

        let bad = [
            Selector::from_iter(Some(("", "a"))),
            Selector::from_iter(Some(("-peer", "a"))),
            Selector::from_iter(Some(("Bad_Prefix/peer", "a"))),
            Selector::from_iter(Some(("peer.name", "has space"))),
            Selector::from_iter(Some(("client.ip", "fd00::1::2"))),
            Selector::from_iter(Some(Expression::new("peer.name", Operator::In, Vec::<String>::new()))),
            Selector::from_iter(Some(Expression::new("peer.name", Operator::Exists, ["a"]))),
        ];
        for s in &bad {
            assert!(s.validate().is_err(), "{s:?}");
        }
    }

    #[test]
    fn test_ipv6_client_match() {
        let s = Selector::from_iter(Some(("client.ip", "fd00::1")));
        assert!(s.validate().is_ok());
        assert!(s.matches(&WorkloadAttrs::from_iter(Some(("client.ip", "fd00::1")))));
        assert!(!s.matches(&WorkloadAttrs::from_iter(Some(("client.ip", "fd00::2")))));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let s: Selector = serde_json::from_str(
            r#"{"matchLabels":{"peer.name":"a"},"matchExpressions":[{"key":"service.name","operator":"NotIn","values":["db"]}]}"#,
        )
        .unwrap();
        assert!(s.matches(&WorkloadAttrs::from_iter(vec![("peer.name", "a"), ("service.name", "web")])));
        assert!(serde_json::from_str::<Selector>(r#"{"matchLabel":{}}"#).is_err());
    }
}
