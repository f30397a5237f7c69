// Copyright (c) 2025 - Cowboy AI, Inc.
//! Intrinsic Values
//!
//! Property values are plain JSON data mixed with references to other
//! resources. References stay symbolic until synthesis decides whether they
//! render as `Ref`/`Fn::GetAtt` or as `Fn::ImportValue` of another stack's
//! export.

use std::collections::BTreeMap;

use serde_json::json;

use crate::app::ResourceRef;
use crate::errors::SynthResult;

/// Pseudo parameters resolved by CloudFormation at deploy time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pseudo {
    AccountId,
    Region,
    Partition,
    StackName,
    UrlSuffix,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
            Self::Partition => "AWS::Partition",
            Self::StackName => "AWS::StackName",
            Self::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// A property value, possibly containing intrinsic functions
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// `Ref` of a resource
    Ref(ResourceRef),
    /// `Fn::GetAtt` of a resource attribute
    GetAtt(ResourceRef, String),
    Pseudo(Pseudo),
    /// `Fn::Join`
    Join(String, Vec<Value>),
    /// `Fn::Select`
    Select(usize, Box<Value>),
    /// `Fn::GetAZs` of the current region
    GetAzs,
}

/// How a reference renders inside the template being written
pub trait ReferenceResolver {
    fn resolve(&self, reference: &ResourceRef, attribute: Option<&str>)
        -> SynthResult<serde_json::Value>;
}

impl Value {
    pub fn get_att(reference: &ResourceRef, attribute: impl Into<String>) -> Self {
        Value::GetAtt(reference.clone(), attribute.into())
    }

    /// Fractional number; non-finite inputs fall back to their string form
    pub fn float(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()))
    }

    /// Map from `(key, value)` pairs
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Concatenate parts, merging adjacent literals
    ///
    /// Yields a plain string when every part is a literal, otherwise an
    /// `Fn::Join` with an empty separator.
    pub fn concat(parts: impl IntoIterator<Item = Value>) -> Self {
        let mut merged: Vec<Value> = Vec::new();
        for part in parts {
            let part = match part {
                Value::Join(sep, inner) if sep.is_empty() => {
                    merged.extend(inner);
                    continue;
                }
                other => other,
            };
            if let Value::String(next) = &part {
                if next.is_empty() {
                    continue;
                }
                if let Some(Value::String(last)) = merged.last_mut() {
                    last.push_str(next);
                    continue;
                }
            }
            merged.push(part);
        }

        match merged.len() {
            0 => Value::String(String::new()),
            1 => merged.remove(0),
            _ => Value::Join(String::new(), merged),
        }
    }

    /// Literal string content, if the value has no intrinsics
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value is plain data without intrinsic functions
    pub fn is_literal(&self) -> bool {
        match self {
            Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
            Value::List(items) => items.iter().all(Value::is_literal),
            Value::Map(entries) => entries.values().all(Value::is_literal),
            _ => false,
        }
    }

    /// Visit every resource reference with its attribute
    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a ResourceRef, Option<&'a str>)) {
        match self {
            Value::Ref(r) => f(r, None),
            Value::GetAtt(r, attr) => f(r, Some(attr.as_str())),
            Value::List(items) | Value::Join(_, items) => {
                items.iter().for_each(|item| item.visit_refs(f))
            }
            Value::Map(entries) => entries.values().for_each(|v| v.visit_refs(f)),
            Value::Select(_, inner) => inner.visit_refs(f),
            Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Pseudo(_) | Value::GetAzs => {}
        }
    }

    /// Render to template JSON
    pub fn render(&self, resolver: &dyn ReferenceResolver) -> SynthResult<serde_json::Value> {
        Ok(match self {
            Value::Bool(b) => json!(b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => json!(s),
            Value::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.render(resolver))
                    .collect::<SynthResult<_>>()?,
            ),
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.render(resolver)?)))
                    .collect::<SynthResult<_>>()?,
            ),
            Value::Ref(r) => resolver.resolve(r, None)?,
            Value::GetAtt(r, attr) => resolver.resolve(r, Some(attr))?,
            Value::Pseudo(p) => json!({ "Ref": p.as_str() }),
            Value::Join(sep, items) => {
                let rendered = items
                    .iter()
                    .map(|item| item.render(resolver))
                    .collect::<SynthResult<Vec<_>>>()?;
                json!({ "Fn::Join": [sep, rendered] })
            }
            Value::Select(index, inner) => {
                json!({ "Fn::Select": [index, inner.render(resolver)?] })
            }
            Value::GetAzs => json!({ "Fn::GetAZs": "" }),
        })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number((n as u64).into())
    }
}

impl From<Pseudo> for Value {
    fn from(p: Pseudo) -> Self {
        Value::Pseudo(p)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StackId;
    use crate::domain::LogicalId;
    use crate::errors::SynthError;
    use pretty_assertions::assert_eq;

    struct Local;

    impl ReferenceResolver for Local {
        fn resolve(
            &self,
            reference: &ResourceRef,
            attribute: Option<&str>,
        ) -> SynthResult<serde_json::Value> {
            Ok(match attribute {
                None => json!({ "Ref": reference.logical_id().as_str() }),
                Some(attr) => json!({ "Fn::GetAtt": [reference.logical_id().as_str(), attr] }),
            })
        }
    }

    struct Refusing;

    impl ReferenceResolver for Refusing {
        fn resolve(&self, reference: &ResourceRef, _: Option<&str>) -> SynthResult<serde_json::Value> {
            Err(SynthError::DanglingReference {
                stack: "Test".to_string(),
                logical_id: reference.logical_id().to_string(),
            })
        }
    }

    fn cluster() -> ResourceRef {
        ResourceRef::new(StackId(0), LogicalId::from_raw("DbCluster").unwrap())
    }

    #[test]
    fn test_concat_merges_literals() {
        assert_eq!(
            Value::concat([Value::from("jdbc:"), "mysql://".into(), "host".into()]),
            Value::String("jdbc:mysql://host".to_string())
        );
    }

    #[test]
    fn test_concat_keeps_references_in_join() {
        let url = Value::concat([
            "jdbc:mysql://".into(),
            Value::get_att(&cluster(), "Endpoint.Address"),
            ":3306".into(),
            "?allowPublicKeyRetrieval=true".into(),
        ]);

        assert_eq!(
            url.render(&Local).unwrap(),
            json!({ "Fn::Join": ["", [
                "jdbc:mysql://",
                { "Fn::GetAtt": ["DbCluster", "Endpoint.Address"] },
                ":3306?allowPublicKeyRetrieval=true"
            ]] })
        );
        assert!(!url.is_literal());
    }

    #[test]
    fn test_concat_flattens_nested_joins() {
        let inner = Value::concat([Value::from("a"), Value::Ref(cluster())]);
        let outer = Value::concat([inner, "b".into(), "c".into()]);
        assert_eq!(
            outer,
            Value::Join(
                String::new(),
                vec!["a".into(), Value::Ref(cluster()), "bc".into()]
            )
        );
    }

    #[test]
    fn test_visit_refs_finds_nested_references() {
        let value = Value::map([
            ("Subnets", Value::List(vec![Value::Ref(cluster())])),
            ("Az", Value::Select(0, Box::new(Value::GetAzs))),
            ("Host", Value::get_att(&cluster(), "Endpoint.Address")),
        ]);
        let mut found = Vec::new();
        value.visit_refs(&mut |r, attr| found.push((r.clone(), attr.map(str::to_string))));
        assert_eq!(found.len(), 2);
        assert!(found.contains(&(cluster(), Some("Endpoint.Address".to_string()))));
    }

    #[test]
    fn test_render_intrinsics() {
        assert_eq!(
            Value::Select(1, Box::new(Value::GetAzs)).render(&Local).unwrap(),
            json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
        );
        assert_eq!(
            Value::Pseudo(Pseudo::Region).render(&Local).unwrap(),
            json!({ "Ref": "AWS::Region" })
        );
        assert_eq!(Value::float(0.5).render(&Local).unwrap(), json!(0.5));
    }

    #[test]
    fn test_render_propagates_resolver_errors() {
        let value = Value::List(vec!["ok".into(), Value::Ref(cluster())]);
        assert!(matches!(
            value.render(&Refusing),
            Err(SynthError::DanglingReference { .. })
        ));
        assert!(Value::from("plain").render(&Refusing).is_ok());
    }
}
