/*! Read-only access to hierarchical configuration documents.

Builders extract their parameters from a [ConfigNode], a view on one
element of a configuration [Document]. Documents can be written in
JSON or YAML; both are represented as a [serde_json::Value] tree.
Scalar fields may be given either as numbers or as numeric strings,
so that documents converted from element-text formats are accepted
as well.
*/

use serde_json::Value;

use crate::error::{Error, Result};

/// An owned configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Parse a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map(|root| Document { root })
            .map_err(|e| Error::MalformedDocument(e.to_string()))
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map(|root| Document { root })
            .map_err(|e| Error::MalformedDocument(e.to_string()))
    }

    /// The top-level element of the document.
    pub fn root(&self) -> ConfigNode<'_> {
        ConfigNode::new(&self.root)
    }
}

impl From<Value> for Document {
    fn from(root: Value) -> Self {
        Document { root }
    }
}

/// A borrowed element of a configuration document, together with its
/// dotted path (used to report errors).
#[derive(Debug, Clone)]
pub struct ConfigNode<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> ConfigNode<'a> {
    /// View `value` as the root of a document.
    pub fn new(value: &'a Value) -> Self {
        ConfigNode {
            value,
            path: String::new(),
        }
    }

    /// The dotted path of this element (empty for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    fn field_path(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.path, field)
        }
    }

    fn field(&self, field: &str) -> Option<&'a Value> {
        match self.value.get(field) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    pub(crate) fn missing(&self, field: &str) -> Error {
        Error::MissingField {
            path: self.field_path(field),
        }
    }

    pub(crate) fn invalid(&self, field: &str, expected: &'static str) -> Error {
        Error::InvalidField {
            path: self.field_path(field),
            expected,
        }
    }

    /// Check whether the element defines `field`.
    pub fn has(&self, field: &str) -> bool {
        self.field(field).is_some()
    }

    /// The nested element `field`, which must be present.
    pub fn child(&self, field: &str) -> Result<ConfigNode<'a>> {
        self.optional_child(field).ok_or_else(|| self.missing(field))
    }

    /// The nested element `field`, if present.
    pub fn optional_child(&self, field: &str) -> Option<ConfigNode<'a>> {
        self.field(field).map(|value| ConfigNode {
            value,
            path: self.field_path(field),
        })
    }

    /// The elements of the list `field`, which must be present.
    pub fn children(&self, field: &str) -> Result<Vec<ConfigNode<'a>>> {
        let list = self
            .field(field)
            .ok_or_else(|| self.missing(field))?
            .as_array()
            .ok_or_else(|| self.invalid(field, "a list"))?;
        let path = self.field_path(field);
        Ok(list
            .iter()
            .enumerate()
            .map(|(i, value)| ConfigNode {
                value,
                path: format!("{}[{}]", path, i),
            })
            .collect())
    }

    /// A required floating-point field.
    pub fn required_f64(&self, field: &str) -> Result<f64> {
        self.optional_f64(field)?.ok_or_else(|| self.missing(field))
    }

    /// An optional floating-point field.
    pub fn optional_f64(&self, field: &str) -> Result<Option<f64>> {
        match self.field(field) {
            None => Ok(None),
            Some(v) => as_f64(v)
                .map(Some)
                .ok_or_else(|| self.invalid(field, "a number")),
        }
    }

    /// A required non-negative integer field.
    pub fn required_u64(&self, field: &str) -> Result<u64> {
        self.optional_u64(field)?.ok_or_else(|| self.missing(field))
    }

    /// An optional non-negative integer field.
    pub fn optional_u64(&self, field: &str) -> Result<Option<u64>> {
        match self.field(field) {
            None => Ok(None),
            Some(v) => as_u64(v)
                .map(Some)
                .ok_or_else(|| self.invalid(field, "a non-negative integer")),
        }
    }

    /// An optional list of non-negative integers; absent lists are empty.
    pub fn optional_u64_list(&self, field: &str) -> Result<Vec<u64>> {
        const EXPECTED: &str = "a list of non-negative integers";
        match self.field(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| as_u64(v).ok_or_else(|| self.invalid(field, EXPECTED)))
                .collect(),
            Some(_) => Err(self.invalid(field, EXPECTED)),
        }
    }

    /// A required string field.
    pub fn required_str(&self, field: &str) -> Result<&'a str> {
        self.field(field)
            .ok_or_else(|| self.missing(field))?
            .as_str()
            .ok_or_else(|| self.invalid(field, "a string"))
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::Document;
    use crate::error::{Error, ErrorKind};

    #[test]
    fn scalar_fields() {
        let doc = Document::from_json_str(
            r#"{ "scale": 2, "pmin": "0.5", "deadlines": [10, 20], "task": { "name": "t" } }"#,
        )
        .unwrap();
        let root = doc.root();
        assert_eq!(root.required_f64("scale"), Ok(2.0));
        assert_eq!(root.required_f64("pmin"), Ok(0.5));
        assert_eq!(root.optional_f64("offset"), Ok(None));
        assert_eq!(root.optional_u64_list("deadlines"), Ok(vec![10, 20]));
        assert_eq!(root.optional_u64_list("others"), Ok(vec![]));
        assert_eq!(root.child("task").unwrap().required_str("name"), Ok("t"));
    }

    #[test]
    fn missing_and_malformed_fields() {
        let doc = Document::from_yaml_str("task:\n  name: 3\n  period: -1\n").unwrap();
        let task = doc.root().child("task").unwrap();
        assert_eq!(
            task.required_f64("scale"),
            Err(Error::MissingField {
                path: "task.scale".to_string()
            })
        );
        assert_eq!(task.required_str("name").unwrap_err().kind(), ErrorKind::Configuration);
        assert_eq!(task.required_u64("period").unwrap_err().kind(), ErrorKind::Configuration);
        assert_eq!(doc.root().child("qos").unwrap_err().kind(), ErrorKind::MissingField);
    }

    #[test]
    fn list_paths() {
        let doc = Document::from_json_str(r#"{ "values": [ { "value": 1 }, { } ] }"#).unwrap();
        let values = doc.root().children("values").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].path(), "values[1]");
        assert_eq!(
            values[1].required_u64("value"),
            Err(Error::MissingField {
                path: "values[1].value".to_string()
            })
        );
    }

    #[test]
    fn malformed_document() {
        let err = Document::from_json_str("{ scale: ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
