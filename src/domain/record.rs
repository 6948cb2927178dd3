//! Serializable nested record: the persistence shape of a document.

use serde::{Deserialize, Serialize};

/// One node of a serialized document: `{name, body, id?, children?}`.
///
/// `children` is omitted when empty and `id` when absent. On input the
/// legacy `HTML` key is accepted for `body`, and `null` for either
/// optional field is read as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub name: String,
    #[serde(default, alias = "HTML", deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub children: Vec<DocumentRecord>,
}

impl DocumentRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: String::new(),
            id: None,
            children: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<DocumentRecord>) -> Self {
        self.children = children;
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_empty_children_and_no_id_when_serializing_then_keys_are_omitted() {
        let record = DocumentRecord::new("leaf").with_body("<p>x</p>");

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value, json!({"name": "leaf", "body": "<p>x</p>"}));
    }

    #[test]
    fn given_legacy_html_key_when_deserializing_then_reads_body() {
        let record: DocumentRecord =
            serde_json::from_value(json!({"name": "root", "HTML": "<b>hi</b>"})).unwrap();

        assert_eq!(record.body, "<b>hi</b>");
    }

    #[test]
    fn given_null_children_when_deserializing_then_treated_as_leaf() {
        let record: DocumentRecord =
            serde_json::from_value(json!({"name": "root", "children": null, "body": null}))
                .unwrap();

        assert!(record.children.is_empty());
        assert!(record.body.is_empty());
    }
}
