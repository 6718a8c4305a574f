use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::compiled::SCORE_FIELD;
use crate::error::DecodeError;

/// A decoded field value.
///
/// Stores often wrap scalars in one-element lists; those are unwrapped into
/// `Single`. Anything else that arrives as a list stays a `Multi`, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Multi(Vec<Value>),
    Single(Value),
}

impl FieldValue {
    fn from_raw(raw: &Value) -> Self {
        match raw {
            Value::Array(items) if items.len() == 1 => FieldValue::Single(items[0].clone()),
            Value::Array(items) => FieldValue::Multi(items.clone()),
            other => FieldValue::Single(other.clone()),
        }
    }

    /// The value as a string, for single string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Single(v) => v.as_str(),
            FieldValue::Multi(_) => None,
        }
    }

    /// All values, one for `Single`.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            FieldValue::Single(v) => vec![v],
            FieldValue::Multi(vs) => vs.iter().collect(),
        }
    }
}

impl PartialEq<&str> for FieldValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

/// One hit, in the order the store ranked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub document_id: String,
    pub score: f32,
    /// Only declared fields the hit actually carried.
    pub fields: BTreeMap<String, FieldValue>,
}

impl RankedResult {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Hits decoded from one response, plus how many were unusable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPage {
    pub hits: Vec<RankedResult>,
    /// Entries that were not objects or carried no document id.
    pub skipped: usize,
}

/// Turns a raw `{"response": {"docs": [...]}}` tree into [`RankedResult`]s.
///
/// The store is the only ranking authority: hits keep their order.
#[derive(Debug, Clone)]
pub struct ResultDecoder {
    id_field: String,
}

impl Default for ResultDecoder {
    fn default() -> Self {
        Self::new("document_id")
    }
}

impl ResultDecoder {
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
        }
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn decode(
        &self,
        raw: &Value,
        declared_fields: &[String],
    ) -> Result<Vec<RankedResult>, DecodeError> {
        self.decode_page(raw, declared_fields).map(|page| page.hits)
    }

    /// Like [`decode`](Self::decode), but also counts skipped entries.
    pub fn decode_page(
        &self,
        raw: &Value,
        declared_fields: &[String],
    ) -> Result<DecodedPage, DecodeError> {
        let docs = match raw.get("response").and_then(|r| r.get("docs")) {
            Some(Value::Array(docs)) => docs,
            Some(_) => {
                return Err(DecodeError::MalformedResponse(
                    "`response.docs` is not a list".into(),
                ))
            }
            None => {
                let detail = raw
                    .pointer("/error/msg")
                    .and_then(Value::as_str)
                    .map(|msg| format!("missing `response.docs` (store error: {msg})"))
                    .unwrap_or_else(|| "missing `response.docs`".into());
                return Err(DecodeError::MalformedResponse(detail));
            }
        };

        let mut page = DecodedPage {
            hits: Vec::with_capacity(docs.len()),
            skipped: 0,
        };
        for (rank, doc) in docs.iter().enumerate() {
            let Some(hit) = doc.as_object() else {
                warn!(rank, "hit_not_an_object_skipped");
                page.skipped += 1;
                continue;
            };
            let Some(document_id) = hit.get(&self.id_field).and_then(document_id_of) else {
                warn!(rank, id_field = %self.id_field, "hit_without_document_id_skipped");
                page.skipped += 1;
                continue;
            };
            let score = hit
                .get(SCORE_FIELD)
                .and_then(Value::as_f64)
                .map(|s| s as f32)
                .unwrap_or(0.0);

            let fields = declared_fields
                .iter()
                .filter_map(|name| {
                    hit.get(name)
                        .map(|raw| (name.clone(), FieldValue::from_raw(raw)))
                })
                .collect();

            page.hits.push(RankedResult {
                document_id,
                score,
                fields,
            });
        }
        Ok(page)
    }
}

fn document_id_of(raw: &Value) -> Option<String> {
    match FieldValue::from_raw(raw) {
        FieldValue::Single(Value::String(s)) if !s.is_empty() => Some(s),
        FieldValue::Single(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
