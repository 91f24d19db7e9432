//! Meta data attached to collections and media entries.
//!
//! A [`MetaDatum`] holds either a single string or a list of people/keywords
//! discovered through relation links. The shape is fixed the first time a
//! value is populated.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::person::{Keyword, Person};
use super::Entity;
use crate::config::PlayerConfig;
use crate::constants::META_VALUE_BUDGET;
use crate::error::{ClientError, ClientResult};
use crate::text::{normalize_line_breaks, shorten};

/// Delimiter between items of a list-valued meta datum.
pub const LIST_DELIMITER: &str = ", ";

/// Default separator between serialized meta values.
pub const DEFAULT_SEPARATOR: &str = " | ";

/// One resolved item of a list-valued meta datum.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaItem {
    Person(Arc<Person>),
    Keyword(Arc<Keyword>),
}

impl MetaItem {
    pub fn id(&self) -> &str {
        match self {
            MetaItem::Person(p) => &p.id,
            MetaItem::Keyword(k) => &k.id,
        }
    }

    pub fn display_value(&self) -> String {
        match self {
            MetaItem::Person(p) => p.display_value(),
            MetaItem::Keyword(k) => k.display_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Text(String),
    List(Vec<MetaItem>),
}

#[derive(Debug, Deserialize)]
struct MetaDatumDocument {
    id: String,
    meta_key_id: String,
    #[serde(default, rename = "type")]
    datum_type: Option<String>,
    #[serde(default)]
    value: JsonValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaDatum {
    pub id: String,
    pub meta_key_id: String,
    /// Declared type, e.g. `MetaDatum::Text` or `MetaDatum::People`.
    pub datum_type: Option<String>,
    value: Option<MetaValue>,
}

impl MetaDatum {
    pub fn from_json(json: &JsonValue) -> ClientResult<Self> {
        let doc = MetaDatumDocument::deserialize(json)
            .map_err(|e| ClientError::malformed(Self::KIND, e))?;
        let mut datum = MetaDatum {
            id: doc.id,
            meta_key_id: doc.meta_key_id,
            datum_type: doc.datum_type,
            value: None,
        };
        datum.apply_value(&doc.value);
        Ok(datum)
    }

    pub fn value(&self) -> Option<&MetaValue> {
        self.value.as_ref()
    }

    pub fn is_list(&self) -> bool {
        matches!(self.value, Some(MetaValue::List(_)))
    }

    /// List items, empty for scalar or unpopulated values.
    pub fn items(&self) -> &[MetaItem] {
        match &self.value {
            Some(MetaValue::List(items)) => items,
            _ => &[],
        }
    }

    /// Appends a list item. Returns false when the value is a scalar string.
    pub fn add_value(&mut self, item: MetaItem) -> bool {
        match self.value.get_or_insert_with(|| MetaValue::List(Vec::new())) {
            MetaValue::List(items) => {
                items.push(item);
                true
            }
            MetaValue::Text(_) => false,
        }
    }

    /// Display value: the string itself or list items joined by `delimiter`.
    pub fn display_value(&self, delimiter: &str) -> Option<String> {
        match self.value.as_ref()? {
            MetaValue::Text(text) => Some(text.clone()),
            MetaValue::List(items) => Some(
                items
                    .iter()
                    .map(MetaItem::display_value)
                    .collect::<Vec<_>>()
                    .join(delimiter),
            ),
        }
    }

    fn apply_value(&mut self, value: &JsonValue) {
        match (&mut self.value, value) {
            (None, JsonValue::String(text)) => self.value = Some(MetaValue::Text(text.clone())),
            (None, JsonValue::Array(_)) => self.value = Some(MetaValue::List(Vec::new())),
            (Some(MetaValue::Text(current)), JsonValue::String(text)) => {
                current.clone_from(text)
            }
            (Some(MetaValue::List(items)), JsonValue::Array(_)) => items.clear(),
            (None, other) => {
                tracing::warn!(
                    meta_datum_id = %self.id,
                    value = %other,
                    "Unrecognized meta datum value"
                );
            }
            (Some(_), _) => {
                tracing::warn!(
                    meta_datum_id = %self.id,
                    "Meta datum value changed shape, keeping the original one"
                );
            }
        }
    }
}

impl Entity for MetaDatum {
    const KIND: &'static str = "meta-datum";

    fn id(&self) -> &str {
        &self.id
    }

    fn parse(&mut self, json: &JsonValue) -> ClientResult<()> {
        let doc = MetaDatumDocument::deserialize(json)
            .map_err(|e| ClientError::malformed(Self::KIND, e))?;
        self.id = doc.id;
        self.meta_key_id = doc.meta_key_id;
        self.datum_type = doc.datum_type;
        self.apply_value(&doc.value);
        Ok(())
    }
}

/// Meta data of one entity, at most one datum per meta key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaData(BTreeMap<String, MetaDatum>);

impl MetaData {
    pub fn insert(&mut self, datum: MetaDatum) {
        self.0.insert(datum.meta_key_id.clone(), datum);
    }

    pub fn get(&self, key: &str) -> Option<&MetaDatum> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Generic meta-key access shared by every entity that carries meta data.
pub trait MetaDataHolder {
    fn meta_data(&self) -> &MetaData;

    fn meta_data_mut(&mut self) -> &mut MetaData;

    /// Stores `datum` under its meta key, replacing any previous one.
    fn set_meta_datum(&mut self, datum: MetaDatum) {
        self.meta_data_mut().insert(datum);
    }

    fn meta_datum(&self, key: &str) -> Option<&MetaDatum> {
        self.meta_data().get(key)
    }

    /// Display value of `key`, `None` when absent or empty.
    fn meta_value(&self, key: &str) -> Option<String> {
        self.meta_datum(key)
            .and_then(|d| d.display_value(LIST_DELIMITER))
            .filter(|v| !v.is_empty())
    }

    /// Display value of `key`, empty when absent so it can be sorted and shown.
    fn get_meta_datum(&self, key: &str) -> String {
        self.meta_value(key).unwrap_or_default()
    }

    /// Renders the values of `keys` in order, skipping empty ones.
    ///
    /// Line breaks are normalized (and replaced by `paragraph_separator` when
    /// given) and each value is shortened to the display budget.
    fn serialize_meta_data<S: AsRef<str>>(
        &self,
        keys: &[S],
        separator: &str,
        paragraph_separator: Option<&str>,
    ) -> String {
        keys.iter()
            .filter_map(|key| self.meta_value(key.as_ref()))
            .map(|value| {
                let value = normalize_line_breaks(&value, paragraph_separator);
                shorten(&value, META_VALUE_BUDGET, "...")
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Renders the configured white list (widened by the minimum keys) with
    /// the default separator.
    fn serialize_white_listed(
        &self,
        config: &PlayerConfig,
        paragraph_separator: Option<&str>,
    ) -> String {
        self.serialize_meta_data(
            &config.meta_data_white_list(),
            DEFAULT_SEPARATOR,
            paragraph_separator,
        )
    }
}
