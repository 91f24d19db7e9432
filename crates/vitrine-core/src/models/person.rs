use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::Entity;
use crate::error::{ClientError, ClientResult};

/// A person referenced by a list-valued meta datum (authors, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub pseudonym: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub date_of_death: Option<String>,
}

impl Person {
    pub fn from_json(json: &JsonValue) -> ClientResult<Self> {
        Person::deserialize(json).map_err(|e| ClientError::malformed(Self::KIND, e))
    }

    /// "First Last", the last name alone, or empty without a last name.
    pub fn display_value(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (_, None) | (_, Some("")) => String::new(),
            (Some(first), Some(last)) if !first.is_empty() => format!("{} {}", first, last),
            (_, Some(last)) => last.to_string(),
        }
    }
}

impl Entity for Person {
    const KIND: &'static str = "person";

    fn id(&self) -> &str {
        &self.id
    }

    fn parse(&mut self, json: &JsonValue) -> ClientResult<()> {
        *self = Person::from_json(json)?;
        Ok(())
    }
}

impl Display for Person {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.display_value())
    }
}

/// A controlled-vocabulary term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: String,
    pub term: String,
    /// Meta key the term belongs to, e.g. `madek_core:keywords`.
    #[serde(default)]
    pub meta_key_id: Option<String>,
}

impl Keyword {
    pub fn from_json(json: &JsonValue) -> ClientResult<Self> {
        Keyword::deserialize(json).map_err(|e| ClientError::malformed(Self::KIND, e))
    }

    pub fn display_value(&self) -> String {
        self.term.clone()
    }
}

impl Entity for Keyword {
    const KIND: &'static str = "keyword";

    fn id(&self) -> &str {
        &self.id
    }

    fn parse(&mut self, json: &JsonValue) -> ClientResult<()> {
        *self = Keyword::from_json(json)?;
        Ok(())
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.term)
    }
}
