//! Common types and utilities for the TencentCloud API

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Default page size for paged Describe calls
pub const PAGE_LIMIT: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, vec![value.into()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Paging {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: PAGE_LIMIT,
        }
    }
}

impl Paging {
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }

    /// A page shorter than the limit is the last one
    pub fn is_last(&self, received: usize) -> bool {
        (received as u64) < self.limit
    }
}

pub fn tags_to_map(tags: &[Tag]) -> HashMap<String, String> {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect()
}

pub fn map_to_tags(tags: &HashMap<String, String>) -> Vec<Tag> {
    let mut tags: Vec<Tag> = tags
        .iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    tags.sort_by(|a, b| a.key.cmp(&b.key));
    tags
}

/// Tags to set and tag keys to remove when moving from `old` to `new`
pub fn diff_tags(
    old: &HashMap<String, String>,
    new: &HashMap<String, String>,
) -> (Vec<Tag>, Vec<String>) {
    let mut replace: Vec<Tag> = new
        .iter()
        .filter(|(key, value)| old.get(*key) != Some(*value))
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    replace.sort_by(|a, b| a.key.cmp(&b.key));

    let mut delete: Vec<String> = old
        .keys()
        .filter(|key| !new.contains_key(*key))
        .cloned()
        .collect();
    delete.sort();

    (replace, delete)
}

/// Six-segment resource name used by the tag service
pub fn resource_name(service: &str, region: &str, resource_type: &str, id: &str) -> String {
    format!("qcs::{}:{}:uin/:{}/{}", service, region, resource_type, id)
}

/// Accepts `0`/`1` integers as well as JSON booleans
pub fn deserialize_int_bool_option<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(u64),
    }

    match Option::<BoolOrInt>::deserialize(deserializer)? {
        Some(BoolOrInt::Bool(b)) => Ok(Some(b)),
        Some(BoolOrInt::Int(0)) => Ok(Some(false)),
        Some(BoolOrInt::Int(1)) => Ok(Some(true)),
        Some(BoolOrInt::Int(_)) => Err(serde::de::Error::custom("expected 0 or 1")),
        None => Ok(None),
    }
}

/// Task and role ids arrive either as JSON strings or numbers
pub mod string_or_u64 {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrU64 {
            String(String),
            U64(u64),
        }

        match Option::<StringOrU64>::deserialize(deserializer)? {
            Some(StringOrU64::String(s)) => {
                s.parse::<u64>().map(Some).map_err(serde::de::Error::custom)
            }
            Some(StringOrU64::U64(u)) => Ok(Some(u)),
            None => Ok(None),
        }
    }
}

/// Like `string_or_u64`, keeping the value as text
pub mod string_or_number {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Number(serde_json::Number),
        }

        Ok(
            Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
                StringOrNumber::String(s) => s,
                StringOrNumber::Number(n) => n.to_string(),
            }),
        )
    }
}
