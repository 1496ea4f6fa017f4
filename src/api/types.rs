use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque session cookie value for the listings site.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Cookie` header value carrying this token under `cookie_name`.
    pub fn cookie_header(&self, cookie_name: &str) -> String {
        format!("{}={}", cookie_name, self.0)
    }
}

// Never print the full token.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "SessionToken({}…)", visible)
    }
}

/// Listing identifier in its string form; the site sends it as a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for ListingId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        string_or_number(deserializer).map(ListingId)
    }
}

/// One record of `Resultaten`. Fields the engine does not consume are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawListing {
    #[serde(alias = "Id")]
    pub listing_id: ListingId,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub price: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "opt_u32_lenient")]
    pub room_count: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publication_end_date: Option<String>,
    #[serde(default)]
    pub preview_path: Option<String>,
}

/// Body of `POST /webapi/zoeken/find/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hideunits: Option<String>,
}

impl SearchRequest {
    pub fn new(filter: String, hide_units: Option<&str>) -> Self {
        Self {
            url: filter,
            command: None,
            hideunits: hide_units.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "TotalSearchResults", default)]
    pub total_search_results: u32,
    #[serde(rename = "Resultaten", default)]
    pub results: Vec<RawListing>,
}

/// Appends a `~key[value]` segment to a filter string.
pub fn create_filter(base: &str, key: &str, value: &str) -> String {
    if base.is_empty() {
        format!("{}[{}]", key, value)
    } else {
        format!("{}~{}[{}]", base, key, value)
    }
}

pub fn page_filter(base: &str, page: u32) -> String {
    create_filter(base, "page", &page.to_string())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn opt_u32_lenient<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
