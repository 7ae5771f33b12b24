use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::MalformedResponseError;

const BYLINE_PREFIX: &str = "By ";
const PUB_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// One document as returned by the provider. Shape is only partially known,
/// so fields are reached by key path and absence is never an error here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Value);

impl RawRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.0, |value, key| value.get(*key))
    }

    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Flat row exported to CSV. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub pub_date: NaiveDate,
    pub title: String,
    pub author: Option<String>,
    pub snippet: String,
    pub web_url: String,
}

/// Flatten one raw document. Pure: the same input always gives the same output.
///
/// A missing or empty byline yields `author: None`; only the date, headline and
/// url are required.
pub fn normalize(raw: &RawRecord) -> Result<NormalizedRecord, MalformedResponseError> {
    let pub_date = raw
        .get_str(&["pub_date"])
        .ok_or_else(|| MalformedResponseError::MissingField("pub_date".into()))?;
    let title = raw
        .get_str(&["headline", "main"])
        .ok_or_else(|| MalformedResponseError::MissingField("headline.main".into()))?;
    let web_url = raw
        .get_str(&["web_url"])
        .ok_or_else(|| MalformedResponseError::MissingField("web_url".into()))?;

    Ok(NormalizedRecord {
        pub_date: parse_pub_date(pub_date)?,
        title: title.to_string(),
        author: extract_author(raw),
        snippet: raw.get_str(&["snippet"]).unwrap_or_default().to_string(),
        web_url: web_url.to_string(),
    })
}

fn extract_author(raw: &RawRecord) -> Option<String> {
    let original = raw.get_str(&["byline", "original"])?;
    let author = original.strip_prefix(BYLINE_PREFIX).unwrap_or(original);
    if author.is_empty() {
        None
    } else {
        Some(author.to_string())
    }
}

fn parse_pub_date(input: &str) -> Result<NaiveDate, MalformedResponseError> {
    if let Ok(dt) = DateTime::parse_from_str(input, PUB_DATE_FORMAT) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.date_naive());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| MalformedResponseError::InvalidDate(input.to_string()))
}
