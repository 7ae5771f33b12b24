use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::types::PageIndex;

pub const API_KEY_PARAM: &str = "api-key";
pub const FILTER_PARAM: &str = "fq";
pub const PAGE_PARAM: &str = "page";

/// Characters escaped in query keys and values.
///
/// `%` is left alone so filters that were encoded by hand (`%22` for a quote)
/// reach the provider unchanged. Quotes and parentheses are always escaped;
/// the provider rejects them raw.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'&')
    .add(b'(')
    .add(b')')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Text(String),
    Number(u64),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Text(text) => f.write_str(text),
            QueryValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Number(u64::from(value))
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        QueryValue::Number(value)
    }
}

impl From<FilterExpr> for QueryValue {
    fn from(value: FilterExpr) -> Self {
        QueryValue::Text(value.0)
    }
}

/// Immutable set of query-string parameters. Every `with*` call yields a new query.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    params: BTreeMap<String, QueryValue>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(&self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        let mut params = self.params.clone();
        params.insert(key.into(), value.into());
        Self { params }
    }

    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        self.with(API_KEY_PARAM, api_key.into())
    }

    pub fn with_filter(&self, filter: impl Into<QueryValue>) -> Self {
        self.with(FILTER_PARAM, filter)
    }

    pub fn with_page(&self, page: PageIndex) -> Self {
        self.with(PAGE_PARAM, page)
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.params.get(key)
    }

    pub fn page(&self) -> Option<PageIndex> {
        match self.params.get(PAGE_PARAM)? {
            QueryValue::Number(n) => PageIndex::try_from(*n).ok(),
            QueryValue::Text(text) => text.parse().ok(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encoded `key=value&...` string, keys in sorted order.
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, QUERY_VALUE),
                    utf8_percent_encode(&value.to_string(), QUERY_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

// The api key must not end up in logs.
impl fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.params {
            if key == API_KEY_PARAM {
                map.entry(key, &"<redacted>");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// A filter-query (`fq`) expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr(String);

impl FilterExpr {
    pub fn raw(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    /// `field:(%22phrase%22)`, the quoted-phrase form scoped to one field.
    pub fn field_phrase(field: &str, phrase: &str) -> Self {
        Self(format!("{field}:(%22{phrase}%22)"))
    }

    pub fn and(self, other: FilterExpr) -> Self {
        Self(format!("{} AND {}", self.0, other.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
