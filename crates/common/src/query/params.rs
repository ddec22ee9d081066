//! Query string decoding
//!
//! Turns a raw query string into a map of parameter name to either a
//! scalar or a list. A key becomes a list when it repeats or is written
//! with brackets (`keyword[]=a`, `keyword[0]=a`); once a key has been seen
//! as a list it stays a list.

use std::collections::BTreeMap;
use url::form_urlencoded;

/// Decoded value of one query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    /// All raw occurrences, in query order
    pub fn as_slice(&self) -> &[String] {
        match self {
            ParamValue::Scalar(value) => std::slice::from_ref(value),
            ParamValue::List(values) => values,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ParamValue::List(_))
    }

    /// A second occurrence always promotes to a list
    fn push(self, value: String) -> Self {
        match self {
            ParamValue::Scalar(first) => ParamValue::List(vec![first, value]),
            ParamValue::List(mut values) => {
                values.push(value);
                ParamValue::List(values)
            }
        }
    }
}

/// Parsed query parameters keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, ParamValue>,
}

impl QueryParams {
    /// Parse a raw query string. `None` and `""` yield an empty map.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(raw) = raw else {
            return params;
        };

        // '+' is a space and invalid UTF-8 decodes lossily
        for (key, value) in form_urlencoded::parse(raw.trim_start_matches('?').as_bytes()) {
            if key.is_empty() {
                continue;
            }
            let (name, bracketed) = split_list_key(&key);
            params.insert(name.to_string(), value.into_owned(), bracketed);
        }

        params
    }

    fn insert(&mut self, key: String, value: String, as_list: bool) {
        let merged = match self.values.remove(&key) {
            Some(existing) => existing.push(value),
            None if as_list => ParamValue::List(vec![value]),
            None => ParamValue::Scalar(value),
        };
        self.values.insert(key, merged);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Value of a parameter given exactly once without brackets.
    /// Empty strings count as absent.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            ParamValue::Scalar(value) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// Non-empty values of a parameter in either form; `None` when nothing
    /// usable was supplied.
    pub fn values(&self, key: &str) -> Option<Vec<&str>> {
        let values: Vec<&str> = self
            .values
            .get(key)?
            .as_slice()
            .iter()
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .collect();
        (!values.is_empty()).then_some(values)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `name[]` and `name[3]` both mark a list entry for `name`
fn split_list_key(key: &str) -> (&str, bool) {
    if let Some(name) = key.strip_suffix("[]") {
        if !name.is_empty() {
            return (name, true);
        }
    }
    if let Some(open) = key.find('[') {
        let index = &key[open + 1..];
        if let Some(digits) = index.strip_suffix(']') {
            if open > 0 && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                return (&key[..open], true);
            }
        }
    }
    (key, false)
}
