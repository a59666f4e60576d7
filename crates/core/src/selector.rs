//! Trend selector codec and drill-down links.
//!
//! A selector names one trend instance as `subrecord__slug` or `subrecord__slug__field`.
//! Drill-down links append `selector=value` to the current request path; following
//! several links for the same selector accumulates a multi-valued query parameter.
//!
//! Values are not escaped here. Callers that put `&`, `=` or `?` into values must
//! escape them before building links.

use crate::constants::SELECTOR_SEPARATOR;
use crate::{TrendError, TrendResult};
use trendy_types::Identifier;

/// The identity of one trend instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrendSelector {
    pub subrecord_api_name: Identifier,
    pub slug: Identifier,
    pub field_name: Option<Identifier>,
}

impl TrendSelector {
    /// Create a selector from raw component strings.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::InvalidIdentifier`] if a component is not a valid identifier.
    pub fn new(
        subrecord_api_name: &str,
        slug: &str,
        field_name: Option<&str>,
    ) -> TrendResult<Self> {
        Ok(Self {
            subrecord_api_name: Identifier::new(subrecord_api_name)?,
            slug: Identifier::new(slug)?,
            field_name: field_name.map(Identifier::new).transpose()?,
        })
    }

    /// The selector's token, used as the query key of drill-down links.
    pub fn encode(&self) -> String {
        encode(
            self.subrecord_api_name.as_str(),
            self.slug.as_str(),
            self.field_name.as_ref().map(Identifier::as_str),
        )
    }

    /// Split a token into its components.
    ///
    /// This does not check that the slug is registered; see
    /// [`crate::registry::TrendRegistry::decode`].
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::MalformedSelector`] unless the token splits into two or
    /// three valid identifiers.
    pub fn decode(token: &str) -> TrendResult<Self> {
        let malformed = || TrendError::MalformedSelector(token.to_owned());
        let parts: Vec<&str> = token.split(SELECTOR_SEPARATOR).collect();

        let (subrecord, slug, field) = match parts.as_slice() {
            [subrecord, slug] => (*subrecord, *slug, None),
            [subrecord, slug, field] => (*subrecord, *slug, Some(*field)),
            _ => return Err(malformed()),
        };

        Self::new(subrecord, slug, field).map_err(|_| malformed())
    }
}

impl std::fmt::Display for TrendSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl std::str::FromStr for TrendSelector {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrendSelector::decode(s)
    }
}

/// Joins selector components with the separator.
pub fn encode(subrecord_api_name: &str, slug: &str, field_name: Option<&str>) -> String {
    match field_name {
        Some(field) => [subrecord_api_name, slug, field].join(SELECTOR_SEPARATOR),
        None => [subrecord_api_name, slug].join(SELECTOR_SEPARATOR),
    }
}

/// Appends `selector_key=value` to `current_path`, starting the query string if needed.
pub fn build_link(current_path: &str, selector_key: &str, value: &str) -> String {
    let separator = if current_path.contains('?') { '&' } else { '?' };
    format!("{current_path}{separator}{selector_key}={value}")
}

/// The read-only view of the current request that trends need: its full path and its
/// query parameters in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    full_path: String,
    query: Vec<(String, String)>,
}

impl RequestContext {
    /// Parses `full_path` (path plus optional query string).
    ///
    /// Query pairs are split on `&` and the first `=`; a key without `=` has an empty
    /// value. Nothing is percent-decoded.
    pub fn new(full_path: impl Into<String>) -> Self {
        let full_path = full_path.into();
        let query = full_path
            .split_once('?')
            .map(|(_, query)| parse_query(query))
            .unwrap_or_default();

        Self { full_path, query }
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Every value given for `key`, in request order.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Distinct query keys in the order they first appear.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.query {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    /// The current path with `link` (an already-joined `key=value`) appended.
    pub fn append_to_request(&self, link: &str) -> String {
        let separator = if self.full_path.contains('?') { '&' } else { '?' };
        format!("{}{separator}{link}", self.full_path)
    }

    /// The request reached by following a drill-down link from this one.
    pub fn follow(&self, selector_key: &str, value: &str) -> Self {
        Self::new(build_link(&self.full_path, selector_key, value))
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.split_once('#').map_or(query, |(query, _)| query);
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_owned(), value.to_owned()),
            None => (pair.to_owned(), String::new()),
        })
        .collect()
}
