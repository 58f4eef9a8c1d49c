//! # Post search
//!
//! Paging and title filtering for the post listing, plus the RediSearch
//! plumbing the Redis store uses to execute it.
//!
//! The title filter is a case-insensitive substring match. The Redis store
//! answers it with a TAG wildcard over a lowercased mirror of the title
//! (`@titleFolded:{*term*}`), so the term must be escaped for TAG syntax:
//!
//! | Input        | Clause                          |
//! |--------------|---------------------------------|
//! | `"rust"`     | `@titleFolded:{*rust*}`         |
//! | `"Async IO"` | `@titleFolded:{*async\ io*}`    |
//! | `"c++"`      | `@titleFolded:{*c\+\+*}`        |

use redis::{Value, aio::ConnectionManager, cmd, from_redis_value};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use std::borrow::Cow;

use crate::{
    errors::RepoError,
    models::{CREATED_AT_MS_FIELD, TITLE_FOLDED_FIELD},
};

pub const DEFAULT_PAGE: u64 = 1;
/// Posts per page on the reader site.
pub const POSTS_PAGE_SIZE: u64 = 10;

/// RediSearch refuses windows (`offset + limit`) past its default
/// MAXSEARCHRESULTS; pages beyond it only report the total.
pub const MAX_SEARCH_WINDOW: u64 = 10_000;

/// Query-string parameters of the post listing (`?page=&title=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<u64>,
    pub title: Option<String>,
}

/// Unparseable pages fall back to the default; negative ones clamp to 1.
fn lenient_page<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| value.trim().parse::<i64>().ok())
        .map(|page| page.max(1) as u64))
}

impl PostQuery {
    pub fn into_params(self) -> SearchParams {
        let mut params = SearchParams::new().with_page(self.page.unwrap_or(DEFAULT_PAGE), POSTS_PAGE_SIZE);
        if let Some(title) = self.title {
            params = params.with_title_contains(title);
        }
        params
    }
}

/// Search parameters for the post listing. Results are always newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub page: u64,
    pub page_size: u64,
    /// Case-insensitive substring the title must contain. Blank means "match all".
    pub title_contains: Option<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchParams {
    pub fn new() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: POSTS_PAGE_SIZE,
            title_contains: None,
        }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Pages start at 1; anything lower is clamped.
    #[inline]
    pub fn with_page(mut self, page: u64, page_size: u64) -> Self {
        self.page = page.max(1);
        self.page_size = page_size.max(1);
        self
    }

    #[inline]
    pub fn with_title_contains(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.title_contains = if term.trim().is_empty() { None } else { Some(term) };
        self
    }

    /// The folded term used for matching, if any.
    pub fn folded_term(&self) -> Option<String> {
        self.title_contains.as_ref().map(|term| term.to_lowercase())
    }

    /// Whether a title satisfies the filter (used by in-process stores).
    pub fn matches_title(&self, title: &str) -> bool {
        match self.folded_term() {
            Some(term) => title.to_lowercase().contains(&term),
            None => true,
        }
    }

    pub fn build_query(&self) -> String {
        match self.folded_term() {
            Some(term) => format!("@{}:{{*{}*}}", TITLE_FOLDED_FIELD, escape_for_tag_query(&term)),
            None => "*".to_string(),
        }
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size)
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> SearchResult<T> {
    pub fn empty(params: &SearchParams) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: params.page,
            page_size: params.page_size,
        }
    }

}

#[derive(Debug, Clone, Copy)]
pub enum IndexFieldType {
    Tag,
    Numeric,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexField {
    pub path: &'static str,
    pub field_name: &'static str,
    pub field_type: IndexFieldType,
    pub sortable: bool,
}

#[derive(Debug, Clone)]
pub struct IndexDefinition {
    pub name: String,
    pub prefixes: Vec<String>,
    pub schema: &'static [IndexField],
}

/// Schema of the post index: the folded-title mirror, the creation-time
/// mirror and the slug.
pub const POST_INDEX_SCHEMA: &[IndexField] = &[
    IndexField {
        path: "$.titleFolded",
        field_name: TITLE_FOLDED_FIELD,
        field_type: IndexFieldType::Tag,
        sortable: false,
    },
    IndexField {
        path: "$.createdAtMs",
        field_name: CREATED_AT_MS_FIELD,
        field_type: IndexFieldType::Numeric,
        sortable: true,
    },
    IndexField {
        path: "$.slug",
        field_name: "slug",
        field_type: IndexFieldType::Tag,
        sortable: false,
    },
];

// Titles contain commas; a separator that never shows up in folded text
// keeps each title a single tag.
const TAG_SEPARATOR: &str = "\x1f";

pub async fn ensure_index(conn: &mut ConnectionManager, definition: &IndexDefinition) -> Result<(), RepoError> {
    let indexes: Vec<String> = cmd("FT._LIST").query_async(conn).await?;
    if indexes.iter().any(|name| name == &definition.name) {
        return Ok(());
    }

    let mut command = cmd("FT.CREATE");
    command.arg(definition.name.as_str());
    command.arg("ON").arg("JSON");
    command.arg("PREFIX").arg(definition.prefixes.len());
    for prefix in &definition.prefixes {
        command.arg(prefix.as_str());
    }

    command.arg("SCHEMA");
    for field in definition.schema {
        command.arg(field.path);
        command.arg("AS").arg(field.field_name);
        match field.field_type {
            IndexFieldType::Tag => {
                command.arg("TAG");
                command.arg("SEPARATOR").arg(TAG_SEPARATOR);
            }
            IndexFieldType::Numeric => {
                command.arg("NUMERIC");
            }
        }

        if field.sortable {
            command.arg("SORTABLE");
        }
    }

    if let Err(err) = command.query_async::<()>(conn).await {
        if index_exists_error(&err) {
            return Ok(());
        }
        return Err(err.into());
    }

    log::info!("created search index {}", definition.name);
    Ok(())
}

fn index_exists_error(err: &redis::RedisError) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("already exists") && msg.contains("index")
}

pub async fn execute_search<T>(
    conn: &mut ConnectionManager,
    index_name: &str,
    params: &SearchParams,
) -> Result<SearchResult<T>, RepoError>
where
    T: DeserializeOwned,
{
    let query = params.build_query();
    let (offset, limit) = if params.offset().saturating_add(params.page_size) > MAX_SEARCH_WINDOW {
        (0, 0)
    } else {
        (params.offset(), params.page_size)
    };

    let mut command = cmd("FT.SEARCH");
    command.arg(index_name);
    command.arg(&query);
    command.arg("SORTBY").arg(CREATED_AT_MS_FIELD).arg("DESC");
    command.arg("LIMIT").arg(offset).arg(limit);
    command.arg("RETURN").arg(1).arg("$");
    command.arg("DIALECT").arg(2);

    log::debug!("FT.SEARCH {index_name} {query} LIMIT {offset} {limit}");

    let raw: Value = command.query_async(conn).await?;
    let values: Vec<Value> = from_redis_value(&raw).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("Failed to parse search response: {}", err)),
    })?;

    if values.is_empty() {
        return Ok(SearchResult::empty(params));
    }

    let total = match &values[0] {
        Value::Int(v) => *v as u64,
        Value::BulkString(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| RepoError::other("Invalid total count in search response"))?,
        other => {
            return Err(RepoError::other(format!("Unexpected total count type: {:?}", other)));
        }
    };

    // Layout after the total: key, [field, value], key, [field, value], ...
    let mut items = Vec::new();
    let mut idx = 1;
    while idx + 1 < values.len() {
        let json_payload = extract_json_payload(&values[idx + 1])?;
        let item: T = serde_json::from_str(&json_payload).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("Failed to deserialize search document: {}", err)),
        })?;
        items.push(item);
        idx += 2;
    }

    Ok(SearchResult {
        items,
        total,
        page: params.page,
        page_size: params.page_size,
    })
}

fn extract_json_payload(value: &Value) -> Result<String, RepoError> {
    let pairs: Vec<(&Value, &Value)> = match value {
        Value::Array(fields) => fields.chunks(2).filter_map(|pair| Some((pair.first()?, pair.get(1)?))).collect(),
        Value::Map(entries) => entries.iter().map(|(k, v)| (k, v)).collect(),
        other => {
            return Err(RepoError::other(format!("Unexpected search document shape: {:?}", other)));
        }
    };

    for (field, payload) in pairs {
        let field: String = from_redis_value(field).unwrap_or_default();
        if field == "$" {
            return from_redis_value(payload).map_err(|err| RepoError::other(format!("Invalid search payload: {err}")));
        }
    }

    Err(RepoError::other("Search document is missing its JSON payload"))
}

/// Escapes a value for use inside a TAG clause (`@field:{...}`), including
/// whitespace, which would otherwise split the term.
pub fn escape_for_tag_query(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() * 2);
    for ch in value.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            escaped.push(ch);
        } else {
            escaped.push('\\');
            escaped.push(ch);
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_uses_one_based_pages() {
        let params = SearchParams::new().with_page(3, 10);
        assert_eq!(params.offset(), 20);
        let clamped = SearchParams::new().with_page(0, 10);
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.offset(), 0);
    }

    #[test]
    fn offset_saturates_for_huge_pages() {
        let params = SearchParams::new().with_page(i64::MAX as u64, POSTS_PAGE_SIZE);
        assert_eq!(params.offset(), u64::MAX);
        assert!(params.offset().saturating_add(params.page_size) > MAX_SEARCH_WINDOW);
    }

    #[test]
    fn query_pages_are_parsed_leniently() {
        let parse = |value: serde_json::Value| serde_json::from_value::<PostQuery>(value).unwrap().into_params();
        assert_eq!(parse(serde_json::json!({"page": "3"})).page, 3);
        assert_eq!(parse(serde_json::json!({"page": "-4"})).page, 1);
        assert_eq!(parse(serde_json::json!({"page": "abc"})).page, 1);
        assert_eq!(parse(serde_json::json!({})).page, 1);
    }

    #[test]
    fn blank_title_matches_everything() {
        let params = SearchParams::new().with_title_contains("   ");
        assert_eq!(params.title_contains, None);
        assert_eq!(params.build_query(), "*");
        assert!(params.matches_title("Anything"));
    }

    #[test]
    fn title_filter_is_case_insensitive_substring() {
        let params = SearchParams::new().with_title_contains("RUST");
        assert!(params.matches_title("Learning rust the hard way"));
        assert!(params.matches_title("Trustworthy code"));
        assert!(!params.matches_title("Go tips"));
    }

    #[test]
    fn build_query_escapes_tag_syntax() {
        let params = SearchParams::new().with_title_contains("Async IO");
        assert_eq!(params.build_query(), r"@titleFolded:{*async\ io*}");
        assert_eq!(escape_for_tag_query("c++"), r"c\+\+");
        assert_eq!(escape_for_tag_query("a-b.c"), r"a\-b\.c");
    }

    #[test]
    fn post_query_defaults_to_first_page_of_ten() {
        let params = PostQuery::default().into_params();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, POSTS_PAGE_SIZE);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = SearchParams::new();
        assert_eq!(params.total_pages(0), 0);
        assert_eq!(params.total_pages(10), 1);
        assert_eq!(params.total_pages(11), 2);
    }

    #[test]
    fn extracts_payload_from_field_pairs() {
        let doc = Value::Array(vec![
            Value::BulkString(b"$".to_vec()),
            Value::BulkString(br#"{"id":"p1"}"#.to_vec()),
        ]);
        assert_eq!(extract_json_payload(&doc).unwrap(), r#"{"id":"p1"}"#);
    }
}
