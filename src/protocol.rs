//! Tuya cloud wire protocol.
//! Handles query canonicalisation, string-to-sign construction, the signed
//! header set and the JSON response envelope.

use crate::config::Config;
use crate::crypto::{content_hash, sign};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SIGN_METHOD: &str = "HMAC-SHA256";
pub const TOKEN_PATH: &str = "/v1.0/token?grant_type=1";

pub const HEADER_T: &str = "t";
pub const HEADER_SIGN_METHOD: &str = "sign_method";
pub const HEADER_CLIENT_ID: &str = "client_id";
pub const HEADER_SIGN: &str = "sign";
pub const HEADER_ACCESS_TOKEN: &str = "access_token";

/// Body sent (and hashed) when a call carries no payload.
pub const EMPTY_BODY: &str = "{}";

/// Standard envelope returned by every Tuya OpenAPI endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
}

impl ApiResponse {
    /// Server supplied failure message, `"undefined"` when the server sent none.
    pub fn message(&self) -> String {
        self.msg.clone().unwrap_or_else(|| "undefined".to_string())
    }
}

/// `result` payload of the token handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expire_time: Option<u64>,
    #[serde(default)]
    pub uid: Option<String>,
}

/// Headers attached to a token-authenticated call, plus the canonical path
/// the call must be issued against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedHeaders {
    pub t: String,
    pub path: String,
    pub client_id: String,
    pub sign: String,
    pub sign_method: &'static str,
    pub access_token: String,
}

impl SignedHeaders {
    /// Wire headers in the order the API documents them. `path` is not a header.
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (HEADER_T, self.t.clone()),
            (HEADER_SIGN_METHOD, self.sign_method.to_string()),
            (HEADER_CLIENT_ID, self.client_id.clone()),
            (HEADER_SIGN, self.sign.clone()),
            (HEADER_ACCESS_TOKEN, self.access_token.clone()),
        ]
    }
}

/// `METHOD\nCONTENT_SHA256\n<signed headers, always empty>\nURL`
pub fn string_to_sign(method: &str, content_hash: &str, url: &str) -> String {
    [method, content_hash, "", url].join("\n")
}

/// Headers for the token handshake: `t`, `sign_method`, `client_id`, `sign`.
pub fn token_headers(
    config: &Config,
    timestamp: &str,
) -> Result<Vec<(&'static str, String)>> {
    let to_sign = string_to_sign("GET", &content_hash(b""), TOKEN_PATH);
    let signature = sign(
        config.secret(),
        &format!("{}{}{}", config.access_key, timestamp, to_sign),
    )?;
    Ok(vec![
        (HEADER_T, timestamp.to_string()),
        (HEADER_SIGN_METHOD, SIGN_METHOD.to_string()),
        (HEADER_CLIENT_ID, config.access_key.clone()),
        (HEADER_SIGN, signature),
    ])
}

/// Signs a token-authenticated call.
///
/// `body` must be the exact serialized bytes that will be sent.
pub fn sign_request(
    config: &Config,
    token: &str,
    timestamp: &str,
    path: &str,
    method: &str,
    query: &BTreeMap<String, String>,
    body: &str,
) -> Result<SignedHeaders> {
    let url = canonical_url(path, query);
    let to_sign = string_to_sign(method, &content_hash(body.as_bytes()), &url);
    let signature = sign(
        config.secret(),
        &format!("{}{}{}{}", config.access_key, token, timestamp, to_sign),
    )?;

    Ok(SignedHeaders {
        t: timestamp.to_string(),
        path: url,
        client_id: config.access_key.clone(),
        sign: signature,
        sign_method: SIGN_METHOD,
        access_token: token.to_string(),
    })
}

/// Deepest bracket nesting parsed from a query key; the rest stays literal.
const MAX_KEY_DEPTH: usize = 5;
/// Largest bracket index still treated as an array position.
const MAX_ARRAY_INDEX: usize = 20;

/// A decoded query value: `k=v`, `k[]=v` / `k[0]=v`, or `k[name]=v`.
#[derive(Debug, Clone, PartialEq)]
enum QueryNode {
    Value(String),
    List(BTreeMap<usize, QueryNode>),
    Map(Vec<(String, QueryNode)>),
}

/// Rebuilds `path` with its query parameters merged with `query`, sorted by
/// top-level key and rendered without percent-encoding.
pub fn canonical_url(path: &str, query: &BTreeMap<String, String>) -> String {
    let mut parts = path.split('?');
    let uri = parts.next().unwrap_or_default();
    let path_query = parts.next().unwrap_or_default();

    // Compatibility shim: values are looked up in the caller's query after
    // the path parameters were merged into it in place (path keys win), so
    // every sorted key resolves. Keys that end up without a value are skipped.
    let mut merged: BTreeMap<String, QueryNode> = query
        .iter()
        .map(|(k, v)| (k.clone(), QueryNode::Value(v.clone())))
        .collect();
    for (key, node) in parse_query(path_query) {
        merged.insert(key, node);
    }

    let mut pairs = Vec::new();
    for (key, node) in &merged {
        render_node(key, node, &mut pairs);
    }
    let canonical = pairs.join("&");
    if canonical.is_empty() {
        uri.to_string()
    } else {
        format!("{}?{}", uri, canonical)
    }
}

/// Form-decodes a query string into top-level keys, expanding bracketed
/// keys into nested lists and maps and combining repeated keys.
fn parse_query(query: &str) -> BTreeMap<String, QueryNode> {
    let mut params: BTreeMap<String, QueryNode> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        let (root, segments) = split_key(&key);
        let node = build_node(&segments, value.into_owned());
        let node = match params.remove(&root) {
            Some(existing) => merge_nodes(existing, node),
            None => node,
        };
        params.insert(root, node);
    }
    params
}

/// Next `[...]` group at or after `from` that contains no nested bracket.
fn next_group(key: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = key.as_bytes();
    let mut open = None;
    for (i, b) in bytes.iter().enumerate().skip(from) {
        match b {
            b'[' => open = Some(i),
            b']' => {
                if let Some(start) = open {
                    return Some((start, i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits `a[b][]` into the root `a` and the segments `["b", ""]`.
fn split_key(key: &str) -> (String, Vec<String>) {
    let Some((first, _)) = next_group(key, 0) else {
        return (key.to_string(), Vec::new());
    };

    let mut segments = Vec::new();
    let mut pos = first;
    while let Some((start, end)) = next_group(key, pos) {
        if segments.len() == MAX_KEY_DEPTH + usize::from(first == 0) {
            segments.push(key[start..].to_string());
            break;
        }
        segments.push(key[start + 1..end - 1].to_string());
        pos = end;
    }

    if first == 0 {
        let root = segments.remove(0);
        (root, segments)
    } else {
        (key[..first].to_string(), segments)
    }
}

fn array_index(segment: &str) -> Option<usize> {
    let index: usize = segment.parse().ok()?;
    (index.to_string() == segment && index <= MAX_ARRAY_INDEX).then_some(index)
}

fn build_node(segments: &[String], value: String) -> QueryNode {
    let mut node = QueryNode::Value(value);
    for segment in segments.iter().rev() {
        node = if segment.is_empty() {
            QueryNode::List(BTreeMap::from([(0, node)]))
        } else if let Some(index) = array_index(segment) {
            QueryNode::List(BTreeMap::from([(index, node)]))
        } else {
            QueryNode::Map(vec![(segment.clone(), node)])
        };
    }
    node
}

fn list_to_map(list: BTreeMap<usize, QueryNode>) -> Vec<(String, QueryNode)> {
    list.into_iter().map(|(i, n)| (i.to_string(), n)).collect()
}

fn merge_into_map(
    mut target: Vec<(String, QueryNode)>,
    source: Vec<(String, QueryNode)>,
) -> QueryNode {
    for (key, node) in source {
        match target.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                let existing = std::mem::replace(&mut target[pos].1, QueryNode::Map(Vec::new()));
                target[pos].1 = merge_nodes(existing, node);
            }
            None => target.push((key, node)),
        }
    }
    QueryNode::Map(target)
}

/// Combines two values parsed for the same key.
fn merge_nodes(target: QueryNode, source: QueryNode) -> QueryNode {
    use QueryNode::{List, Map, Value};

    match (target, source) {
        (Value(a), Value(b)) => List(BTreeMap::from([(0, Value(a)), (1, Value(b))])),
        (Value(a), List(items)) => {
            let mut list = BTreeMap::from([(0, Value(a))]);
            for item in items.into_values() {
                list.insert(list.len(), item);
            }
            List(list)
        }
        (Value(a), map @ Map(_)) => List(BTreeMap::from([(0, Value(a)), (1, map)])),
        (List(mut list), Value(b)) => {
            let next = list.keys().next_back().map_or(0, |k| k + 1);
            list.insert(next, Value(b));
            List(list)
        }
        (List(mut list), List(items)) => {
            for (index, item) in items {
                match list.remove(&index) {
                    None => {
                        list.insert(index, item);
                    }
                    Some(existing @ (List(_) | Map(_))) if !matches!(item, Value(_)) => {
                        list.insert(index, merge_nodes(existing, item));
                    }
                    Some(existing) => {
                        list.insert(index, existing);
                        let next = list.keys().next_back().map_or(0, |k| k + 1);
                        list.insert(next, item);
                    }
                }
            }
            List(list)
        }
        (List(list), Map(entries)) => merge_into_map(list_to_map(list), entries),
        (Map(mut entries), Value(b)) => {
            if !entries.iter().any(|(k, _)| *k == b) {
                entries.push((b, Value("true".to_string())));
            }
            Map(entries)
        }
        (Map(entries), List(items)) => merge_into_map(entries, list_to_map(items)),
        (Map(entries), Map(other)) => merge_into_map(entries, other),
    }
}

/// Renders a node the way the form serializer does: lists by position
/// (`k[0]`), maps by name (`k[name]`) with integer-like names first.
fn render_node(prefix: &str, node: &QueryNode, pairs: &mut Vec<String>) {
    match node {
        QueryNode::Value(value) => pairs.push(format!("{}={}", prefix, value)),
        QueryNode::List(items) => {
            for (position, item) in items.values().enumerate() {
                render_node(&format!("{}[{}]", prefix, position), item, pairs);
            }
        }
        QueryNode::Map(entries) => {
            let mut indexed: Vec<(u32, &QueryNode)> = Vec::new();
            let mut named: Vec<(&str, &QueryNode)> = Vec::new();
            for (key, item) in entries {
                match key.parse::<u32>() {
                    Ok(i) if i.to_string() == *key && i != u32::MAX => indexed.push((i, item)),
                    _ => named.push((key.as_str(), item)),
                }
            }
            indexed.sort_by_key(|(i, _)| *i);
            for (i, item) in indexed {
                render_node(&format!("{}[{}]", prefix, i), item, pairs);
            }
            for (key, item) in named {
                render_node(&format!("{}[{}]", prefix, key), item, pairs);
            }
        }
    }
}
