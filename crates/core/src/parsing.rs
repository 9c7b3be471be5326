use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Deepest nesting the object search will descend into.
pub const MAX_SEARCH_DEPTH: usize = 32;
/// Upper bound on nodes visited by a single object search.
pub const MAX_VISITED_NODES: usize = 4096;

/// Matches a Clarity tuple entry such as `(id u42)`.
static CLARITY_ID_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*id\s+u([0-9]+)\s*\)").expect("valid id pattern"));

pub fn compute_sha256_hex(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    let bytes = hasher.finalize();
    hex::encode(bytes)
}

/// Canonical decimal form of a Clarity `uint` literal body (`42`, `0042`).
fn canonical_uint(digits: &str) -> Option<String> {
    digits.parse::<u128>().ok().map(|n| n.to_string())
}

/// Compare two secrets without exiting early on the first differing byte.
/// Both sides are hashed first so their lengths do not leak either.
pub fn secrets_match(given: &str, expected: &str) -> bool {
    let a = Sha256::digest(given.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extract the innermost `id` field from a Clarity value repr, e.g.
/// `(ok (tuple (id u42)))`. With several `id` entries the most deeply nested
/// one wins; among equally deep entries the first does.
pub fn clarity_id(repr: &str) -> Option<String> {
    let mut best: Option<(usize, &str)> = None;
    for caps in CLARITY_ID_FIELD.captures_iter(repr) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let depth = paren_depth(&repr[..whole.start()]);
        if best.map_or(true, |(d, _)| depth > d) {
            best = Some((depth, digits.as_str()));
        }
    }
    best.and_then(|(_, digits)| canonical_uint(digits))
}

fn paren_depth(prefix: &str) -> usize {
    prefix.chars().fold(0usize, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth.saturating_sub(1),
        _ => depth,
    })
}

/// True for a Clarity `(err ...)` response repr.
pub fn is_clarity_err(repr: &str) -> bool {
    repr.trim_start().starts_with("(err")
}

/// Interpret a value as a non-negative integer: `42`, `"42"`, `"u42"`, or a
/// carrier object like `{"type": "uint", "value": "42"}`.
pub fn integer_like(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            canonical_uint(s.strip_prefix('u').unwrap_or(s))
        }
        Value::Object(map) => ["value", "u"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(integer_like),
        _ => None,
    }
}

/// Best-effort search for an integer-like field named `id` anywhere in a
/// decoded value. Strings met along the way are tried as Clarity reprs.
pub fn find_id_field(value: &Value) -> Option<String> {
    let mut budget = MAX_VISITED_NODES;
    search_id(value, 0, &mut budget)
}

fn search_id(value: &Value, depth: usize, budget: &mut usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH || *budget == 0 {
        return None;
    }
    *budget -= 1;

    match value {
        Value::Object(map) => {
            if let Some(id) = map.get("id").and_then(integer_like) {
                return Some(id);
            }
            map.values()
                .find_map(|child| search_id(child, depth + 1, budget))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| search_id(item, depth + 1, budget)),
        Value::String(s) if is_clarity_err(s) => None,
        Value::String(s) => clarity_id(s),
        _ => None,
    }
}
