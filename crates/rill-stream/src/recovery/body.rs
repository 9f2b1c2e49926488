//! Directive body parsing with bounded backoff and a parsed-body cache.

use std::collections::{HashMap, VecDeque};

use serde_json::{Map, Value};

/// Insertion-ordered attribute map of a directive.
pub type Attributes = Map<String, Value>;

/// Trailing lines dropped, one at a time, before giving up on a body.
const MAX_BACKOFF_LINES: usize = 5;

/// Error parsing a directive body.
#[derive(Debug, thiserror::Error)]
pub enum BodyParseError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parse a body as a YAML mapping.
///
/// Returns `Ok(None)` for valid YAML that is not a mapping (a bare scalar
/// while the first key is still arriving, or an empty body). Tags are
/// dropped in favor of the tagged value and non-string keys are rendered
/// as text.
///
/// # Errors
///
/// Returns an error if the text is not valid YAML.
pub fn parse_body(body: &str) -> Result<Option<Attributes>, BodyParseError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    match yaml_to_json(serde_yaml::from_str(body)?) {
        Value::Object(map) => Ok(Some(map)),
        _ => Ok(None),
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => yaml_number(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        // NaN and infinities have no JSON form.
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match yaml_to_json(key) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Outcome of [`recover`].
#[derive(Debug)]
pub(crate) enum Recovered {
    /// The body (or a prefix of it) parsed as a mapping.
    Parsed(Attributes),
    /// The body is valid but has no mapping yet; keep the fallback.
    NotMapping,
    /// Every candidate failed; carries the error from the full body.
    Failed(BodyParseError),
}

/// Parse `body`, dropping up to five trailing lines until a prefix parses.
///
/// Blank candidates are skipped without consuming a parse.
pub(crate) fn recover(body: &str) -> Recovered {
    let error = match parse_body(body) {
        Ok(Some(map)) => return Recovered::Parsed(map),
        Ok(None) => return Recovered::NotMapping,
        Err(e) => e,
    };

    let mut lines: Vec<&str> = body.split('\n').collect();
    for _ in 0..MAX_BACKOFF_LINES {
        if lines.pop().is_none() {
            break;
        }
        let candidate = lines.join("\n");
        if candidate.trim().is_empty() {
            continue;
        }
        match parse_body(&candidate) {
            Ok(Some(map)) => return Recovered::Parsed(map),
            Ok(None) => return Recovered::NotMapping,
            Err(_) => {}
        }
    }

    Recovered::Failed(error)
}

/// Least-recently-used cache of successfully parsed bodies, keyed by the
/// exact body text.
#[derive(Debug)]
pub(crate) struct BodyCache {
    capacity: usize,
    entries: HashMap<String, Attributes>,
    order: VecDeque<String>,
}

impl BodyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, body: &str) -> Option<&Attributes> {
        if !self.entries.contains_key(body) {
            return None;
        }
        self.touch(body);
        self.entries.get(body)
    }

    pub fn insert(&mut self, body: &str, attributes: Attributes) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(body.to_owned(), attributes).is_some() {
            self.touch(body);
            return;
        }

        self.order.push_back(body.to_owned());
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn touch(&mut self, body: &str) {
        if let Some(index) = self.order.iter().position(|key| key == body) {
            if let Some(key) = self.order.remove(index) {
                self.order.push_back(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_parse_simple_body() {
        let attrs = parse_body("title: Revenue\nvalue: 42").unwrap().unwrap();
        assert_eq!(attrs, map(json!({"title": "Revenue", "value": 42})));
    }

    #[test]
    fn test_parse_nested_body() {
        let attrs = parse_body("chart:\n  type: bar\n  series:\n    - 1\n    - 2")
            .unwrap()
            .unwrap();
        assert_eq!(
            attrs,
            map(json!({"chart": {"type": "bar", "series": [1, 2]}}))
        );
    }

    #[test]
    fn test_parse_preserves_key_order() {
        let attrs = parse_body("zeta: 1\nalpha: 2\nmid: 3").unwrap().unwrap();
        let keys: Vec<&str> = attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_scalar_is_not_mapping() {
        assert!(parse_body("ti").unwrap().is_none());
        assert!(parse_body("").unwrap().is_none());
        assert!(parse_body("  \n").unwrap().is_none());
    }

    #[test]
    fn test_parse_drops_tags() {
        let attrs = parse_body("a: !tag x\nitems: !list [1, 2]").unwrap().unwrap();
        assert_eq!(attrs, map(json!({"a": "x", "items": [1, 2]})));
    }

    #[test]
    fn test_parse_non_string_keys() {
        let attrs = parse_body("1: one\ntrue: two\n? [x, y]\n: three\nratio: 0.5")
            .unwrap()
            .unwrap();
        let keys: Vec<&str> = attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1", "true", r#"["x","y"]"#, "ratio"]);
        assert_eq!(attrs["ratio"], json!(0.5));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = parse_body("a: 1\nb: [").unwrap_err();
        assert!(err.to_string().starts_with("invalid YAML"));
    }

    #[test]
    fn test_recover_drops_broken_tail() {
        let Recovered::Parsed(attrs) = recover("a: 1\nb: [") else {
            panic!("expected prefix to parse");
        };
        assert_eq!(attrs, map(json!({"a": 1})));
    }

    #[test]
    fn test_recover_skips_blank_candidates() {
        let Recovered::Parsed(attrs) = recover("a: 1\n\n\nb: [") else {
            panic!("expected prefix to parse");
        };
        assert_eq!(attrs, map(json!({"a": 1})));
    }

    #[test]
    fn test_recover_gives_up_after_five_lines() {
        let body = "a: [\nx\ny\nz\nw\nv\nu";
        assert!(matches!(recover(body), Recovered::Failed(_)));
    }

    #[test]
    fn test_recover_not_mapping() {
        assert!(matches!(recover("partial"), Recovered::NotMapping));
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut cache = BodyCache::new(2);
        cache.insert("a", map(json!({"a": 1})));
        cache.insert("b", map(json!({"b": 1})));
        assert!(cache.get("a").is_some());

        cache.insert("c", map(json!({"c": 1})));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_cache_reinsert_does_not_grow() {
        let mut cache = BodyCache::new(2);
        cache.insert("a", map(json!({"a": 1})));
        cache.insert("a", map(json!({"a": 2})));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(&map(json!({"a": 2}))));
    }

    #[test]
    fn test_cache_zero_capacity_stores_nothing() {
        let mut cache = BodyCache::new(0);
        cache.insert("a", Attributes::new());
        assert_eq!(cache.len(), 0);
    }
}
