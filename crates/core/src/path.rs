//! Document paths
//!
//! A [`DocPath`] addresses one sub-document inside a remote JSON document:
//! object keys (`.field`) and array indices (`[0]`), arbitrarily nested, e.g.
//! `addresses[0].city`. The empty path is the document root.
//!
//! The traversal helpers at the bottom operate directly on
//! `serde_json::Value` and are shared by the in-memory store and the proxy
//! layer. `set_at` creates intermediate containers on the way down; the type
//! of each intermediate (object vs array) follows the next path segment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid array index
    #[error("invalid array index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

/// A segment in a document path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key: `.foo`
    Key(String),
    /// Array index: `[0]`
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, ".{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A path into a JSON document
///
/// | Syntax | Meaning | Example |
/// |--------|---------|---------|
/// | `.key` | Object property | `.user` |
/// | `[n]` | Array index | `[0]` |
/// | (empty) | Root | `` |
///
/// Paths compose with the builder methods: `DocPath::root().key("tags").index(0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DocPath {
    segments: Vec<PathSegment>,
}

impl DocPath {
    /// The root path (empty)
    pub fn root() -> Self {
        DocPath {
            segments: Vec::new(),
        }
    }

    /// Build from a vector of segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        DocPath { segments }
    }

    /// The path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this is the root path (empty)
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a key segment (builder)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// Append an index segment (builder)
    pub fn index(mut self, idx: usize) -> Self {
        self.segments.push(PathSegment::Index(idx));
        self
    }

    /// Push a key segment in place
    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(PathSegment::Key(key.into()));
    }

    /// Push an index segment in place
    pub fn push_index(&mut self, idx: usize) {
        self.segments.push(PathSegment::Index(idx));
    }

    /// Parent path, None at root
    pub fn parent(&self) -> Option<DocPath> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent = self.clone();
            parent.segments.pop();
            Some(parent)
        }
    }

    /// Last segment, None at root
    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// This path extended by another (the other's segments appended)
    pub fn join(&self, tail: &DocPath) -> DocPath {
        let mut segments = self.segments.clone();
        segments.extend_from_slice(&tail.segments);
        DocPath { segments }
    }
}

impl FromStr for DocPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(DocPath::root());
        }

        let chars: Vec<char> = s.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        // Tolerate a leading dot
        if chars[0] == '.' {
            i = 1;
        }

        while i < chars.len() {
            if chars[i] == '.' {
                i += 1;
                if i >= chars.len() {
                    return Err(PathParseError::EmptyKey(i));
                }
            }

            if chars[i] == '[' {
                let start = i;
                i += 1;
                let idx_start = i;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(PathParseError::UnclosedBracket(start));
                }
                let idx_str: String = chars[idx_start..i].iter().collect();
                let idx = idx_str
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidIndex(idx_start, idx_str))?;
                segments.push(PathSegment::Index(idx));
                i += 1;
            } else if chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-' {
                let key_start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-')
                {
                    i += 1;
                }
                segments.push(PathSegment::Key(chars[key_start..i].iter().collect()));
            } else {
                return Err(PathParseError::UnexpectedChar(chars[i], i));
            }
        }

        Ok(DocPath { segments })
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            match seg {
                PathSegment::Key(k) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", k)?;
                }
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
            }
            first = false;
        }
        Ok(())
    }
}

// =============================================================================
// Traversal over serde_json::Value
// =============================================================================

/// Error type for path traversal and mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Type mismatch during traversal
    #[error("type mismatch at path: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected container type
        expected: &'static str,
        /// Actual type found
        found: &'static str,
    },

    /// Array index past the end of the array
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds {
        /// The requested index
        index: usize,
        /// The array length
        len: usize,
    },

    /// Path does not exist
    #[error("path not found")]
    NotFound,
}

/// JSON type name for error messages
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Get a reference to the value at `path`, None if absent or mistyped
pub fn get_at<'a>(root: &'a serde_json::Value, path: &DocPath) -> Option<&'a serde_json::Value> {
    let mut current = root;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), serde_json::Value::Object(obj)) => obj.get(key)?,
            (PathSegment::Index(idx), serde_json::Value::Array(arr)) => arr.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Get a mutable reference to the value at `path`, None if absent or mistyped
pub fn get_at_mut<'a>(
    root: &'a mut serde_json::Value,
    path: &DocPath,
) -> Option<&'a mut serde_json::Value> {
    let mut current = root;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), serde_json::Value::Object(obj)) => obj.get_mut(key)?,
            (PathSegment::Index(idx), serde_json::Value::Array(arr)) => arr.get_mut(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set `value` at `path`, creating intermediate containers as needed
///
/// The kind of each created intermediate follows the next segment: a key
/// segment creates an object, an index segment an array. Appending one past
/// the end of an array is allowed; beyond that is [`PathError::IndexOutOfBounds`].
pub fn set_at(
    root: &mut serde_json::Value,
    path: &DocPath,
    value: serde_json::Value,
) -> Result<(), PathError> {
    let segments = path.segments();
    if segments.is_empty() {
        *root = value;
        return Ok(());
    }

    let (parent_segments, last) = segments.split_at(segments.len() - 1);
    let last = &last[0];
    let mut current = root;

    for (i, segment) in parent_segments.iter().enumerate() {
        let next = &segments[i + 1];
        match segment {
            PathSegment::Key(key) => {
                if current.is_null() {
                    *current = serde_json::Value::Object(serde_json::Map::new());
                }
                if !current.is_object() {
                    return Err(PathError::TypeMismatch {
                        expected: "object",
                        found: json_type_name(current),
                    });
                }
                let obj = current.as_object_mut().expect("checked is_object");
                if !obj.contains_key(key) {
                    let container = match next {
                        PathSegment::Key(_) => serde_json::Value::Object(serde_json::Map::new()),
                        PathSegment::Index(_) => serde_json::Value::Array(Vec::new()),
                    };
                    obj.insert(key.clone(), container);
                }
                current = obj.get_mut(key).expect("just inserted");
            }
            PathSegment::Index(idx) => {
                if !current.is_array() {
                    return Err(PathError::TypeMismatch {
                        expected: "array",
                        found: json_type_name(current),
                    });
                }
                let arr = current.as_array_mut().expect("checked is_array");
                if *idx >= arr.len() {
                    return Err(PathError::IndexOutOfBounds {
                        index: *idx,
                        len: arr.len(),
                    });
                }
                current = &mut arr[*idx];
            }
        }
    }

    match last {
        PathSegment::Key(key) => {
            if current.is_null() {
                *current = serde_json::Value::Object(serde_json::Map::new());
            }
            if !current.is_object() {
                return Err(PathError::TypeMismatch {
                    expected: "object",
                    found: json_type_name(current),
                });
            }
            let obj = current.as_object_mut().expect("checked is_object");
            obj.insert(key.clone(), value);
            Ok(())
        }
        PathSegment::Index(idx) => {
            if !current.is_array() {
                return Err(PathError::TypeMismatch {
                    expected: "array",
                    found: json_type_name(current),
                });
            }
            let arr = current.as_array_mut().expect("checked is_array");
            if *idx < arr.len() {
                arr[*idx] = value;
                Ok(())
            } else if *idx == arr.len() {
                arr.push(value);
                Ok(())
            } else {
                Err(PathError::IndexOutOfBounds {
                    index: *idx,
                    len: arr.len(),
                })
            }
        }
    }
}

/// Delete the value at `path`, returning it
///
/// Object keys are removed; array elements are removed with subsequent
/// elements shifting down. Returns `Ok(None)` when the path does not exist.
/// Deleting the root replaces the document with null.
pub fn delete_at(
    root: &mut serde_json::Value,
    path: &DocPath,
) -> Result<Option<serde_json::Value>, PathError> {
    if path.is_root() {
        return Ok(Some(std::mem::take(root)));
    }

    let parent_path = path.parent().ok_or(PathError::NotFound)?;
    let parent = match get_at_mut(root, &parent_path) {
        Some(parent) => parent,
        None => return Ok(None),
    };

    match path.last_segment().expect("non-root path has a last segment") {
        PathSegment::Key(key) => match parent {
            serde_json::Value::Object(obj) => Ok(obj.remove(key)),
            other => Err(PathError::TypeMismatch {
                expected: "object",
                found: json_type_name(other),
            }),
        },
        PathSegment::Index(idx) => match parent {
            serde_json::Value::Array(arr) => {
                if *idx < arr.len() {
                    Ok(Some(arr.remove(*idx)))
                } else {
                    Ok(None)
                }
            }
            other => Err(PathError::TypeMismatch {
                expected: "array",
                found: json_type_name(other),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_display() {
        let path = DocPath::root().key("addresses").index(0).key("city");
        assert_eq!(path.to_string(), "addresses[0].city");
    }

    #[test]
    fn test_path_parse_round_trip() {
        let path: DocPath = "addresses[0].city".parse().unwrap();
        assert_eq!(
            path,
            DocPath::root().key("addresses").index(0).key("city")
        );
        assert_eq!(path.to_string(), "addresses[0].city");
    }

    #[test]
    fn test_path_parse_root() {
        let path: DocPath = "".parse().unwrap();
        assert!(path.is_root());
    }

    #[test]
    fn test_path_parse_leading_dot() {
        let path: DocPath = ".name".parse().unwrap();
        assert_eq!(path, DocPath::root().key("name"));
    }

    #[test]
    fn test_path_parse_errors() {
        assert!("tags[".parse::<DocPath>().is_err());
        assert!("tags[x]".parse::<DocPath>().is_err());
        assert!("tags.".parse::<DocPath>().is_err());
        assert!("ta gs".parse::<DocPath>().is_err());
    }

    #[test]
    fn test_path_join() {
        let base = DocPath::root().key("address");
        let tail = DocPath::root().key("city");
        assert_eq!(base.join(&tail).to_string(), "address.city");
    }

    #[test]
    fn test_get_at_nested() {
        let doc = json!({"user": {"scores": [100, 95]}});
        let path: DocPath = "user.scores[1]".parse().unwrap();
        assert_eq!(get_at(&doc, &path), Some(&json!(95)));
        assert_eq!(get_at(&doc, &DocPath::root()), Some(&doc));
        assert!(get_at(&doc, &"user.missing".parse().unwrap()).is_none());
    }

    #[test]
    fn test_set_at_creates_intermediates() {
        let mut doc = json!({});
        set_at(&mut doc, &"user.profile.name".parse().unwrap(), json!("Alice")).unwrap();
        assert_eq!(doc, json!({"user": {"profile": {"name": "Alice"}}}));
    }

    #[test]
    fn test_set_at_array_append_edge() {
        let mut doc = json!({"tags": ["a"]});
        set_at(&mut doc, &"tags[1]".parse().unwrap(), json!("b")).unwrap();
        assert_eq!(doc, json!({"tags": ["a", "b"]}));

        let err = set_at(&mut doc, &"tags[5]".parse().unwrap(), json!("x")).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfBounds { index: 5, .. }));
    }

    #[test]
    fn test_set_at_root_replaces() {
        let mut doc = json!({"a": 1});
        set_at(&mut doc, &DocPath::root(), json!(42)).unwrap();
        assert_eq!(doc, json!(42));
    }

    #[test]
    fn test_set_at_type_mismatch() {
        let mut doc = json!({"name": "Alice"});
        let err = set_at(&mut doc, &"name.inner".parse().unwrap(), json!(1)).unwrap_err();
        assert!(matches!(err, PathError::TypeMismatch { .. }));
    }

    #[test]
    fn test_delete_at_object_key() {
        let mut doc = json!({"name": "Alice", "age": 30});
        let removed = delete_at(&mut doc, &"name".parse().unwrap()).unwrap();
        assert_eq!(removed, Some(json!("Alice")));
        assert_eq!(doc, json!({"age": 30}));
    }

    #[test]
    fn test_delete_at_array_shifts() {
        let mut doc = json!([1, 2, 3]);
        delete_at(&mut doc, &"[1]".parse().unwrap()).unwrap();
        assert_eq!(doc, json!([1, 3]));
    }

    #[test]
    fn test_delete_at_missing_is_none() {
        let mut doc = json!({"a": 1});
        assert_eq!(delete_at(&mut doc, &"b".parse().unwrap()).unwrap(), None);
        assert_eq!(
            delete_at(&mut doc, &"b.c".parse().unwrap()).unwrap(),
            None
        );
    }
}
