//! Dotted paths into `serde_json::Value` trees
//!
//! A path such as `user.tags.0` addresses object keys and array indices.
//! Numeric segments index arrays; against an object they are used as keys.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while writing through a path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Cannot descend into {kind} at '{at}'")]
    NotAContainer { at: String, kind: &'static str },

    #[error("Array index {index} out of bounds (len {len}) at '{at}'")]
    IndexOutOfBounds { at: String, index: usize, len: usize },

    #[error("Segment '{segment}' is not a valid array index at '{at}'")]
    NotAnIndex { at: String, segment: String },
}

/// One step of a [`ValuePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::Key(raw.to_string()),
        }
    }

    fn as_key(&self) -> String {
        match self {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// A path into a value tree. The empty path addresses the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ValuePath {
    segments: Vec<PathSegment>,
}

impl ValuePath {
    /// The root path
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path. Empty segments are ignored.
    pub fn parse(dotted: &str) -> Self {
        Self {
            segments: dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(PathSegment::parse)
                .collect(),
        }
    }

    /// Build from raw segments, e.g. a module path
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(|s| PathSegment::parse(s.as_ref()))
                .collect(),
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path without its last segment, plus that segment
    pub fn split_last(&self) -> Option<(ValuePath, &PathSegment)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            ValuePath {
                segments: parent.to_vec(),
            },
            last,
        ))
    }

    /// Read the value at this path
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match (current, segment) {
                (Value::Object(map), segment) => map.get(&segment.as_key()),
                (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
                _ => None,
            })
    }

    /// Mutable access to the value at this path
    pub fn get_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match (current, segment) {
                (Value::Object(map), segment) => map.get_mut(&segment.as_key())?,
                (Value::Array(items), PathSegment::Index(index)) => items.get_mut(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at this path, creating intermediate objects for missing
    /// keys. Returns the value previously stored there.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<Option<Value>, PathError> {
        let Some((parent_path, last)) = self.split_last() else {
            return Ok(Some(std::mem::replace(root, value)));
        };

        let parent = parent_path.descend_creating(root)?;
        match parent {
            Value::Object(map) => Ok(map.insert(last.as_key(), value)),
            Value::Array(items) => {
                let index = match last {
                    PathSegment::Index(index) => *index,
                    PathSegment::Key(key) => {
                        return Err(PathError::NotAnIndex {
                            at: parent_path.to_string(),
                            segment: key.clone(),
                        })
                    }
                };
                if index < items.len() {
                    Ok(Some(std::mem::replace(&mut items[index], value)))
                } else if index == items.len() {
                    items.push(value);
                    Ok(None)
                } else {
                    Err(PathError::IndexOutOfBounds {
                        at: parent_path.to_string(),
                        index,
                        len: items.len(),
                    })
                }
            }
            other => Err(PathError::NotAContainer {
                at: parent_path.to_string(),
                kind: kind_of(other),
            }),
        }
    }

    /// Remove the value at this path. Removing the root resets it to null.
    pub fn remove(&self, root: &mut Value) -> Option<Value> {
        let Some((parent_path, last)) = self.split_last() else {
            return Some(std::mem::replace(root, Value::Null));
        };

        match (parent_path.get_mut(root)?, last) {
            (Value::Object(map), segment) => map.remove(&segment.as_key()),
            (Value::Array(items), PathSegment::Index(index)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }

    fn descend_creating<'a>(&self, root: &'a mut Value) -> Result<&'a mut Value, PathError> {
        let mut current = root;
        for (depth, segment) in self.segments.iter().enumerate() {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            let at = || ValuePath {
                segments: self.segments[..depth].to_vec(),
            }
            .to_string();
            current = match current {
                Value::Object(map) => map
                    .entry(segment.as_key())
                    .or_insert_with(|| Value::Object(Map::new())),
                Value::Array(items) => match segment {
                    PathSegment::Index(index) => {
                        let len = items.len();
                        items.get_mut(*index).ok_or(PathError::IndexOutOfBounds {
                            at: at(),
                            index: *index,
                            len,
                        })?
                    }
                    PathSegment::Key(key) => {
                        return Err(PathError::NotAnIndex {
                            at: at(),
                            segment: key.clone(),
                        })
                    }
                },
                other => {
                    return Err(PathError::NotAContainer {
                        at: at(),
                        kind: kind_of(other),
                    })
                }
            };
        }
        Ok(current)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", joined.join("."))
    }
}

impl From<&str> for ValuePath {
    fn from(dotted: &str) -> Self {
        ValuePath::parse(dotted)
    }
}

impl Serialize for ValuePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ValuePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Dotted(String),
            Segments(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Dotted(dotted) => ValuePath::parse(&dotted),
            Repr::Segments(segments) => ValuePath::from_segments(segments),
        })
    }
}
