//! Typed dot-paths and the path accessor/mutator.
//!
//! The string form (`config.resources.2.username`) only exists at the widget
//! boundary. Inside the engine a [`Path`] is an ordered list of segments,
//! where an all-digit segment addresses an array element.
//!
//! [`set`] never mutates its input: containers on the path are copied, all
//! sibling subtrees are shared with the original tree. Depth is unbounded.
//! Paths that do not fit the tree fail with a [`FormError`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FormError;
use crate::node::{Node, Object};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        let canonical = raw == "0" || !raw.starts_with('0');
        if canonical && !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = raw.parse() {
                return Segment::Index(index);
            }
        }
        Segment::Key(raw.to_string())
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Address of a node inside a tree. The empty path is the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn new(segments: impl Into<Vec<Segment>>) -> Self {
        Path(segments.into())
    }

    pub fn parse(input: &str) -> Result<Self, FormError> {
        if input.is_empty() {
            return Ok(Path::root());
        }
        input
            .split('.')
            .map(|raw| {
                if raw.is_empty() {
                    Err(FormError::InvalidPath {
                        input: input.to_string(),
                        reason: "empty segment",
                    })
                } else {
                    Ok(Segment::parse(raw))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Path)
    }

    /// Append a field segment (builder style).
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(Segment::Key(key.into()));
        self
    }

    /// Append an array index segment (builder style).
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(Segment::Index(index));
        self
    }

    pub fn join(&self, other: &Path) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Path(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn parent(&self) -> Option<Path> {
        self.0.split_last().map(|(_, rest)| Path(rest.to_vec()))
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        self.0.strip_prefix(prefix.0.as_slice()).map(|rest| Path(rest.to_vec()))
    }

    /// Copy of this path with the segment at `pos` replaced.
    pub fn with_segment(&self, pos: usize, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        if let Some(slot) = segments.get_mut(pos) {
            *slot = segment;
        }
        Path(segments)
    }

    fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Path::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Read the node at `path`. Index segments on objects are treated as keys.
pub fn get<'a>(tree: &'a Node, path: &Path) -> Option<&'a Node> {
    path.segments()
        .iter()
        .try_fold(tree, |node, segment| match (node, segment) {
            (Node::Object(map), Segment::Key(k)) => map.get(k),
            (Node::Object(map), Segment::Index(i)) => map.get(&i.to_string()),
            (Node::Array(items), Segment::Index(i)) => items.get(*i),
            _ => None,
        })
}

/// Return a new tree with `value` stored at `path`; `None` deletes the key.
///
/// Missing intermediate objects are created. Indexing past the end of an
/// array, indexing a missing array, or walking through a scalar is an error.
pub fn set(tree: &Node, path: &Path, value: Option<Node>) -> Result<Node, FormError> {
    if path.is_root() {
        return value.ok_or_else(|| FormError::EmptyPath(path.clone()));
    }
    set_at(tree, path, 0, value)
}

fn set_at(node: &Node, path: &Path, depth: usize, value: Option<Node>) -> Result<Node, FormError> {
    let segment = &path.segments()[depth];
    let is_leaf = depth + 1 == path.len();

    match node {
        Node::Object(_) | Node::Null => {
            let key = match segment {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => i.to_string(),
            };
            let mut map: Object = node.as_object().cloned().unwrap_or_default();
            if is_leaf {
                match value {
                    Some(v) => {
                        map.insert(key, v);
                    }
                    None => {
                        map.remove(&key);
                    }
                }
            } else {
                let child = match map.get(&key) {
                    Some(child) => child.clone(),
                    None => missing_child(path, depth + 1)?,
                };
                let updated = set_at(&child, path, depth + 1, value)?;
                map.insert(key, updated);
            }
            Ok(Node::Object(Arc::new(map)))
        }
        Node::Array(items) => {
            let Segment::Index(index) = segment else {
                return Err(FormError::NotAContainer {
                    path: path.prefix(depth),
                    found: "array (field segment)",
                });
            };
            if *index >= items.len() {
                return Err(FormError::IndexOutOfRange {
                    path: path.prefix(depth),
                    index: *index,
                    len: items.len(),
                });
            }
            let mut copy: Vec<Node> = items.as_ref().clone();
            if is_leaf {
                copy[*index] = value.ok_or_else(|| FormError::UnsetArrayElement(path.clone()))?;
            } else {
                copy[*index] = set_at(&items[*index], path, depth + 1, value)?;
            }
            Ok(Node::Array(Arc::new(copy)))
        }
        scalar => Err(FormError::NotAContainer {
            path: path.prefix(depth),
            found: scalar.kind(),
        }),
    }
}

/// Placeholder for a missing intermediate node: objects are created on
/// demand, arrays are not (there is no element to index into).
fn missing_child(path: &Path, next: usize) -> Result<Node, FormError> {
    match &path.segments()[next] {
        Segment::Key(_) => Ok(Node::empty_object()),
        Segment::Index(index) => Err(FormError::IndexOutOfRange {
            path: path.prefix(next),
            index: *index,
            len: 0,
        }),
    }
}
