// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Depth-bounded traversal of a JSON document.
//!
//! [`walk`] yields every node of a document in depth-first, document order.
//! Containers are yielded before their children, so a consumer can print a
//! heading line for an object and then its members. Descent stops at the
//! recursion limit: a node at depth `limit` is still yielded, its children
//! are not.
//!
//! # Example
//!
//! ```
//! use bmw_cardata::walker::leaves;
//! use serde_json::json;
//!
//! let doc = json!({"session": {"mileage": 12345, "mileageUnits": "KM"}});
//! let paths: Vec<String> = leaves(&doc, None).map(|n| n.path.to_string()).collect();
//!
//! assert_eq!(paths, ["session.mileage", "session.mileageUnits"]);
//! ```

use serde_json::Value;
use std::fmt;

/// One step from a container to one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// Member of an object.
    Key(&'a str),
    /// Element of an array.
    Index(usize),
}

/// Location of a node relative to the document root.
///
/// Displayed as dotted keys with bracketed indices, e.g. `sessions[0].mileage`.
/// The root has an empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath<'a>(Vec<PathSegment<'a>>);

impl<'a> JsonPath<'a> {
    /// Number of segments, which is also the depth of the node.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The final segment, `None` for the root.
    #[must_use]
    pub fn last(&self) -> Option<PathSegment<'a>> {
        self.0.last().copied()
    }

    fn child(&self, segment: PathSegment<'a>) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for JsonPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => f.write_str(key)?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// A node visited during a walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<'a> {
    /// Where the node sits in the document.
    pub path: JsonPath<'a>,
    /// The node itself.
    pub value: &'a Value,
}

impl Node<'_> {
    /// Depth below the root; the root is at depth 0.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.path.len()
    }

    /// Returns `true` for scalars (null, bool, number, string).
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        !matches!(self.value, Value::Object(_) | Value::Array(_))
    }
}

/// Lazy depth-first iterator over the nodes of a document.
///
/// Created by [`walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<Node<'a>>,
    limit: Option<usize>,
    // Last yielded container; its children are pushed on the next call.
    expand: Option<Node<'a>>,
}

impl<'a> Walk<'a> {
    /// Skips the children of the node most recently yielded.
    ///
    /// Has no effect if that node is a leaf or sits at the recursion limit.
    pub fn skip_subtree(&mut self) {
        self.expand = None;
    }

    fn push_children(&mut self, parent: &Node<'a>) {
        match parent.value {
            Value::Object(map) => {
                for (key, value) in map.iter().rev() {
                    self.stack.push(Node {
                        path: parent.path.child(PathSegment::Key(key)),
                        value,
                    });
                }
            }
            Value::Array(items) => {
                for (index, value) in items.iter().enumerate().rev() {
                    self.stack.push(Node {
                        path: parent.path.child(PathSegment::Index(index)),
                        value,
                    });
                }
            }
            _ => {}
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(parent) = self.expand.take() {
            self.push_children(&parent);
        }

        let node = self.stack.pop()?;
        if !node.is_leaf() && self.limit.is_none_or(|limit| node.depth() < limit) {
            self.expand = Some(node.clone());
        }
        Some(node)
    }
}

/// Walks `doc` depth-first, descending at most `limit` levels below the root.
///
/// `None` means no limit. The root itself is the first node yielded.
#[must_use]
pub fn walk(doc: &Value, limit: Option<usize>) -> Walk<'_> {
    Walk {
        stack: vec![Node {
            path: JsonPath::default(),
            value: doc,
        }],
        limit,
        expand: None,
    }
}

/// Like [`walk`] but yields only scalar nodes.
pub fn leaves(doc: &Value, limit: Option<usize>) -> impl Iterator<Item = Node<'_>> {
    walk(doc, limit).filter(Node::is_leaf)
}
