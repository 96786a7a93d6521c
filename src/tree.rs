// Copyright 2020 The Braid Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The b-tree underlying the rope: bounded string leaves, weighted
//! internal nodes, and the structural builders that keep the tree legal.

use std::cmp::min;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::error::{Error, Result};

/// Maximum number of characters in a single leaf.
pub const MAX_LEAF: usize = 2048;
/// Fan-out the builders aim for when redistributing children.
pub const MIN_CHILDREN: usize = 4;
/// Maximum fan-out of an internal node.
pub const MAX_CHILDREN: usize = 8;

fn count_newlines(s: &str) -> usize {
    bytecount::count(s.as_bytes(), b'\n')
}

/// A bounded fragment of text, measured in characters.
///
/// The character length is computed once at construction. The newline
/// count is carried alongside as metadata: it is maintained through
/// splits and slices but not otherwise interpreted here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Leaf {
    text: String,
    char_len: usize,
    newline_count: usize,
}

impl Leaf {
    pub fn new(text: &str) -> Leaf {
        Leaf {
            char_len: str_indices::chars::count(text),
            newline_count: count_newlines(text),
            text: text.to_owned(),
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// A leaf is legal when it fits within the leaf capacity.
    pub fn is_legal(&self) -> bool {
        self.char_len <= MAX_LEAF
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn newline_count(&self) -> usize {
        self.newline_count
    }

    fn byte_of_char(&self, index: usize) -> usize {
        str_indices::chars::to_byte_idx(&self.text, index)
    }

    /// The character at `index`, if within bounds.
    pub fn char_at(&self, index: usize) -> Option<char> {
        if index >= self.char_len {
            return None;
        }
        self.text[self.byte_of_char(index)..].chars().next()
    }

    /// Returns a new leaf with `s` inserted at character position
    /// `index`. Fails if the index is past the end, or if the result
    /// would not fit in a legal leaf.
    pub fn add(&self, index: usize, s: &str) -> Result<Leaf> {
        if index > self.char_len {
            return Err(Error::OutOfRange { index, len: self.char_len });
        }
        let added = str_indices::chars::count(s);
        if self.char_len + added > MAX_LEAF {
            return Err(Error::InvalidArgument(format!(
                "leaf of {} chars exceeds the maximum of {}",
                self.char_len + added,
                MAX_LEAF
            )));
        }
        Ok(self.splice(index, s, added))
    }

    /// Inserts without the capacity cap. An oversize result comes back
    /// as the run of legal leaves it splits into.
    pub fn expandable_add(&self, index: usize, s: &str) -> Result<Vec<Leaf>> {
        if index > self.char_len {
            return Err(Error::OutOfRange { index, len: self.char_len });
        }
        let added = str_indices::chars::count(s);
        let merged = self.splice(index, s, added);
        if merged.char_len <= MAX_LEAF {
            Ok(vec![merged])
        } else {
            Ok(split_into_leaves(&merged.text))
        }
    }

    fn splice(&self, index: usize, s: &str, added: usize) -> Leaf {
        let b = self.byte_of_char(index);
        let mut text = String::with_capacity(self.text.len() + s.len());
        text.push_str(&self.text[..b]);
        text.push_str(s);
        text.push_str(&self.text[b..]);
        Leaf {
            text,
            char_len: self.char_len + added,
            newline_count: self.newline_count + count_newlines(s),
        }
    }

    /// Returns a new leaf with the character at `index` removed.
    pub fn delete_at(&self, index: usize) -> Result<Leaf> {
        if index >= self.char_len {
            return Err(Error::OutOfRange { index, len: self.char_len });
        }
        let start = self.byte_of_char(index);
        let c = self.text[start..].chars().next().unwrap();
        let end = start + c.len_utf8();
        let mut text = String::with_capacity(self.text.len() - c.len_utf8());
        text.push_str(&self.text[..start]);
        text.push_str(&self.text[end..]);
        Ok(Leaf {
            text,
            char_len: self.char_len - 1,
            newline_count: self.newline_count - (c == '\n') as usize,
        })
    }

    /// The sub-leaf for the character range `[lo, hi)`.
    pub fn slice(&self, lo: usize, hi: usize) -> Leaf {
        debug_assert!(lo <= hi && hi <= self.char_len);
        let text = &self.text[self.byte_of_char(lo)..self.byte_of_char(hi)];
        Leaf {
            char_len: hi - lo,
            newline_count: count_newlines(text),
            text: text.to_owned(),
        }
    }
}

/// Partitions `s` into consecutive leaves of at most `MAX_LEAF`
/// characters each, in order. The empty string yields no leaves.
pub fn split_into_leaves(s: &str) -> Vec<Leaf> {
    let mut leaves = Vec::with_capacity(s.len() / MAX_LEAF + 1);
    let mut rest = s;
    while !rest.is_empty() {
        let split = str_indices::chars::to_byte_idx(rest, MAX_LEAF);
        leaves.push(Leaf::new(&rest[..split]));
        rest = &rest[split..];
    }
    leaves
}

/// A b-tree node storing leaves at the bottom. It is implemented with
/// atomic reference counting, so a clone is cheap and subtrees are
/// shared freely between rope values; an edit materializes a fresh path
/// from the root while everything off that path stays shared.
///
/// The `weight` of a leaf is its character length; the weight of an
/// internal node is the total character count under its *leftmost*
/// child. Comparing an index against the weight is what lets a descent
/// skip a whole left subtree in one step.
#[derive(Clone, Debug)]
pub struct Node(Arc<NodeBody>);

#[derive(Debug)]
pub(crate) struct NodeBody {
    height: usize,
    weight: usize,
    val: NodeVal,
}

#[derive(Debug)]
enum NodeVal {
    Leaf(Leaf),
    Internal(Vec<Node>),
}

lazy_static! {
    static ref EMPTY: Node = Node(Arc::new(NodeBody {
        height: 0,
        weight: 0,
        val: NodeVal::Internal(Vec::new()),
    }));
}

impl Node {
    pub fn from_leaf(leaf: Leaf) -> Node {
        let weight = leaf.len();
        Node(Arc::new(NodeBody { height: 0, weight, val: NodeVal::Leaf(leaf) }))
    }

    /// The one shared empty node. It is deliberately not legal, and it
    /// never appears below a root; operations special-case it up front.
    pub fn empty() -> Node {
        EMPTY.clone()
    }

    // Invariants assumed, not checked. `create_parent` is the checked
    // front door.
    fn from_children(children: Vec<Node>) -> Node {
        debug_assert!(!children.is_empty() && children.len() <= MAX_CHILDREN);
        let height = 1 + children.iter().map(Node::height).max().unwrap();
        let weight = children[0].len();
        Node(Arc::new(NodeBody { height, weight, val: NodeVal::Internal(children) }))
    }

    /// Builds an internal node over `children`, validating the fan-out
    /// bound and the legality of every child.
    pub fn create_parent(children: Vec<Node>) -> Result<Node> {
        if children.is_empty() {
            return Err(Error::InvalidArgument("a parent needs at least one child".to_string()));
        }
        if children.len() > MAX_CHILDREN {
            return Err(Error::InvalidArgument(format!(
                "{} children exceeds the maximum of {}",
                children.len(),
                MAX_CHILDREN
            )));
        }
        if let Some(i) = children.iter().position(|c| !c.is_legal()) {
            return Err(Error::InvalidArgument(format!("illegal child at index {}", i)));
        }
        Ok(Node::from_children(children))
    }

    /// Merges an ordered run of legal nodes under a single node, growing
    /// height as little as possible: a parent per `MAX_CHILDREN` chunk,
    /// then the parents merged in turn. Same-height inputs come out at
    /// uniform leaf depth.
    pub fn merge(nodes: Vec<Node>) -> Result<Node> {
        if nodes.len() <= MAX_CHILDREN {
            return Node::create_parent(nodes);
        }
        let mut parents = Vec::with_capacity(nodes.len() / MAX_CHILDREN + 1);
        let mut iter = nodes.into_iter();
        loop {
            let chunk: Vec<Node> = iter.by_ref().take(MAX_CHILDREN).collect();
            if chunk.is_empty() {
                break;
            }
            parents.push(Node::create_parent(chunk)?);
        }
        Node::merge(parents)
    }

    /// A balanced tree is returned as-is, sharing the input. Anything
    /// else is rebuilt from its non-empty leaves in order.
    pub fn rebalance(&self) -> Node {
        if self.is_balanced() {
            return self.clone();
        }
        let mut leaves = Vec::new();
        self.push_leaves(&mut leaves);
        leaves.retain(|l| !l.is_empty());
        match leaves.len() {
            0 => Node::empty(),
            1 => leaves.pop().unwrap(),
            _ => Node::merge(leaves).expect("leaves collected from a tree are legal"),
        }
    }

    pub fn height(&self) -> usize {
        self.0.height
    }

    pub fn weight(&self) -> usize {
        self.0.weight
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.0.val, NodeVal::Leaf(_))
    }

    pub fn is_empty(&self) -> bool {
        match self.0.val {
            NodeVal::Leaf(ref l) => l.is_empty(),
            NodeVal::Internal(ref v) => v.is_empty(),
        }
    }

    /// Total characters in this subtree. The weight only covers the
    /// leftmost child, so the remaining children recurse.
    pub fn len(&self) -> usize {
        match self.0.val {
            NodeVal::Leaf(ref l) => l.len(),
            NodeVal::Internal(ref v) => {
                if v.is_empty() {
                    return 0;
                }
                self.0.weight + v[1..].iter().map(Node::len).sum::<usize>()
            }
        }
    }

    pub fn is_legal(&self) -> bool {
        match self.0.val {
            NodeVal::Leaf(ref l) => l.is_legal(),
            NodeVal::Internal(ref v) => {
                !v.is_empty()
                    && v.len() <= MAX_CHILDREN
                    && v.iter().all(|c| c.height() < self.0.height)
            }
        }
    }

    pub fn is_balanced(&self) -> bool {
        match self.0.val {
            NodeVal::Leaf(ref l) => l.is_legal() && !l.is_empty(),
            NodeVal::Internal(ref v) => self.is_legal() && v.iter().all(Node::is_balanced),
        }
    }

    /// The leaf payload, if this is a leaf node.
    pub fn leaf(&self) -> Option<&Leaf> {
        match self.0.val {
            NodeVal::Leaf(ref l) => Some(l),
            NodeVal::Internal(_) => None,
        }
    }

    /// Children of an internal node; empty for a leaf.
    pub fn children(&self) -> &[Node] {
        match self.0.val {
            NodeVal::Leaf(_) => &[],
            NodeVal::Internal(ref v) => v,
        }
    }

    /// Identity, not structure. Spine rebuilds and ancestor searches key
    /// off this.
    pub fn same(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn key(&self) -> *const NodeBody {
        Arc::as_ptr(&self.0)
    }

    /// The position of `child` among this node's children, matched by
    /// identity.
    pub fn child_position(&self, child: &Node) -> Option<usize> {
        self.children().iter().position(|c| Node::same(c, child))
    }

    /// Returns a copy of this node with the child at `index` replaced.
    pub fn set_child(&self, index: usize, child: Node) -> Result<Node> {
        let v = self.children();
        if index >= v.len() {
            return Err(Error::OutOfRange { index, len: v.len() });
        }
        Node::create_parent([&v[..index], &[child][..], &v[index + 1..]].concat())
    }

    /// Replaces the single child slot at `index` with a run of nodes.
    pub fn set_children_at(&self, index: usize, children: &[Node]) -> Result<Node> {
        let v = self.children();
        if index >= v.len() {
            return Err(Error::OutOfRange { index, len: v.len() });
        }
        Node::create_parent([&v[..index], children, &v[index + 1..]].concat())
    }

    /// Returns a copy of this node with `child` inserted at `index`.
    pub fn insert_child(&self, index: usize, child: Node) -> Result<Node> {
        let v = self.children();
        if index > v.len() {
            return Err(Error::OutOfRange { index, len: v.len() });
        }
        Node::create_parent([&v[..index], &[child][..], &v[index..]].concat())
    }

    pub fn push_child_front(&self, child: Node) -> Result<Node> {
        self.insert_child(0, child)
    }

    pub fn push_child_back(&self, child: Node) -> Result<Node> {
        self.insert_child(self.children().len(), child)
    }

    /// Returns a copy of this node with `children` appended.
    pub fn extend_children(&self, children: &[Node]) -> Result<Node> {
        Node::create_parent([self.children(), children].concat())
    }

    /// Replaces `old`, matched by identity, with `new`. Passing a node
    /// that is not a child here is a bug.
    pub fn replace_child(&self, old: &Node, new: Node) -> Result<Node> {
        match self.child_position(old) {
            Some(i) => self.set_child(i, new),
            None => panic!("replace_child: node is not a child of this parent"),
        }
    }

    /// Returns a copy of this node with the child at `index` removed.
    /// Removing the last child yields the empty node.
    pub fn remove_child_at(&self, index: usize) -> Result<Node> {
        let v = self.children();
        if index >= v.len() {
            return Err(Error::OutOfRange { index, len: v.len() });
        }
        if v.len() == 1 {
            return Ok(Node::empty());
        }
        Node::create_parent([&v[..index], &v[index + 1..]].concat())
    }

    pub(crate) fn push_leaves(&self, out: &mut Vec<Node>) {
        match self.0.val {
            NodeVal::Leaf(_) => out.push(self.clone()),
            NodeVal::Internal(ref v) => {
                for child in v {
                    child.push_leaves(out);
                }
            }
        }
    }

    /// Leaf nodes of this subtree, left to right.
    pub(crate) fn leaf_nodes(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.push_leaves(&mut out);
        out
    }

    fn is_ok_child(&self) -> bool {
        match self.0.val {
            NodeVal::Leaf(_) => true,
            NodeVal::Internal(ref v) => v.len() >= MIN_CHILDREN,
        }
    }

    fn merge_children(children1: &[Node], children2: &[Node]) -> Node {
        let n_children = children1.len() + children2.len();
        if n_children <= MAX_CHILDREN {
            Node::from_children([children1, children2].concat())
        } else {
            // Note: this leans left. Splitting at midpoint is also an option
            let splitpoint = min(MAX_CHILDREN, n_children - MIN_CHILDREN);
            let mut iter = children1.iter().chain(children2.iter()).cloned();
            let left = iter.by_ref().take(splitpoint).collect();
            let right = iter.collect();
            Node::from_children(vec![Node::from_children(left), Node::from_children(right)])
        }
    }

    /// Concatenates two non-empty trees, preserving balance and leaf
    /// depth. The smaller tree is folded into the facing flank of the
    /// taller one; equal-height well-filled operands just get a common
    /// parent.
    pub(crate) fn concat(rope1: Node, rope2: Node) -> Node {
        use std::cmp::Ordering;

        let h1 = rope1.height();
        let h2 = rope2.height();

        match h1.cmp(&h2) {
            Ordering::Less => {
                let children2 = rope2.children();
                if h1 == h2 - 1 && rope1.is_ok_child() {
                    return Node::merge_children(&[rope1], children2);
                }
                let newrope = Node::concat(rope1, children2[0].clone());
                if newrope.height() == h2 - 1 {
                    Node::merge_children(&[newrope], &children2[1..])
                } else {
                    Node::merge_children(newrope.children(), &children2[1..])
                }
            }
            Ordering::Equal => {
                if h1 == 0 || (rope1.is_ok_child() && rope2.is_ok_child()) {
                    return Node::from_children(vec![rope1, rope2]);
                }
                Node::merge_children(rope1.children(), rope2.children())
            }
            Ordering::Greater => {
                let children1 = rope1.children();
                if h2 == h1 - 1 && rope2.is_ok_child() {
                    return Node::merge_children(children1, &[rope2]);
                }
                let lastix = children1.len() - 1;
                let newrope = Node::concat(children1[lastix].clone(), rope2);
                if newrope.height() == h1 - 1 {
                    Node::merge_children(&children1[..lastix], &[newrope])
                } else {
                    Node::merge_children(&children1[..lastix], newrope.children())
                }
            }
        }
    }
}
