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

//! The rope value type and its operations.

use std::borrow::Cow;
use std::cmp::min;
use std::fmt;
use std::iter::once;
use std::ops::Add;
use std::str::FromStr;
use std::string::ParseError;

use memchr::memchr;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::tree::{split_into_leaves, Leaf, Node, MAX_CHILDREN, MAX_LEAF};

/// A persistent rope.
///
/// A rope represents a string as a balanced tree of bounded fragments,
/// so that point edits, slicing and concatenation are cheap on large
/// documents. This implementation is immutable: every operation takes
/// the rope by reference and returns a new value, and the two values
/// share every subtree the operation did not touch. Sharing uses atomic
/// reference counting, so clones are cheap and ropes can be handed
/// between threads freely.
///
/// Indices are character positions. Leaf splits land on character
/// boundaries, and nothing here is aware of grapheme clusters or lines.
///
/// # Examples
///
/// ```
/// use braid::Rope;
///
/// let a = Rope::from("hello ");
/// let b = Rope::from("world");
/// assert_eq!("hello world", a.concat(&b).to_string());
/// ```
///
/// Edits return new values and leave the original alone:
///
/// ```
/// use braid::Rope;
///
/// let a = Rope::from("abcdef");
/// let b = a.delete_at(2).unwrap();
/// assert_eq!("abdef", b.to_string());
/// assert_eq!("abcdef", a.to_string());
/// ```
#[derive(Clone, Debug)]
pub struct Rope {
    root: Node,
    len: usize,
}

impl Rope {
    /// The empty rope.
    pub fn new() -> Rope {
        Rope { root: Node::empty(), len: 0 }
    }

    pub(crate) fn from_node(root: Node) -> Rope {
        debug_assert!(root.is_empty() || root.is_balanced());
        let len = root.len();
        Rope { root, len }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The root node of the underlying tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The character at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<char> {
        if index >= self.len {
            return None;
        }
        let mut cursor = Cursor::single(&self.root, index);
        if cursor.has_next() {
            Some(cursor.next_char())
        } else {
            None
        }
    }

    /// The position of the first occurrence of `c`, scanning leaves in
    /// order.
    pub fn index_of(&self, c: char) -> Option<usize> {
        let mut offset = 0;
        if c.is_ascii() {
            for leaf in self.leaves() {
                if let Some(pos) = memchr(c as u8, leaf.as_str().as_bytes()) {
                    return Some(offset + str_indices::chars::from_byte_idx(leaf.as_str(), pos));
                }
                offset += leaf.len();
            }
        } else {
            for leaf in self.leaves() {
                for (i, found) in leaf.as_str().chars().enumerate() {
                    if found == c {
                        return Some(offset + i);
                    }
                }
                offset += leaf.len();
            }
        }
        None
    }

    /// An iterator over the characters of the rope.
    pub fn chars(&self) -> Chars {
        self.chars_from(0)
    }

    /// An iterator over the characters from position `from` onward. A
    /// starting point past the end yields nothing.
    pub fn chars_from(&self, from: usize) -> Chars {
        Chars { cursor: Cursor::new(&self.root, from) }
    }

    /// An iterator over the leaves, left to right. The empty rope has
    /// no leaves.
    pub fn leaves(&self) -> Leaves {
        Leaves { stack: vec![&self.root] }
    }

    /// The leaf values in left-to-right order.
    pub fn collect_leaves(&self) -> Vec<Leaf> {
        self.leaves().cloned().collect()
    }

    /// An iterator over the text of each leaf.
    pub fn chunks(&self) -> impl Iterator<Item = &str> {
        self.leaves().map(Leaf::as_str)
    }

    /// Appends the rope's contents to `dst`.
    pub fn push_to_string(&self, dst: &mut String) {
        for chunk in self.chunks() {
            dst.push_str(chunk);
        }
    }

    /// Concatenates two ropes. The empty rope is an identity on both
    /// sides; otherwise the trees are joined so that the result stays
    /// balanced, growing in height by at most one.
    pub fn concat(&self, other: &Rope) -> Rope {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        Rope::from_node(Node::concat(self.root.clone(), other.root.clone()))
    }

    /// The sub-rope for the character range `[lo, hi)`.
    pub fn sub_rope(&self, lo: usize, hi: usize) -> Result<Rope> {
        if hi > self.len {
            return Err(Error::OutOfRange { index: hi, len: self.len });
        }
        if lo > hi {
            return Err(Error::OutOfRange { index: lo, len: self.len });
        }
        if lo == hi {
            return Ok(Rope::new());
        }
        if let Some(leaf) = self.root.leaf() {
            return Ok(Rope::from_node(Node::from_leaf(leaf.slice(lo, hi))));
        }

        let lo_cursor = locate(&self.root, lo);
        let hi_cursor = locate(&self.root, hi - 1);
        let (lo_leaf, lo_offset) = lo_cursor.get_leaf().unwrap();
        let (hi_leaf, hi_offset) = hi_cursor.get_leaf().unwrap();

        if Node::same(lo_leaf, hi_leaf) {
            let leaf = lo_leaf.leaf().unwrap().slice(lo_offset, hi_offset + 1);
            return Ok(Rope::from_node(Node::from_leaf(leaf)));
        }

        // both endpoints live under the lowest common ancestor, so its
        // leaf run is everything the slice can touch
        let lca = lowest_common_ancestor(&lo_cursor, lo_leaf, &hi_cursor, hi_leaf);
        let leaves = lca.leaf_nodes();
        let first = leaves
            .iter()
            .position(|l| Node::same(l, lo_leaf))
            .unwrap_or_else(|| panic!("lower slice leaf missing under the common ancestor"));
        let last = leaves
            .iter()
            .position(|l| Node::same(l, hi_leaf))
            .unwrap_or_else(|| panic!("upper slice leaf missing under the common ancestor"));

        let mut pieces = Vec::with_capacity(last - first + 1);
        let lo_text = lo_leaf.leaf().unwrap();
        pieces.push(Node::from_leaf(lo_text.slice(lo_offset, lo_text.len())));
        pieces.extend(leaves[first + 1..last].iter().cloned());
        pieces.push(Node::from_leaf(hi_leaf.leaf().unwrap().slice(0, hi_offset + 1)));

        Ok(Rope::from_node(Node::merge(pieces)?))
    }

    /// Removes the character range `[lo, hi)`.
    pub fn remove_range(&self, lo: usize, hi: usize) -> Result<Rope> {
        if hi > self.len {
            return Err(Error::OutOfRange { index: hi, len: self.len });
        }
        if lo > hi {
            return Err(Error::OutOfRange { index: lo, len: self.len });
        }
        if lo == 0 {
            return self.sub_rope(hi, self.len);
        }
        let prefix = self.sub_rope(0, lo)?;
        let suffix = self.sub_rope(hi, self.len)?;
        Ok(prefix.concat(&suffix))
    }

    /// Inserts `s` at character position `index`; `index == len`
    /// appends.
    ///
    /// When the target leaf can absorb `s` the edit stays local and only
    /// the spine above the leaf is rebuilt. Otherwise the leaf splits
    /// into fragments, which widen the parent if it has room, or fold
    /// into one taller child if it does not.
    pub fn insert(&self, index: usize, s: &str) -> Result<Rope> {
        if index > self.len {
            return Err(Error::OutOfRange { index, len: self.len });
        }
        if self.is_empty() {
            return Ok(Rope::from(s));
        }
        if s.is_empty() {
            return Ok(self.clone());
        }

        // an append lands after the last character of the last leaf
        let (target, shift) = if index == self.len { (index - 1, 1) } else { (index, 0) };
        let cursor = locate(&self.root, target);
        let (leaf_node, offset) = cursor.get_leaf().unwrap();
        let leaf = leaf_node.leaf().unwrap();
        let at = offset + shift;

        if leaf.len() + str_indices::chars::count(s) <= MAX_LEAF {
            let new_node = Node::from_leaf(leaf.add(at, s)?);
            return Ok(Rope::from_node(rebuild_replace(&cursor, leaf_node, new_node)));
        }

        let fragments: Vec<Node> =
            leaf.expandable_add(at, s)?.into_iter().map(Node::from_leaf).collect();
        let parent = match cursor.find_parent(leaf_node) {
            None => return Ok(Rope::from_node(Node::merge(fragments)?)),
            Some(parent) => parent,
        };
        let slot = parent
            .child_position(leaf_node)
            .unwrap_or_else(|| panic!("recorded parent does not own the edited leaf"));

        let new_parent = if parent.children().len() - 1 + fragments.len() <= MAX_CHILDREN {
            // room to stay wide: the leaf's slot becomes the fragments
            parent.set_children_at(slot, &fragments)?
        } else {
            // full parent: fold the fragments into one taller child
            parent.set_child(slot, Node::merge(fragments)?)?
        };
        Ok(Rope::from_node(rebuild_replace(&cursor, parent, new_parent)))
    }

    /// Removes the character at `index`. A leaf emptied by the removal
    /// disappears from its parent, cascading as far up as needed.
    pub fn delete_at(&self, index: usize) -> Result<Rope> {
        if index >= self.len {
            return Err(Error::OutOfRange { index, len: self.len });
        }
        let cursor = locate(&self.root, index);
        let (leaf_node, offset) = cursor.get_leaf().unwrap();
        let leaf = leaf_node.leaf().unwrap().delete_at(offset)?;
        let new_node = if leaf.is_empty() { Node::empty() } else { Node::from_leaf(leaf) };
        Ok(Rope::from_node(rebuild_delete(&cursor, leaf_node, new_node)))
    }
}

fn locate<'a>(root: &'a Node, index: usize) -> Cursor<'a> {
    let mut cursor = Cursor::single(root, index);
    if !cursor.has_next() {
        panic!("index {} not found despite bounds check", index);
    }
    cursor
}

/// Climbs from a replaced node to the root, swapping `old` for `new` in
/// each parent recorded by the locating cursor.
fn rebuild_replace<'a>(cursor: &Cursor<'a>, mut old: &'a Node, mut new: Node) -> Node {
    loop {
        match cursor.find_parent(old) {
            Some(parent) => {
                let rebuilt = parent
                    .replace_child(old, new)
                    .unwrap_or_else(|e| panic!("spine rebuild produced an illegal node: {}", e));
                old = parent;
                new = rebuilt;
            }
            None => return new,
        }
    }
}

/// The delete-side climb: an empty replacement removes the child slot
/// instead, which may in turn empty the parent.
fn rebuild_delete<'a>(cursor: &Cursor<'a>, mut old: &'a Node, mut new: Node) -> Node {
    loop {
        match cursor.find_parent(old) {
            Some(parent) => {
                let rebuilt = if new.is_empty() {
                    let slot = parent
                        .child_position(old)
                        .unwrap_or_else(|| panic!("recorded parent does not own the removed node"));
                    parent
                        .remove_child_at(slot)
                        .unwrap_or_else(|e| panic!("spine rebuild produced an illegal node: {}", e))
                } else {
                    parent
                        .replace_child(old, new)
                        .unwrap_or_else(|e| panic!("spine rebuild produced an illegal node: {}", e))
                };
                old = parent;
                new = rebuilt;
            }
            None => return new,
        }
    }
}

/// Finds the deepest node recorded as an ancestor by both cursors,
/// walking the two parent chains and matching by identity.
fn lowest_common_ancestor<'a>(
    lo_cursor: &Cursor<'a>,
    lo_leaf: &'a Node,
    hi_cursor: &Cursor<'a>,
    hi_leaf: &'a Node,
) -> &'a Node {
    let mut lo_chain = Vec::new();
    let mut node = lo_leaf;
    while let Some(parent) = lo_cursor.find_parent(node) {
        lo_chain.push(parent);
        node = parent;
    }
    let mut node = hi_leaf;
    loop {
        match hi_cursor.find_parent(node) {
            Some(parent) => {
                for &ancestor in &lo_chain {
                    if Node::same(ancestor, parent) {
                        return ancestor;
                    }
                }
                node = parent;
            }
            None => panic!("slice endpoints disagree about the root"),
        }
    }
}

/// Character iterator over a rope, driven by the history-aware cursor.
pub struct Chars<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Iterator for Chars<'a> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        if self.cursor.has_next() {
            Some(self.cursor.next_char())
        } else {
            None
        }
    }
}

impl<'a> IntoIterator for &'a Rope {
    type Item = char;
    type IntoIter = Chars<'a>;

    fn into_iter(self) -> Chars<'a> {
        self.chars()
    }
}

/// Leaf iterator over a rope, left to right.
pub struct Leaves<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Leaf;

    fn next(&mut self) -> Option<&'a Leaf> {
        while let Some(node) = self.stack.pop() {
            match node.leaf() {
                Some(leaf) => return Some(leaf),
                None => {
                    for child in node.children().iter().rev() {
                        self.stack.push(child);
                    }
                }
            }
        }
        None
    }
}

impl Default for Rope {
    fn default() -> Rope {
        Rope::new()
    }
}

impl<T: AsRef<str>> From<T> for Rope {
    fn from(s: T) -> Rope {
        let mut leaves = split_into_leaves(s.as_ref());
        match leaves.len() {
            0 => Rope::new(),
            1 => Rope::from_node(Node::from_leaf(leaves.pop().unwrap())),
            _ => {
                let nodes: Vec<Node> = leaves.into_iter().map(Node::from_leaf).collect();
                Rope::from_node(Node::merge(nodes).expect("fresh leaves are legal"))
            }
        }
    }
}

impl From<Rope> for String {
    fn from(r: Rope) -> String {
        String::from(&r)
    }
}

impl<'a> From<&'a Rope> for String {
    fn from(r: &Rope) -> String {
        let mut result = String::new();
        r.push_to_string(&mut result);
        result
    }
}

impl FromStr for Rope {
    type Err = ParseError;

    fn from_str(s: &str) -> ::std::result::Result<Rope, Self::Err> {
        Ok(Rope::from(s))
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for chunk in self.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl Add for Rope {
    type Output = Rope;

    fn add(self, rhs: Rope) -> Rope {
        self.concat(&rhs)
    }
}

fn eq_chunks<'a, 'b>(
    mut a: impl Iterator<Item = &'a str>,
    mut b: impl Iterator<Item = &'b str>,
) -> bool {
    let mut a_chunk: &[u8] = b"";
    let mut b_chunk: &[u8] = b"";
    loop {
        if a_chunk.is_empty() {
            if let Some(s) = a.next() {
                a_chunk = s.as_bytes();
            }
        }
        if b_chunk.is_empty() {
            if let Some(s) = b.next() {
                b_chunk = s.as_bytes();
            }
        }
        let len = min(a_chunk.len(), b_chunk.len());
        if len == 0 {
            return a_chunk.is_empty() && b_chunk.is_empty();
        }
        if a_chunk[..len] != b_chunk[..len] {
            return false;
        }
        a_chunk = &a_chunk[len..];
        b_chunk = &b_chunk[len..];
    }
}

impl PartialEq for Rope {
    fn eq(&self, rhs: &Rope) -> bool {
        self.len() == rhs.len() && eq_chunks(self.chunks(), rhs.chunks())
    }
}

impl Eq for Rope {}

impl PartialEq<str> for Rope {
    fn eq(&self, rhs: &str) -> bool {
        eq_chunks(self.chunks(), once(rhs))
    }
}

impl<'a> PartialEq<&'a str> for Rope {
    fn eq(&self, rhs: &&str) -> bool {
        eq_chunks(self.chunks(), once(*rhs))
    }
}

impl PartialEq<String> for Rope {
    fn eq(&self, rhs: &String) -> bool {
        eq_chunks(self.chunks(), once(rhs.as_str()))
    }
}

impl<'a> PartialEq<Cow<'a, str>> for Rope {
    fn eq(&self, rhs: &Cow<'a, str>) -> bool {
        eq_chunks(self.chunks(), once(&**rhs))
    }
}

impl PartialEq<Rope> for str {
    fn eq(&self, rhs: &Rope) -> bool {
        rhs == self
    }
}

impl<'a> PartialEq<Rope> for &'a str {
    fn eq(&self, rhs: &Rope) -> bool {
        rhs == self
    }
}

impl PartialEq<Rope> for String {
    fn eq(&self, rhs: &Rope) -> bool {
        rhs == self
    }
}

impl<'a> PartialEq<Rope> for Cow<'a, str> {
    fn eq(&self, rhs: &Rope) -> bool {
        rhs == self
    }
}
