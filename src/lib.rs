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

//! A persistent rope data structure built on top of b-trees.
//!
//! A [rope](https://en.wikipedia.org/wiki/Rope_(data_structure)) stores
//! a string as a balanced tree of bounded fragments, making insert,
//! delete, slice and concatenation cheap on large documents. The ropes
//! in this crate are persistent values: every operation returns a new
//! rope, and the old and new values share all the subtrees the
//! operation left untouched. Sharing is by atomic reference counting,
//! so a clone is a pointer copy and ropes move freely across threads.
//!
//! Navigation inside the tree goes through a history-aware cursor that
//! skips whole subtrees by weight arithmetic on the way down and
//! remembers which parent handed over each node, so the mutating
//! operations can locate a leaf once and then rebuild just the path
//! above it.
//!
//! # Examples
//!
//! ```
//! use braid::Rope;
//!
//! let r = Rope::from("hello world");
//! assert_eq!(Some('w'), r.get(6));
//! assert_eq!("world", r.sub_rope(6, 11).unwrap().to_string());
//!
//! let edited = r.insert(5, ",").unwrap();
//! assert_eq!("hello, world", edited.to_string());
//! assert_eq!("hello world", r.to_string());
//! ```

pub mod cursor;
pub mod error;
pub mod rope;
pub mod tree;

mod serde_impls;

pub use crate::cursor::Cursor;
pub use crate::error::{Error, Result};
pub use crate::rope::{Chars, Leaves, Rope};
pub use crate::tree::{split_into_leaves, Leaf, Node, MAX_CHILDREN, MAX_LEAF, MIN_CHILDREN};
