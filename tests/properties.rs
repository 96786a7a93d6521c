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

//! Law and invariant checks over randomized inputs.

use braid::{Leaf, Node, Rope, MAX_LEAF};

use quickcheck::quickcheck;

fn weights_consistent(node: &Node) -> bool {
    if node.is_empty() {
        return node.weight() == 0;
    }
    match node.leaf() {
        Some(leaf) => node.weight() == leaf.len(),
        None => {
            node.weight() == node.children()[0].len()
                && node.children().iter().all(weights_consistent)
        }
    }
}

fn leaf_depths(node: &Node, depth: usize, out: &mut Vec<usize>) {
    if node.is_leaf() {
        out.push(depth);
    } else {
        for child in node.children() {
            leaf_depths(child, depth + 1, out);
        }
    }
}

fn well_formed(r: &Rope) -> bool {
    let root = r.root();
    if r.is_empty() {
        return root.is_empty();
    }
    let leaf_sum: usize = r.leaves().map(Leaf::len).sum();
    root.is_balanced() && weights_consistent(root) && r.len() == leaf_sum
}

// big enough to span several internal nodes
fn big_text() -> String {
    ('a'..='z').cycle().take(MAX_LEAF * 5).collect()
}

quickcheck! {
    fn concat_is_string_concat(a: String, b: String) -> bool {
        let joined = Rope::from(&a).concat(&Rope::from(&b));
        well_formed(&joined) && joined == [a, b].concat()
    }

    fn concat_is_associative(a: String, b: String, c: String) -> bool {
        let left = Rope::from(&a).concat(&Rope::from(&b)).concat(&Rope::from(&c));
        let right = Rope::from(&a).concat(&Rope::from(&b).concat(&Rope::from(&c)));
        left == right
    }

    fn concat_with_empty_is_identity(a: String) -> bool {
        let r = Rope::from(&a);
        let e = Rope::new();
        r.concat(&e) == r && e.concat(&r) == r
    }

    fn get_matches_chars(text: String, index: usize) -> bool {
        let chars: Vec<char> = text.chars().collect();
        let r = Rope::from(&text);
        let index = if chars.is_empty() { index } else { index % (chars.len() * 2 + 1) };
        r.get(index) == chars.get(index).copied()
    }

    fn slice_round_trips(text: String, lo: usize, hi: usize) -> bool {
        let chars: Vec<char> = text.chars().collect();
        let mut lo = lo % (chars.len() + 1);
        let mut hi = hi % (chars.len() + 1);
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        let r = Rope::from(&text);
        let sliced = r.sub_rope(lo, hi).unwrap();
        let expected: String = chars[lo..hi].iter().collect();
        well_formed(&sliced) && sliced == expected
    }

    fn insert_then_delete_round_trips(text: String, index: usize, c: char) -> bool {
        let r = Rope::from(&text);
        let index = index % (r.len() + 1);
        let edited = r.insert(index, &c.to_string()).unwrap();
        if edited.len() != r.len() + 1 || edited.get(index) != Some(c) {
            return false;
        }
        well_formed(&edited) && edited.delete_at(index).unwrap() == r
    }

    fn remove_range_is_slice_composition(text: String, lo: usize, hi: usize) -> bool {
        let r = Rope::from(&text);
        let mut lo = lo % (r.len() + 1);
        let mut hi = hi % (r.len() + 1);
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        let removed = r.remove_range(lo, hi).unwrap();
        let composed = r.sub_rope(0, lo).unwrap().concat(&r.sub_rope(hi, r.len()).unwrap());
        well_formed(&removed) && removed == composed
    }

    fn index_of_finds_first_occurrence(text: String, c: char) -> bool {
        let r = Rope::from(&text);
        r.index_of(c) == text.chars().position(|found| found == c)
    }

    fn chars_round_trip(text: String) -> bool {
        let r = Rope::from(&text);
        r.chars().collect::<String>() == text
    }

    fn built_ropes_are_well_formed(text: String) -> bool {
        well_formed(&Rope::from(&text))
    }

    fn big_rope_slices_round_trip(lo: usize, hi: usize) -> bool {
        let text = big_text();
        let r = Rope::from(&text);
        let mut lo = lo % (r.len() + 1);
        let mut hi = hi % (r.len() + 1);
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        let sliced = r.sub_rope(lo, hi).unwrap();
        well_formed(&sliced) && sliced == text[lo..hi]
    }

    fn big_rope_edits_stay_well_formed(index: usize, c: char) -> bool {
        let r = Rope::from(&big_text());
        let index = index % (r.len() + 1);
        let inserted = r.insert(index, &c.to_string()).unwrap();
        if !well_formed(&inserted) || inserted.len() != r.len() + 1 {
            return false;
        }
        let deleted = inserted.delete_at(index).unwrap();
        well_formed(&deleted) && deleted == r
    }
}

#[test]
fn from_string_builds_uniform_depth_trees() {
    for chunks in &[1usize, 2, 8, 9, 17, 64, 65] {
        let text = "x".repeat(MAX_LEAF * chunks);
        let r = Rope::from(&text);
        let mut depths = Vec::new();
        leaf_depths(r.root(), 0, &mut depths);
        assert_eq!(*chunks, depths.len());
        assert!(depths.iter().all(|&d| d == r.root().height()));
        assert!(well_formed(&r));
    }
}

#[test]
fn remove_whole_big_rope_is_empty() {
    let r = Rope::from(&big_text());
    assert_eq!(Rope::new(), r.remove_range(0, r.len()).unwrap());
}

#[test]
fn append_many_pieces() {
    let mut r = Rope::new();
    let mut expected = String::new();
    for i in 0..500 {
        let piece = format!("{}\n", i);
        let len = r.len();
        r = r.insert(len, &piece).unwrap();
        expected.push_str(&piece);
    }
    assert!(well_formed(&r));
    assert_eq!(r, expected);
}

#[test]
fn interleaved_edits_match_a_vec_model() {
    let mut r = Rope::from("seed");
    let mut model: Vec<char> = "seed".chars().collect();
    // deterministic pseudo-random walk
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..600 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let roll = (state >> 33) as usize;
        match roll % 3 {
            0 => {
                let i = roll % (r.len() + 1);
                let c = (b'a' + (roll % 26) as u8) as char;
                r = r.insert(i, &c.to_string()).unwrap();
                model.insert(i, c);
            }
            1 if !model.is_empty() => {
                let i = roll % r.len();
                r = r.delete_at(i).unwrap();
                model.remove(i);
            }
            _ => {
                let mut lo = roll % (r.len() + 1);
                let mut hi = (roll >> 7) % (r.len() + 1);
                if lo > hi {
                    std::mem::swap(&mut lo, &mut hi);
                }
                let expected: String = model[lo..hi].iter().collect();
                assert_eq!(expected, r.sub_rope(lo, hi).unwrap().to_string());
            }
        }
        assert!(well_formed(&r));
        assert_eq!(model.len(), r.len());
    }
    let expected: String = model.iter().collect();
    assert_eq!(expected, r.to_string());
}
