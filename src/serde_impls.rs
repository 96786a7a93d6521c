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

//! A rope serializes as its string contents; the tree shape is an
//! implementation detail and is rebuilt on deserialization.

use std::fmt;

use serde::de::{Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};

use crate::rope::Rope;

impl Serialize for Rope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&String::from(self))
    }
}

impl<'de> Deserialize<'de> for Rope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(RopeVisitor)
    }
}

struct RopeVisitor;

impl<'de> Visitor<'de> for RopeVisitor {
    type Value = Rope;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a string")
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Rope::from(s))
    }
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_tokens, Token};

    use crate::rope::Rope;
    use crate::tree::MAX_LEAF;

    #[test]
    fn tokens_round_trip() {
        let r = Rope::from("hello world");
        assert_tokens(&r, &[Token::Str("hello world")]);

        let empty = Rope::new();
        assert_tokens(&empty, &[Token::Str("")]);
    }

    #[test]
    fn json_round_trip_rebuilds_large_trees() {
        let text: String = ('a'..='z').cycle().take(MAX_LEAF * 3 + 11).collect();
        let r = Rope::from(&text);
        let json = serde_json::to_string(&r).unwrap();
        let back: Rope = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
        assert!(back.root().is_balanced());
    }
}
