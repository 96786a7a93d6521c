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

//! Error types for rope operations and tree builders.

use std::error;
use std::fmt;

/// Errors that can occur when operating on a rope or building tree nodes.
///
/// Internal inconsistencies (a missing parent during a spine rebuild, a
/// locate that fails inside already-checked bounds) are bugs rather than
/// errors; those panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An index or range endpoint fell outside the addressable sequence.
    OutOfRange { index: usize, len: usize },
    /// A structural builder was handed inputs that would violate the
    /// b-tree invariants.
    InvalidArgument(String),
}

/// The result type used throughout this crate.
pub type Result<T> = ::std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::OutOfRange { index, len } => {
                write!(f, "index {} out of range for length {}", index, len)
            }
            Error::InvalidArgument(ref why) => write!(f, "invalid argument: {}", why),
        }
    }
}

impl error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let e = Error::OutOfRange { index: 7, len: 3 };
        assert_eq!("index 7 out of range for length 3", e.to_string());
        let e = Error::InvalidArgument("too many children".to_string());
        assert_eq!("invalid argument: too many children", e.to_string());
    }
}
