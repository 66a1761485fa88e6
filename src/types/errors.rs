use std::fmt;

//------------ TrieError ------------------------------------------------------

/// Possible errors returned by methods on a [`crate::Tree`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TrieError {
    /// The requested prefix length does not fit the address family (`0..=32`
    /// for v4, `0..=128` for v6).
    InvalidPrefixLength,
    /// A numeric family code that is neither v4 nor v6.
    UnsupportedFamily,
    /// The arena could not grow to hold a new node. The tree is left exactly
    /// as it was before the call that returned this error.
    OutOfMemory,
    /// `remove` was called with a handle that does not name a real node
    /// currently in the tree (stale, foreign, or a glue node).
    NotFound,
    /// An iterator cursor observed the tree's generation counter advance
    /// since it was created or last stepped.
    ConcurrentModification,
}

impl std::error::Error for TrieError {}

impl fmt::Display for TrieError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TrieError::InvalidPrefixLength => {
                write!(f, "Error: Prefix length is out of range for the address family.")
            }
            TrieError::UnsupportedFamily => {
                write!(f, "Error: Address family is neither IPv4 nor IPv6.")
            }
            TrieError::OutOfMemory => {
                write!(f, "Error: Could not allocate a new trie node.")
            }
            TrieError::NotFound => {
                write!(f, "Error: The node is not part of the tree.")
            }
            TrieError::ConcurrentModification => {
                write!(
                    f,
                    "Error: The tree was modified while an iterator was in \
                     progress."
                )
            }
        }
    }
}
