//! A Patricia (radix) trie for IPv4 and IPv6 network prefixes.
//!
//! A single [`Tree`] holds both address families side by side and supports
//! exact, best (longest-prefix) and worst (shortest-prefix) match, plus
//! bulk enumeration of prefixes that cover or are covered by a query. The
//! trie itself is classic Patricia: real nodes carry a stored prefix and
//! payload, glue nodes exist only to branch between two real descendants
//! that diverge at a bit neither of them was anchored on.
//!
//! Nodes live in an arena addressed by [`NodeHandle`]; there are no raw
//! pointers or `unsafe` anywhere in this crate. [`Tree::iter`] returns a
//! cursor, not a standard [`Iterator`], because advancing it takes the
//! tree by reference on every call -- see [`PayloadIter`] for why.

mod iter;
mod node;
mod query;
mod tree;
mod types;

pub use iter::PayloadIter;
pub use node::NodeHandle;
pub use tree::Tree;
pub use types::{Family, Prefix, TrieError};
