use crate::node::{NodeHandle, Side};
use crate::tree::Tree;
use crate::types::{Family, TrieError};

//------------ PayloadIter --------------------------------------------------

/// A cursor over every real node in a [`Tree`], IPv4 subtree first.
///
/// Unlike `std::iter::Iterator`, [`PayloadIter::next`] takes the tree by
/// reference on every call rather than the cursor borrowing it once and
/// holding that borrow for its whole lifetime. That is what makes the
/// generation check below load-bearing: a single long-lived borrow would
/// already make concurrent mutation a compile error, so there would be
/// nothing left for a runtime check to catch.
///
/// The generation stamp is compared against the tree's at each `next()`
/// to detect exactly this.
pub struct PayloadIter {
    stack: Vec<NodeHandle>,
    pending_family: Option<Family>,
    generation: u64,
    done: bool,
}

impl PayloadIter {
    pub(crate) fn new<P>(tree: &Tree<P>) -> Self {
        PayloadIter {
            stack: Vec::new(),
            pending_family: Some(Family::V4),
            generation: tree.generation(),
            done: false,
        }
    }

    /// Advances the cursor, returning the next real node's handle.
    ///
    /// `tree` must be the same tree the cursor was created from ([`Tree::iter`]).
    /// Returns `Err(TrieError::ConcurrentModification)` if the tree's
    /// generation has advanced since the cursor was created or last
    /// stepped; the cursor is left in place and a fresh one must be
    /// created to continue.
    pub fn next<P>(&mut self, tree: &Tree<P>) -> Result<Option<NodeHandle>, TrieError> {
        if self.done {
            return Ok(None);
        }
        if tree.generation() != self.generation {
            return Err(TrieError::ConcurrentModification);
        }

        loop {
            if let Some(handle) = self.stack.pop() {
                if let Some(right) = tree.child(handle, Side::Right) {
                    self.stack.push(right);
                }
                if let Some(left) = tree.child(handle, Side::Left) {
                    self.stack.push(left);
                }
                if tree.data(handle).is_some() {
                    return Ok(Some(handle));
                }
                continue;
            }

            match self.pending_family.take() {
                Some(family) => {
                    self.pending_family = match family {
                        Family::V4 => Some(Family::V6),
                        Family::V6 => None,
                    };
                    if let Some(root) = tree.root_for(family) {
                        self.stack.push(root);
                    }
                    continue;
                }
                None => {
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }
}

impl<P> Tree<P> {
    /// A cursor over every real node, IPv4 subtree first. See
    /// [`PayloadIter`] for why this is a cursor rather than a standard
    /// `Iterator`.
    pub fn iter(&self) -> PayloadIter {
        PayloadIter::new(self)
    }
}
