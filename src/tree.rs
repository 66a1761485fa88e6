use log::{debug, trace};

use crate::node::{Arena, Node, NodeHandle, Side};
use crate::types::{Family, Prefix, TrieError};

//------------ Tree -------------------------------------------------------------

/// A Patricia trie holding both an IPv4 and an IPv6 subtree side by side.
///
/// Nodes live in a single arena addressed by [`NodeHandle`]; there are no
/// raw pointers anywhere in the implementation. `generation` is bumped on
/// every structural mutation (insert, remove, demote-to-glue, collapse) and
/// is what lets a [`crate::PayloadIter`] detect that the tree moved out
/// from under it.
pub struct Tree<P> {
    v4_root: Option<NodeHandle>,
    v6_root: Option<NodeHandle>,
    arena: Arena<P>,
    active_nodes: usize,
    generation: u64,
}

impl<P> Default for Tree<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Tree<P> {
    pub fn new() -> Self {
        Tree {
            v4_root: None,
            v6_root: None,
            arena: Arena::new(),
            active_nodes: 0,
            generation: 0,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Tree {
            v4_root: None,
            v6_root: None,
            arena: Arena::with_capacity(cap),
            active_nodes: 0,
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.active_nodes
    }

    pub fn is_empty(&self) -> bool {
        self.active_nodes == 0
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn root_for(&self, family: Family) -> Option<NodeHandle> {
        match family {
            Family::V4 => self.v4_root,
            Family::V6 => self.v6_root,
        }
    }

    fn root_mut(&mut self, family: Family) -> &mut Option<NodeHandle> {
        match family {
            Family::V4 => &mut self.v4_root,
            Family::V6 => &mut self.v6_root,
        }
    }

    //-------- node inspection --------------------------------------------

    pub fn prefix(&self, handle: NodeHandle) -> Option<Prefix> {
        self.arena.get(handle).and_then(|n| n.prefix)
    }

    pub fn bit(&self, handle: NodeHandle) -> Option<u8> {
        self.arena.get(handle).map(|n| n.bit)
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.arena.get(handle).and_then(|n| n.parent)
    }

    pub fn is_real(&self, handle: NodeHandle) -> bool {
        self.arena.get(handle).is_some_and(Node::is_real)
    }

    pub fn data(&self, handle: NodeHandle) -> Option<&P> {
        self.arena.get(handle).and_then(|n| n.data.as_ref())
    }

    pub fn data_mut(&mut self, handle: NodeHandle) -> Option<&mut P> {
        self.arena.get_mut(handle).and_then(|n| n.data.as_mut())
    }

    /// Attaches or replaces the payload on a real node. Does not touch
    /// `generation`: payload mutation is not a structural change and does
    /// not invalidate in-flight iterators.
    pub fn set_data(&mut self, handle: NodeHandle, data: P) -> Result<Option<P>, TrieError> {
        let node = self.arena.get_mut(handle).ok_or(TrieError::NotFound)?;
        if !node.is_real() {
            return Err(TrieError::NotFound);
        }
        Ok(node.data.replace(data))
    }

    pub(crate) fn child(&self, handle: NodeHandle, side: Side) -> Option<NodeHandle> {
        self.arena.get(handle).and_then(|n| n.child(side))
    }

    pub(crate) fn node(&self, handle: NodeHandle) -> Option<&Node<P>> {
        self.arena.get(handle)
    }

    /// Which side `child` hangs off `parent` on. Panics if `child` is not
    /// actually one of `parent`'s children -- a bug in the caller, not a
    /// condition callers should be able to recover from.
    fn child_side_in_parent(&self, parent: NodeHandle, child: NodeHandle) -> Side {
        let p = self.arena.get(parent).expect("parent handle must be live");
        if p.left == Some(child) {
            Side::Left
        } else if p.right == Some(child) {
            Side::Right
        } else {
            unreachable!("child handle is not actually a child of parent")
        }
    }

    fn splice(
        &mut self,
        family: Family,
        old_parent: Option<NodeHandle>,
        old: NodeHandle,
        new: NodeHandle,
    ) {
        match old_parent {
            None => *self.root_mut(family) = Some(new),
            Some(p) => {
                let side = self.child_side_in_parent(p, old);
                self.arena.get_mut(p).unwrap().set_child(side, Some(new));
            }
        }
    }

    //-------- lookup (insert-or-find) -------------------------------------

    /// Finds the node for `prefix`, creating it (and any glue nodes needed
    /// to attach it) if it is not already present. Returns the handle to
    /// the real node either way; newly created nodes carry no payload, so
    /// callers typically follow up with [`Tree::set_data`].
    ///
    /// Descends as far as possible, computes the first bit at which the
    /// query prefix diverges from whatever real node was reached, climbs
    /// back up past any node whose own bit is already beyond that
    /// divergence point, then either reuses, extends below, inserts above,
    /// or forks at that point.
    pub fn lookup(&mut self, prefix: Prefix) -> Result<NodeHandle, TrieError> {
        let family = prefix.family();
        let bitlen = prefix.bitlen();

        let Some(root) = self.root_for(family) else {
            let handle = self.insert_node(Node {
                bit: bitlen,
                family,
                prefix: Some(prefix),
                data: None,
                parent: None,
                left: None,
                right: None,
            })?;
            *self.root_mut(family) = Some(handle);
            self.generation += 1;
            debug!("lookup: created root node for {}", prefix);
            return Ok(handle);
        };

        // Descend as far as the shape of the tree and the query prefix allow.
        let mut cur = root;
        loop {
            let node = self.arena.get(cur).expect("handle from tree must be live");
            if node.bit >= bitlen && node.prefix.is_some() {
                break;
            }
            let side = node.side_for(&prefix);
            match node.child(side) {
                Some(next) => cur = next,
                None => break,
            }
        }

        let landed = cur;
        let landed_node = self.arena.get(landed).unwrap();
        let landed_prefix = landed_node
            .prefix
            .expect("lookup always lands on a real node");
        let check_bit = landed_node.bit.min(bitlen);
        let differ_bit = prefix.differ_bit(&landed_prefix, check_bit);

        // Climb back up past any ancestor whose own bit already exceeds
        // the divergence point -- that ancestor cannot be where we attach.
        let mut cur = landed;
        loop {
            let parent = self.arena.get(cur).unwrap().parent;
            match parent {
                Some(p) if self.arena.get(p).unwrap().bit >= differ_bit => cur = p,
                _ => break,
            }
        }

        let node_bit = self.arena.get(cur).unwrap().bit;
        if differ_bit == bitlen && node_bit == bitlen {
            let node = self.arena.get_mut(cur).unwrap();
            if node.prefix.is_none() {
                node.prefix = Some(prefix);
                self.generation += 1;
                debug!("lookup: materialized glue into real node for {}", prefix);
            } else {
                trace!("lookup: exact match already present for {}", prefix);
            }
            return Ok(cur);
        }

        let new_handle = self.insert_node(Node {
            bit: bitlen,
            family,
            prefix: Some(prefix),
            data: None,
            parent: None,
            left: None,
            right: None,
        })?;

        if node_bit == differ_bit {
            // new-below: the climbed-to node gains `new` as a direct child.
            let side = self.arena.get(cur).unwrap().side_for(&prefix);
            self.arena.get_mut(new_handle).unwrap().parent = Some(cur);
            self.arena.get_mut(cur).unwrap().set_child(side, Some(new_handle));
            self.generation += 1;
            debug!("lookup: attached {} below existing node", prefix);
            return Ok(new_handle);
        }

        if bitlen == differ_bit {
            // new-above: `new` takes the climbed-to node's old position and
            // adopts it as a child, on the side selected by the *landed*
            // node's own prefix bits (not the query's) -- `landed_prefix`
            // was captured before the climb and must outlive it.
            let old_parent = self.arena.get(cur).unwrap().parent;
            let side = if bitlen < family.max_bits() && landed_prefix.bit(bitlen) {
                Side::Right
            } else {
                Side::Left
            };
            self.arena.get_mut(new_handle).unwrap().set_child(side, Some(cur));
            self.arena.get_mut(new_handle).unwrap().parent = old_parent;
            self.arena.get_mut(cur).unwrap().parent = Some(new_handle);
            self.splice(family, old_parent, cur, new_handle);
            self.generation += 1;
            debug!("lookup: inserted {} above existing node", prefix);
            return Ok(new_handle);
        }

        // fork: neither end of the divergence lines up with an existing
        // node, so a glue node is needed at `differ_bit`. `new_handle` was
        // already allocated above; if this second allocation fails, free it
        // rather than leaving it stranded in the arena, unreachable from
        // any root.
        let glue = match self.insert_node(Node {
            bit: differ_bit,
            family,
            prefix: None,
            data: None,
            parent: None,
            left: None,
            right: None,
        }) {
            Ok(h) => h,
            Err(e) => {
                self.arena.remove(new_handle);
                self.active_nodes -= 1;
                return Err(e);
            }
        };
        let old_parent = self.arena.get(cur).unwrap().parent;
        if differ_bit < family.max_bits() && prefix.bit(differ_bit) {
            self.arena.get_mut(glue).unwrap().right = Some(new_handle);
            self.arena.get_mut(glue).unwrap().left = Some(cur);
        } else {
            self.arena.get_mut(glue).unwrap().right = Some(cur);
            self.arena.get_mut(glue).unwrap().left = Some(new_handle);
        }
        self.arena.get_mut(glue).unwrap().parent = old_parent;
        self.arena.get_mut(cur).unwrap().parent = Some(glue);
        self.arena.get_mut(new_handle).unwrap().parent = Some(glue);
        self.splice(family, old_parent, cur, glue);
        self.generation += 1;
        debug!("lookup: forked glue node for {}", prefix);
        Ok(new_handle)
    }

    fn insert_node(&mut self, node: Node<P>) -> Result<NodeHandle, TrieError> {
        match self.arena.try_insert(node) {
            Ok(h) => {
                self.active_nodes += 1;
                Ok(h)
            }
            Err(_) => Err(TrieError::OutOfMemory),
        }
    }

    /// Test-only fault injection: lets `n` more allocations succeed, then
    /// fails the following one, to exercise error paths that real allocator
    /// exhaustion is not practical to trigger in a test.
    #[cfg(test)]
    pub(crate) fn force_allocation_to_fail_after(&mut self, n: u32) {
        self.arena.force_insert_to_fail_after(n);
    }

    //-------- remove --------------------------------------------------------

    /// Removes the real node named by `handle` from the tree.
    ///
    /// A node with two children is demoted to glue rather than unlinked; a
    /// node with zero or one child is unlinked outright, and if that leaves
    /// its former parent as a childless-on-one-side glue node, the glue
    /// collapses and its surviving child is spliced directly into the
    /// grandparent.
    pub fn remove(&mut self, handle: NodeHandle) -> Result<(), TrieError> {
        let node = self.arena.get(handle).ok_or(TrieError::NotFound)?;
        if !node.is_real() {
            return Err(TrieError::NotFound);
        }
        let family = node.family;
        let left = node.left;
        let right = node.right;

        if left.is_some() && right.is_some() {
            let node = self.arena.get_mut(handle).unwrap();
            node.prefix = None;
            node.data = None;
            self.generation += 1;
            debug!("remove: demoted node to glue");
            return Ok(());
        }

        let parent = node.parent;

        if left.is_none() && right.is_none() {
            self.arena.remove(handle);
            self.active_nodes -= 1;
            match parent {
                None => *self.root_mut(family) = None,
                Some(p) => {
                    let side = self.child_side_in_parent(p, handle);
                    self.arena.get_mut(p).unwrap().set_child(side, None);
                    if !self.arena.get(p).unwrap().is_real() {
                        self.collapse_glue(family, p);
                    }
                }
            }
            self.generation += 1;
            debug!("remove: unlinked leaf node");
            return Ok(());
        }

        // Exactly one child: splice it directly into the removed node's spot.
        let child = left.or(right).unwrap();
        self.arena.get_mut(child).unwrap().parent = parent;
        self.arena.remove(handle);
        self.active_nodes -= 1;
        match parent {
            None => *self.root_mut(family) = Some(child),
            Some(p) => {
                let side = self.child_side_in_parent(p, handle);
                self.arena.get_mut(p).unwrap().set_child(side, Some(child));
            }
        }
        self.generation += 1;
        debug!("remove: spliced out single-child node");
        Ok(())
    }

    /// Collapses a glue node that a just-completed removal left with only
    /// one child, reattaching the survivor directly to the glue's parent
    /// (or making it the subtree root).
    fn collapse_glue(&mut self, family: Family, glue: NodeHandle) {
        let g = self.arena.get(glue).unwrap();
        let survivor = g
            .left
            .or(g.right)
            .expect("glue node must retain exactly one child to collapse");
        let grandparent = g.parent;
        self.arena.get_mut(survivor).unwrap().parent = grandparent;
        match grandparent {
            None => *self.root_mut(family) = Some(survivor),
            Some(gp) => {
                let side = self.child_side_in_parent(gp, glue);
                self.arena.get_mut(gp).unwrap().set_child(side, Some(survivor));
            }
        }
        self.arena.remove(glue);
        self.active_nodes -= 1;
        trace!("remove: collapsed glue node");
    }

    //-------- whole-tree teardown -------------------------------------------

    /// Drops every node without running any per-payload logic.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.v4_root = None;
        self.v6_root = None;
        self.active_nodes = 0;
        self.generation += 1;
    }

    /// Drops every node, calling `finalizer` on the payload of each real
    /// node first. Traversal order is unspecified.
    pub fn clear_with(&mut self, mut finalizer: impl FnMut(Prefix, P)) {
        for family in [Family::V4, Family::V6] {
            if let Some(root) = self.root_for(family) {
                self.finalize_subtree(root, &mut finalizer);
            }
        }
        self.clear();
    }

    fn finalize_subtree(&mut self, handle: NodeHandle, finalizer: &mut impl FnMut(Prefix, P)) {
        let (left, right) = {
            let node = self.arena.get(handle).unwrap();
            (node.left, node.right)
        };
        if let Some(l) = left {
            self.finalize_subtree(l, finalizer);
        }
        if let Some(r) = right {
            self.finalize_subtree(r, finalizer);
        }
        if let Some(node) = self.arena.get_mut(handle) {
            if let (Some(prefix), Some(data)) = (node.prefix, node.data.take()) {
                finalizer(prefix, data);
            }
        }
    }

    /// Consumes the tree, dropping every node.
    pub fn destroy(self) {
        // Dropping `self` drops the arena and every payload it holds.
    }

    /// Consumes the tree, calling `finalizer` on the payload of each real
    /// node before dropping it. Traversal order is unspecified.
    pub fn destroy_with(mut self, finalizer: impl FnMut(Prefix, P)) {
        self.clear_with(finalizer);
    }
}
