use crate::node::NodeHandle;
use crate::tree::Tree;
use crate::types::Prefix;

//------------ query operations --------------------------------------------

/// Exact match, longest/shortest covering match, and bulk covering/covered
/// enumeration, all built on top of [`Tree`]'s node storage.
impl<P> Tree<P> {
    /// Does `prefix` exist in the tree, exactly as given?
    pub fn search_exact(&self, prefix: Prefix) -> Option<NodeHandle> {
        let root = self.root_for(prefix.family())?;
        let bitlen = prefix.bitlen();

        let mut cur = root;
        loop {
            let node = self.node(cur).unwrap();
            if node.bit >= bitlen {
                break;
            }
            let side = node.side_for(&prefix);
            match node.child(side) {
                Some(next) => cur = next,
                None => break,
            }
        }

        let node = self.node(cur).unwrap();
        if node.bit > bitlen {
            return None;
        }
        let landed = node.prefix?;
        if landed == prefix {
            Some(cur)
        } else {
            None
        }
    }

    /// The most specific stored prefix that contains `prefix`. With
    /// `inclusive`, `prefix` itself is an admissible match if present.
    pub fn search_best(&self, prefix: Prefix, inclusive: bool) -> Option<NodeHandle> {
        let stack = self.descend_inclusive_stack(prefix)?;
        stack
            .into_iter()
            .rev()
            .find(|&h| self.is_admissible_match(h, &prefix, inclusive))
    }

    /// The least specific stored prefix that contains `prefix`. With
    /// `inclusive`, `prefix` itself is an admissible match if present.
    pub fn search_worst(&self, prefix: Prefix, inclusive: bool) -> Option<NodeHandle> {
        let stack = self.descend_inclusive_stack(prefix)?;
        stack
            .into_iter()
            .find(|&h| self.is_admissible_match(h, &prefix, inclusive))
    }

    /// Descends inclusively (`node.bit <= prefix.bitlen()`), collecting
    /// every *real* node visited along the way, deepest last.
    fn descend_inclusive_stack(&self, prefix: Prefix) -> Option<Vec<NodeHandle>> {
        let root = self.root_for(prefix.family())?;
        let bitlen = prefix.bitlen();
        let mut stack = Vec::new();
        let mut cur = root;
        loop {
            let node = self.node(cur).unwrap();
            if node.bit > bitlen {
                break;
            }
            if node.is_real() {
                stack.push(cur);
            }
            let side = node.side_for(&prefix);
            match node.child(side) {
                Some(next) => cur = next,
                None => break,
            }
        }
        Some(stack)
    }

    fn is_admissible_match(&self, handle: NodeHandle, query: &Prefix, inclusive: bool) -> bool {
        let node = self.node(handle).unwrap();
        let Some(candidate) = node.prefix else {
            return false;
        };
        if !inclusive && candidate.bitlen() == query.bitlen() {
            return false;
        }
        candidate.agrees_over(query, candidate.bitlen())
    }

    /// Invokes `callback` on every stored prefix that contains `prefix`
    /// (including `prefix` itself, if stored), from most to least specific.
    /// A non-zero callback result stops the walk and is returned.
    pub fn search_covering(&self, prefix: Prefix, mut callback: impl FnMut(NodeHandle) -> i32) -> i32 {
        let Some(start) = self.search_best(prefix, true) else {
            return 0;
        };
        let mut cur = Some(start);
        while let Some(h) = cur {
            let node = self.node(h).unwrap();
            if node.is_real() {
                let rc = callback(h);
                if rc != 0 {
                    return rc;
                }
            }
            cur = node.parent;
        }
        0
    }

    /// Invokes `callback` on every stored prefix contained by `prefix`. With
    /// `inclusive`, `prefix` itself is eligible if stored. A non-zero
    /// callback result stops the walk and is returned. Emission order is a
    /// DFS of the anchoring subtree and is otherwise unspecified.
    pub fn search_covered(
        &self,
        prefix: Prefix,
        inclusive: bool,
        mut callback: impl FnMut(NodeHandle) -> i32,
    ) -> i32 {
        let Some(root) = self.root_for(prefix.family()) else {
            return 0;
        };
        let bitlen = prefix.bitlen();

        let mut cur = Some(root);
        let mut prev: Option<NodeHandle> = None;
        let mut prefixed: Option<NodeHandle> = None;

        while let Some(h) = cur {
            let node = self.node(h).unwrap();
            if node.bit > bitlen {
                break;
            }
            prev = Some(h);
            if node.bit == bitlen {
                break;
            }
            if node.prefix.is_some() {
                prefixed = Some(h);
            }
            let side = node.side_for(&prefix);
            cur = node.child(side);
        }

        let anchor = match cur {
            None => match prev {
                None => return 0,
                Some(p) => p,
            },
            Some(h) => {
                if self.node(h).unwrap().prefix.is_some() {
                    prefixed = Some(h);
                }
                h
            }
        };

        if let Some(pf) = prefixed {
            let candidate = self.node(pf).unwrap().prefix.unwrap();
            let cap = candidate.bitlen().min(bitlen);
            if !candidate.agrees_over(&prefix, cap) {
                return 0;
            }
        }

        let anchor_bit = self.node(anchor).unwrap().bit;
        let checked = prefixed == Some(anchor) && anchor_bit >= bitlen;
        self.dfs_covered(anchor, bitlen, inclusive, checked, &prefix, &mut callback, 0)
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs_covered(
        &self,
        handle: NodeHandle,
        bitlen: u8,
        inclusive: bool,
        checked: bool,
        query: &Prefix,
        callback: &mut impl FnMut(NodeHandle) -> i32,
        depth: u32,
    ) -> i32 {
        let (left, right) = {
            let node = self.node(handle).unwrap();
            (node.left, node.right)
        };

        for child in [left, right] {
            let Some(c) = child else { continue };
            let cnode = self.node(c).unwrap();
            if !checked {
                if let Some(cp) = cnode.prefix {
                    let cap = cp.bitlen().min(bitlen);
                    if !cp.agrees_over(query, cap) {
                        continue;
                    }
                }
            }
            let child_checked = checked || cnode.prefix.is_some();
            let rc = self.dfs_covered(c, bitlen, inclusive, child_checked, query, callback, depth + 1);
            if rc != 0 {
                return rc;
            }
        }

        let node = self.node(handle).unwrap();
        let eligible = depth > 0
            || if inclusive {
                node.bit >= bitlen
            } else {
                node.bit > bitlen
            };
        if eligible && node.prefix.is_some() {
            return callback(handle);
        }
        0
    }

    /// Invokes `callback` on every stored prefix that intersects `prefix`:
    /// everything that covers it, then everything it covers. If the
    /// covering pass already aborted, the covered pass does not run at all.
    pub fn search_intersect(&self, prefix: Prefix, mut callback: impl FnMut(NodeHandle) -> i32) -> i32 {
        let rc = self.search_covering(prefix, &mut callback);
        if rc != 0 {
            return rc;
        }
        self.search_covered(prefix, false, &mut callback)
    }
}
