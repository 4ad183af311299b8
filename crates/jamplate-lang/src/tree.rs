//! The ordered interval tree: a self-organizing hierarchy over half-open
//! ranges of one document.
//!
//! Nodes live in an arena; the four structural links (`parent`,
//! `previous`, `next`, `child`) are indices. A node carries a `parent`
//! link only while it is the first child, so exactly one of
//! `parent`/`previous` is set for every placed node.
//!
//! The structure is mutated exclusively through [`TreeArena::offer`]
//! (placement) and [`TreeArena::pop`] / [`TreeArena::remove`]
//! (detachment). Placement validates every step against the dominance
//! algebra; a failed offer returns with the structure unchanged.
//!
//! Invariants, held after every successful mutation:
//! - siblings are strictly ordered by position and pairwise disjoint,
//! - a parent encloses each child, or coincides with a child of strictly
//!   greater weight (lower weight stays outside),
//! - partial overlap between any two placed nodes is impossible.
//!
//! Not thread safe for mutation; concurrent readers are fine while no one
//! mutates.

use crate::document::Reference;
use crate::error::TreeError;
use crate::relation::{Dominance, Intersection};
use crate::sketch::SketchId;

/// Identifier of a node in a [`TreeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(u32);

impl TreeId {
    pub const fn new(id: u32) -> Self {
        TreeId(id)
    }
}

#[derive(Debug, Clone)]
struct TreeNode {
    reference: Reference,
    weight: i32,
    sketch: SketchId,
    parent: Option<TreeId>,
    previous: Option<TreeId>,
    next: Option<TreeId>,
    child: Option<TreeId>,
}

/// Arena storage for one compilation's trees.
#[derive(Debug, Clone, Default)]
pub struct TreeArena {
    nodes: Vec<TreeNode>,
}

impl TreeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a free-standing node; it joins a structure on `offer`.
    pub fn alloc(&mut self, reference: Reference, weight: i32, sketch: SketchId) -> TreeId {
        let id = TreeId(self.nodes.len() as u32);
        self.nodes.push(TreeNode {
            reference,
            weight,
            sketch,
            parent: None,
            previous: None,
            next: None,
            child: None,
        });
        id
    }

    fn node(&self, id: TreeId) -> &TreeNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: TreeId) -> &mut TreeNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn reference(&self, id: TreeId) -> Reference {
        self.node(id).reference
    }

    pub fn weight(&self, id: TreeId) -> i32 {
        self.node(id).weight
    }

    pub fn sketch(&self, id: TreeId) -> SketchId {
        self.node(id).sketch
    }

    pub fn previous(&self, id: TreeId) -> Option<TreeId> {
        self.node(id).previous
    }

    pub fn next(&self, id: TreeId) -> Option<TreeId> {
        self.node(id).next
    }

    /// The first child, if any.
    pub fn child(&self, id: TreeId) -> Option<TreeId> {
        self.node(id).child
    }

    /// The enclosing node; walks to the head of the sibling chain first.
    pub fn parent(&self, id: TreeId) -> Option<TreeId> {
        self.node(self.head(id)).parent
    }

    /// The first node of the sibling chain `id` is on.
    pub fn head(&self, id: TreeId) -> TreeId {
        let mut current = id;
        while let Some(previous) = self.node(current).previous {
            current = previous;
        }
        current
    }

    /// The last node of the sibling chain `id` is on.
    pub fn tail(&self, id: TreeId) -> TreeId {
        let mut current = id;
        while let Some(next) = self.node(current).next {
            current = next;
        }
        current
    }

    /// The direct children of `id`, in order.
    pub fn children(&self, id: TreeId) -> Vec<TreeId> {
        let mut out = Vec::new();
        let mut cursor = self.node(id).child;
        while let Some(current) = cursor {
            out.push(current);
            cursor = self.node(current).next;
        }
        out
    }

    /// `id` and every descendant, depth-first.
    pub fn hierarchy(&self, id: TreeId) -> Vec<TreeId> {
        let mut out = vec![id];
        let mut index = 0;
        while index < out.len() {
            let current = out[index];
            index += 1;
            let children = self.children(current);
            out.extend(children);
        }
        out
    }

    /// Offer `tree` into the structure of `host`. The incoming node is
    /// detached from any prior structure first; on error nothing changes.
    pub fn offer(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        match self.dominance(host, tree) {
            Dominance::None => self.offer_irrelative(host, tree),
            Dominance::Contain => self.offer_parent(host, tree),
            Dominance::Exact => self.offer_same(host, tree),
            Dominance::Part => self.offer_child(host, tree),
            Dominance::Share => Err(self.clash("invalid tree", host, tree)),
        }
    }

    /// Detach `id`, splicing its child chain into the gap it leaves.
    pub fn pop(&mut self, id: TreeId) {
        let TreeNode {
            parent: top,
            previous: start,
            next: end,
            child: bottom,
            ..
        } = *self.node(id);

        if let Some(top) = top {
            if let Some(bottom) = bottom {
                self.node_mut(top).child = Some(bottom);
                self.node_mut(bottom).parent = Some(top);
            } else if let Some(end) = end {
                self.node_mut(top).child = Some(end);
                self.node_mut(end).parent = Some(top);
                self.node_mut(end).previous = None;
            } else {
                self.node_mut(top).child = None;
            }
        } else if let Some(start) = start {
            if let Some(bottom) = bottom {
                self.node_mut(start).next = Some(bottom);
                self.node_mut(bottom).previous = Some(start);
                self.node_mut(bottom).parent = None;
            } else if let Some(end) = end {
                self.node_mut(start).next = Some(end);
                self.node_mut(end).previous = Some(start);
            } else {
                self.node_mut(start).next = None;
            }
        } else if let Some(bottom) = bottom {
            self.node_mut(bottom).parent = None;
        } else if let Some(end) = end {
            self.node_mut(end).previous = None;
        }

        if let (Some(bottom), Some(end)) = (bottom, end) {
            let tail = self.tail(bottom);
            self.node_mut(tail).next = Some(end);
            self.node_mut(end).previous = Some(tail);
        }

        let node = self.node_mut(id);
        node.parent = None;
        node.previous = None;
        node.next = None;
        node.child = None;
    }

    /// Detach `id` together with its subtree.
    pub fn remove(&mut self, id: TreeId) {
        let TreeNode {
            parent: top,
            previous: start,
            next: end,
            ..
        } = *self.node(id);

        if let Some(top) = top {
            if let Some(end) = end {
                self.node_mut(top).child = Some(end);
                self.node_mut(end).parent = Some(top);
                self.node_mut(end).previous = None;
            } else {
                self.node_mut(top).child = None;
            }
        } else if let Some(start) = start {
            if let Some(end) = end {
                self.node_mut(start).next = Some(end);
                self.node_mut(end).previous = Some(start);
            } else {
                self.node_mut(start).next = None;
            }
        } else if let Some(end) = end {
            self.node_mut(end).previous = None;
        }

        let node = self.node_mut(id);
        node.parent = None;
        node.previous = None;
        node.next = None;
    }

    fn dominance(&self, a: TreeId, b: TreeId) -> Dominance {
        Dominance::compute(self.node(a).reference, self.node(b).reference)
    }

    fn intersection(&self, a: TreeId, b: TreeId) -> Intersection {
        Intersection::compute(self.node(a).reference, self.node(b).reference)
    }

    fn clash(&self, context: &'static str, host: TreeId, tree: TreeId) -> TreeError {
        TreeError::Clash {
            context,
            host: self.node(host).reference,
            tree: self.node(tree).reference,
        }
    }

    fn illegal(&self, context: &'static str, host: TreeId, tree: TreeId) -> TreeError {
        TreeError::Illegal {
            context,
            host: self.node(host).reference,
            tree: self.node(tree).reference,
        }
    }

    fn out_of_bounds(&self, context: &'static str, host: TreeId, tree: TreeId) -> TreeError {
        TreeError::OutOfBounds {
            context,
            host: self.node(host).reference,
            tree: self.node(tree).reference,
        }
    }

    fn takeover(&self, context: &'static str, host: TreeId) -> TreeError {
        TreeError::Takeover {
            context,
            host: self.node(host).reference,
            weight: self.node(host).weight,
        }
    }

    /// Place a node unrelated to `host`: climb to the first ancestor that
    /// encloses it, then place it as a sibling on that level.
    fn offer_irrelative(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        if self.dominance(host, tree) != Dominance::None {
            return Err(self.illegal("illegal irrelative", host, tree));
        }
        let mut current = host;
        loop {
            let Some(parent) = self.parent(current) else {
                return self.offer_sibling(current, tree);
            };
            match self.dominance(parent, tree) {
                Dominance::None => current = parent,
                Dominance::Part => return self.offer_sibling(current, tree),
                Dominance::Share => return Err(self.clash("clash with ancestor", parent, tree)),
                Dominance::Contain | Dominance::Exact => {
                    return Err(self.illegal("inconsistent ancestry", parent, tree))
                }
            }
        }
    }

    fn offer_sibling(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        match self.intersection(host, tree) {
            Intersection::Next | Intersection::After => self.offer_next(host, tree),
            Intersection::Previous | Intersection::Before => self.offer_previous(host, tree),
            _ => Err(self.illegal("illegal sibling", host, tree)),
        }
    }

    /// Place a node strictly after `host` on its sibling chain.
    fn offer_next(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        match self.intersection(host, tree) {
            Intersection::Next | Intersection::After => {}
            Intersection::Same => return Err(self.takeover("invalid next", host)),
            Intersection::Overflow | Intersection::Underflow => {
                return Err(self.clash("invalid next", host, tree))
            }
            _ => return Err(self.illegal("invalid next", host, tree)),
        }

        let mut current = host;
        loop {
            let Some(end) = self.node(current).next else {
                // at the end of the chain; validate against the parent bounds
                if let Some(parent) = self.parent(current) {
                    match self.dominance(parent, tree) {
                        Dominance::Part => {}
                        Dominance::Share => {
                            return Err(self.clash("clash with parent", parent, tree))
                        }
                        Dominance::None => {
                            return Err(self.out_of_bounds("out of parent bounds", parent, tree))
                        }
                        Dominance::Contain | Dominance::Exact => {
                            return Err(self.illegal("inconsistent parent", parent, tree))
                        }
                    }
                }
                self.pop(tree);
                self.node_mut(current).next = Some(tree);
                self.node_mut(tree).previous = Some(current);
                return Ok(());
            };

            match self.intersection(end, tree) {
                Intersection::Previous | Intersection::Before => {
                    self.pop(tree);
                    self.node_mut(current).next = Some(tree);
                    self.node_mut(tree).previous = Some(current);
                    self.node_mut(tree).next = Some(end);
                    self.node_mut(end).previous = Some(tree);
                    return Ok(());
                }
                Intersection::Container | Intersection::Ahead | Intersection::Behind => {
                    return self.offer_parent(end, tree)
                }
                Intersection::Same => return self.offer_same(end, tree),
                Intersection::Fragment | Intersection::Start | Intersection::End => {
                    return self.offer_child(end, tree)
                }
                Intersection::Next | Intersection::After => current = end,
                Intersection::Overflow | Intersection::Underflow => {
                    return Err(self.clash("clash with next", end, tree))
                }
            }
        }
    }

    /// Place a node strictly before `host` on its sibling chain.
    fn offer_previous(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        match self.intersection(host, tree) {
            Intersection::Previous | Intersection::Before => {}
            Intersection::Same => return Err(self.takeover("invalid previous", host)),
            Intersection::Overflow | Intersection::Underflow => {
                return Err(self.clash("invalid previous", host, tree))
            }
            _ => return Err(self.illegal("invalid previous", host, tree)),
        }

        let mut current = host;
        loop {
            let Some(start) = self.node(current).previous else {
                // at the head of the chain; hook under the parent if any
                let parent = self.node(current).parent;
                if let Some(parent) = parent {
                    match self.dominance(parent, tree) {
                        Dominance::Part => {}
                        Dominance::Share => {
                            return Err(self.clash("clash with parent", parent, tree))
                        }
                        Dominance::None => {
                            return Err(self.out_of_bounds("out of parent bounds", parent, tree))
                        }
                        Dominance::Contain | Dominance::Exact => {
                            return Err(self.illegal("inconsistent parent", parent, tree))
                        }
                    }
                }
                self.pop(tree);
                if let Some(parent) = parent {
                    self.node_mut(parent).child = Some(tree);
                    self.node_mut(tree).parent = Some(parent);
                    self.node_mut(current).parent = None;
                }
                self.node_mut(current).previous = Some(tree);
                self.node_mut(tree).next = Some(current);
                return Ok(());
            };

            match self.intersection(start, tree) {
                Intersection::Next | Intersection::After => {
                    self.pop(tree);
                    self.node_mut(start).next = Some(tree);
                    self.node_mut(tree).previous = Some(start);
                    self.node_mut(tree).next = Some(current);
                    self.node_mut(current).previous = Some(tree);
                    return Ok(());
                }
                Intersection::Container | Intersection::Ahead | Intersection::Behind => {
                    return self.offer_parent(start, tree)
                }
                Intersection::Same => return self.offer_same(start, tree),
                Intersection::Fragment | Intersection::Start | Intersection::End => {
                    return self.offer_child(start, tree)
                }
                Intersection::Previous | Intersection::Before => current = start,
                Intersection::Overflow | Intersection::Underflow => {
                    return Err(self.clash("clash with previous", start, tree))
                }
            }
        }
    }

    /// Place a node coinciding with `host`; the weights decide the nesting
    /// direction, equal weight is a takeover.
    fn offer_same(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        match self.dominance(host, tree) {
            Dominance::Exact => {
                let diff = self.node(host).weight - self.node(tree).weight;
                if diff == 0 {
                    Err(self.takeover("exact bounds", host))
                } else if diff < 0 {
                    // the incoming is heavier; it goes inside
                    self.offer_child(host, tree)
                } else {
                    self.offer_parent(host, tree)
                }
            }
            Dominance::Contain | Dominance::None => {
                Err(self.out_of_bounds("invalid same", host, tree))
            }
            Dominance::Share => Err(self.clash("invalid same", host, tree)),
            Dominance::Part => Err(self.illegal("invalid same", host, tree)),
        }
    }

    /// Place a node that fits inside `host` among its children.
    fn offer_child(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        match self.dominance(host, tree) {
            Dominance::Part => {
                let Some(bottom) = self.node(host).child else {
                    self.pop(tree);
                    self.node_mut(host).child = Some(tree);
                    self.node_mut(tree).parent = Some(host);
                    return Ok(());
                };
                match self.intersection(bottom, tree) {
                    Intersection::Previous | Intersection::Before => {
                        self.pop(tree);
                        self.node_mut(host).child = Some(tree);
                        self.node_mut(tree).parent = Some(host);
                        self.node_mut(bottom).parent = None;
                        self.node_mut(bottom).previous = Some(tree);
                        self.node_mut(tree).next = Some(bottom);
                        Ok(())
                    }
                    Intersection::Container | Intersection::Ahead | Intersection::Behind => {
                        self.offer_parent(bottom, tree)
                    }
                    Intersection::Same => self.offer_same(bottom, tree),
                    Intersection::Fragment | Intersection::Start | Intersection::End => {
                        self.offer_child(bottom, tree)
                    }
                    Intersection::Next | Intersection::After => self.offer_next(bottom, tree),
                    Intersection::Overflow | Intersection::Underflow => {
                        Err(self.clash("clash with child", bottom, tree))
                    }
                }
            }
            Dominance::Exact => {
                // a coinciding incomer nests inside only when strictly heavier
                if self.node(host).weight >= self.node(tree).weight {
                    return Err(self.takeover("invalid child", host));
                }
                let bottom = self.node(host).child;
                if let Some(bottom) = bottom {
                    match self.dominance(bottom, tree) {
                        Dominance::Exact => {
                            let diff = self.node(bottom).weight - self.node(tree).weight;
                            if diff == 0 {
                                return Err(self.takeover("exact child bounds", bottom));
                            }
                            if diff < 0 {
                                // the first child is lighter; go deeper
                                return self.offer_child(bottom, tree);
                            }
                            // the first child is heavier; insert in between
                        }
                        Dominance::Contain => {
                            // the incomer encloses the whole child chain;
                            // insert in between
                        }
                        Dominance::Share | Dominance::Part | Dominance::None => {
                            return Err(self.illegal("inconsistent children", bottom, tree))
                        }
                    }
                }
                self.pop(tree);
                self.node_mut(host).child = Some(tree);
                self.node_mut(tree).parent = Some(host);
                if let Some(bottom) = bottom {
                    self.node_mut(bottom).parent = Some(tree);
                    self.node_mut(tree).child = Some(bottom);
                }
                Ok(())
            }
            Dominance::Contain | Dominance::None => {
                Err(self.out_of_bounds("invalid child", host, tree))
            }
            Dominance::Share => Err(self.clash("invalid child", host, tree)),
        }
    }

    /// Place a node enclosing `host`: collect the contiguous run of
    /// siblings it also encloses and re-parent them under the incomer.
    fn offer_parent(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        match self.dominance(host, tree) {
            Dominance::Exact => {
                if self.node(host).weight - self.node(tree).weight <= 0 {
                    return Err(self.takeover("invalid parent", host));
                }
            }
            Dominance::Contain => {}
            Dominance::Share => return Err(self.clash("invalid parent", host, tree)),
            Dominance::Part | Dominance::None => {
                return Err(self.illegal("invalid parent", host, tree))
            }
        }

        // backward: collect the head of the enclosed run and whatever
        // precedes it
        let mut bottom = host;
        let mut previous = None;
        let top;
        loop {
            let Some(n) = self.node(bottom).previous else {
                top = self.node(bottom).parent;
                break;
            };
            match self.dominance(n, tree) {
                Dominance::Contain => bottom = n,
                Dominance::None => {
                    previous = Some(n);
                    top = None;
                    break;
                }
                Dominance::Share => return Err(self.clash("clash with neighbor", n, tree)),
                Dominance::Exact | Dominance::Part => {
                    return Err(self.illegal("inconsistent neighbors", n, tree))
                }
            }
        }

        // forward: find the first sibling past the enclosed run
        let mut next = None;
        let mut cursor = self.node(host).next;
        while let Some(n) = cursor {
            match self.dominance(n, tree) {
                Dominance::Contain => cursor = self.node(n).next,
                Dominance::None => {
                    next = Some(n);
                    break;
                }
                Dominance::Share => return Err(self.clash("clash with neighbor", n, tree)),
                Dominance::Exact | Dominance::Part => {
                    return Err(self.illegal("inconsistent neighbors", n, tree))
                }
            }
        }

        if previous.is_none() {
            if let Some(top) = top {
                match self.dominance(top, tree) {
                    Dominance::Contain => return self.offer_parent(top, tree),
                    Dominance::Exact => return self.offer_same(top, tree),
                    Dominance::Part => {
                        self.pop(tree);
                        self.adopt_run(tree, bottom, next);
                        self.node_mut(top).child = Some(tree);
                        self.node_mut(tree).parent = Some(top);
                        return Ok(());
                    }
                    Dominance::Share => return Err(self.clash("clash with parent", top, tree)),
                    Dominance::None => return Err(self.illegal("inconsistent parent", top, tree)),
                }
            }
            self.pop(tree);
            self.adopt_run(tree, bottom, next);
            return Ok(());
        }

        let previous = previous.expect("previous sibling");
        self.pop(tree);
        self.adopt_run(tree, bottom, next);
        self.node_mut(previous).next = Some(tree);
        self.node_mut(tree).previous = Some(previous);
        Ok(())
    }

    /// Make `bottom..` (up to, excluding, `next`) the child chain of
    /// `tree`, splicing `tree` into the chain where the run used to be.
    fn adopt_run(&mut self, tree: TreeId, bottom: TreeId, next: Option<TreeId>) {
        if let Some(next) = next {
            let boundary = self.node(next).previous.expect("run boundary");
            self.node_mut(boundary).next = None;
            self.node_mut(next).previous = Some(tree);
            self.node_mut(tree).next = Some(next);
        }
        self.node_mut(bottom).parent = Some(tree);
        self.node_mut(bottom).previous = None;
        self.node_mut(tree).child = Some(bottom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::SketchArena;

    struct Fixture {
        trees: TreeArena,
        sketches: SketchArena,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                trees: TreeArena::new(),
                sketches: SketchArena::new(),
            }
        }

        fn tree(&mut self, start: u32, end: u32, weight: i32) -> TreeId {
            let sketch = self.sketches.alloc("test");
            self.trees
                .alloc(Reference::between(start, end), weight, sketch)
        }

        /// Verify the structural invariants below `root`.
        fn check(&self, root: TreeId) {
            for id in self.trees.hierarchy(root) {
                let node = self.trees.node(id);
                assert!(
                    node.parent.is_none() || node.previous.is_none(),
                    "parent and previous both set on {id:?}"
                );
                let children = self.trees.children(id);
                for pair in children.windows(2) {
                    let a = self.trees.reference(pair[0]);
                    let b = self.trees.reference(pair[1]);
                    assert!(a.position() < b.position(), "siblings out of order");
                    assert_eq!(Dominance::compute(a, b), Dominance::None, "siblings overlap");
                }
                for child in children {
                    let d = Dominance::compute(
                        self.trees.reference(id),
                        self.trees.reference(child),
                    );
                    match d {
                        Dominance::Part => {}
                        Dominance::Exact => assert!(
                            self.trees.weight(child) > self.trees.weight(id),
                            "coinciding child must be heavier"
                        ),
                        other => panic!("child not enclosed: {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_offer_builds_ordered_siblings() {
        let mut f = Fixture::new();
        let root = f.tree(0, 10, 0);
        let b = f.tree(4, 6, 0);
        let a = f.tree(0, 2, 0);
        let c = f.tree(8, 10, 0);
        f.trees.offer(root, b).unwrap();
        f.trees.offer(root, c).unwrap();
        f.trees.offer(root, a).unwrap();
        assert_eq!(f.trees.children(root), vec![a, b, c]);
        f.check(root);
    }

    #[test]
    fn test_offer_nests_contained_trees() {
        let mut f = Fixture::new();
        let root = f.tree(0, 10, 0);
        let outer = f.tree(2, 8, 0);
        let inner = f.tree(3, 5, 0);
        f.trees.offer(root, inner).unwrap();
        f.trees.offer(root, outer).unwrap();
        assert_eq!(f.trees.children(root), vec![outer]);
        assert_eq!(f.trees.children(outer), vec![inner]);
        assert_eq!(f.trees.parent(inner), Some(outer));
        f.check(root);
    }

    #[test]
    fn test_offer_parent_collects_the_enclosed_run() {
        let mut f = Fixture::new();
        let root = f.tree(0, 20, 0);
        let a = f.tree(0, 2, 0);
        let b = f.tree(4, 6, 0);
        let c = f.tree(7, 9, 0);
        let d = f.tree(12, 14, 0);
        for t in [a, b, c, d] {
            f.trees.offer(root, t).unwrap();
        }
        // encloses b and c only
        let wrapper = f.tree(3, 10, 0);
        f.trees.offer(b, wrapper).unwrap();
        assert_eq!(f.trees.children(root), vec![a, wrapper, d]);
        assert_eq!(f.trees.children(wrapper), vec![b, c]);
        f.check(root);
    }

    #[test]
    fn test_offer_share_is_a_clash() {
        let mut f = Fixture::new();
        let root = f.tree(0, 10, 0);
        let a = f.tree(0, 5, 0);
        f.trees.offer(root, a).unwrap();
        let clashing = f.tree(3, 8, 0);
        assert!(matches!(
            f.trees.offer(root, clashing),
            Err(TreeError::Clash { .. })
        ));
        // the failed offer left the structure unchanged
        assert_eq!(f.trees.children(root), vec![a]);
        f.check(root);
    }

    #[test]
    fn test_offer_same_weight_is_a_takeover() {
        let mut f = Fixture::new();
        let root = f.tree(0, 10, 0);
        let a = f.tree(2, 6, 0);
        f.trees.offer(root, a).unwrap();
        let same = f.tree(2, 6, 0);
        assert!(matches!(
            f.trees.offer(root, same),
            Err(TreeError::Takeover { .. })
        ));
        f.check(root);
    }

    #[test]
    fn test_exact_weights_nest_heavier_inside() {
        let mut f = Fixture::new();
        let root = f.tree(0, 10, 0);
        let light = f.tree(2, 6, -1);
        let heavy = f.tree(2, 6, 1);
        f.trees.offer(root, heavy).unwrap();
        f.trees.offer(root, light).unwrap();
        assert_eq!(f.trees.children(root), vec![light]);
        assert_eq!(f.trees.children(light), vec![heavy]);
        f.check(root);

        // and in the other insertion order
        let mut f = Fixture::new();
        let root = f.tree(0, 10, 0);
        let light = f.tree(2, 6, -1);
        let heavy = f.tree(2, 6, 1);
        f.trees.offer(root, light).unwrap();
        f.trees.offer(root, heavy).unwrap();
        assert_eq!(f.trees.children(root), vec![light]);
        assert_eq!(f.trees.children(light), vec![heavy]);
        f.check(root);
    }

    #[test]
    fn test_offer_irrelative_climbs_to_an_enclosing_ancestor() {
        let mut f = Fixture::new();
        let root = f.tree(0, 20, 0);
        let branch = f.tree(0, 10, 0);
        let leaf = f.tree(2, 4, 0);
        f.trees.offer(root, branch).unwrap();
        f.trees.offer(root, leaf).unwrap();
        // unrelated to leaf; belongs next to branch under root
        let other = f.tree(12, 15, 0);
        f.trees.offer(leaf, other).unwrap();
        assert_eq!(f.trees.children(root), vec![branch, other]);
        f.check(root);
    }

    #[test]
    fn test_pop_splices_children_into_the_gap() {
        let mut f = Fixture::new();
        let root = f.tree(0, 20, 0);
        let left = f.tree(0, 2, 0);
        let wrapper = f.tree(4, 12, 0);
        let x = f.tree(5, 6, 0);
        let y = f.tree(8, 10, 0);
        let right = f.tree(14, 16, 0);
        for t in [left, wrapper, right] {
            f.trees.offer(root, t).unwrap();
        }
        f.trees.offer(wrapper, x).unwrap();
        f.trees.offer(wrapper, y).unwrap();

        f.trees.pop(wrapper);
        assert_eq!(f.trees.children(root), vec![left, x, y, right]);
        f.check(root);
    }

    #[test]
    fn test_remove_drops_the_subtree() {
        let mut f = Fixture::new();
        let root = f.tree(0, 20, 0);
        let wrapper = f.tree(4, 12, 0);
        let x = f.tree(5, 6, 0);
        let right = f.tree(14, 16, 0);
        for t in [wrapper, right] {
            f.trees.offer(root, t).unwrap();
        }
        f.trees.offer(wrapper, x).unwrap();

        f.trees.remove(wrapper);
        assert_eq!(f.trees.children(root), vec![right]);
        // the removed node keeps its own subtree
        assert_eq!(f.trees.children(wrapper), vec![x]);
        f.check(root);
    }

    #[test]
    fn test_offer_routes_through_nested_hosts() {
        let mut f = Fixture::new();
        let root = f.tree(0, 20, 0);
        let a = f.tree(0, 5, 0);
        let b = f.tree(10, 15, 0);
        f.trees.offer(root, a).unwrap();
        f.trees.offer(root, b).unwrap();
        // offered at the root but belongs inside `a`
        let leaf = f.tree(1, 3, 0);
        f.trees.offer(root, leaf).unwrap();
        assert_eq!(f.trees.children(a), vec![leaf]);
        // offered at a deep node but belongs inside `b`
        let wide = f.tree(11, 14, 0);
        f.trees.offer(leaf, wide).unwrap();
        assert_eq!(f.trees.children(b), vec![wide]);
        f.check(root);
    }

    #[test]
    fn test_offer_exact_wrapper_takes_existing_children() {
        let mut f = Fixture::new();
        let root = f.tree(0, 10, 0);
        let x = f.tree(2, 4, 0);
        let y = f.tree(5, 7, 0);
        f.trees.offer(root, x).unwrap();
        f.trees.offer(root, y).unwrap();
        // same range as root, heavier: becomes the new layer inside root
        let layer = f.tree(0, 10, 5);
        f.trees.offer(root, layer).unwrap();
        assert_eq!(f.trees.children(root), vec![layer]);
        assert_eq!(f.trees.children(layer), vec![x, y]);
        f.check(root);
    }
}
