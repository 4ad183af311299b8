//! Tree-shape transformers.
//!
//! An analyzer mutates the tree in place and reports whether it changed
//! anything; the driver re-runs the whole set until a full pass reports no
//! change. Placement failures inside an analyzer count as "did nothing".

use std::fmt::Debug;

use crate::compilation::Compilation;
use crate::document::Reference;
use crate::sketch::component;
use crate::tree::TreeId;

/// A predicate over a tree and its sketch.
#[derive(Debug, Clone)]
pub enum Query {
    /// The sketch kind equals the given tag.
    Is(&'static str),
    /// The sketch kind starts with the given prefix.
    Starts(&'static str),
    /// The parent exists and matches.
    Parent(Box<Query>),
    /// Any direct child matches.
    Child(Box<Query>),
    /// Any strict ancestor matches.
    Within(Box<Query>),
    Not(Box<Query>),
    And(Vec<Query>),
    Or(Vec<Query>),
}

impl Query {
    pub fn is(kind: &'static str) -> Query {
        Query::Is(kind)
    }

    pub fn starts(prefix: &'static str) -> Query {
        Query::Starts(prefix)
    }

    pub fn parent(query: Query) -> Query {
        Query::Parent(Box::new(query))
    }

    pub fn child(query: Query) -> Query {
        Query::Child(Box::new(query))
    }

    pub fn within(query: Query) -> Query {
        Query::Within(Box::new(query))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(query: Query) -> Query {
        Query::Not(Box::new(query))
    }

    pub fn and(queries: Vec<Query>) -> Query {
        Query::And(queries)
    }

    pub fn or(queries: Vec<Query>) -> Query {
        Query::Or(queries)
    }

    pub fn test(&self, compilation: &Compilation, tree: TreeId) -> bool {
        match self {
            Query::Is(kind) => compilation.kind(tree) == *kind,
            Query::Starts(prefix) => compilation.kind(tree).starts_with(prefix),
            Query::Parent(query) => compilation
                .trees()
                .parent(tree)
                .is_some_and(|parent| query.test(compilation, parent)),
            Query::Child(query) => compilation
                .trees()
                .children(tree)
                .into_iter()
                .any(|child| query.test(compilation, child)),
            Query::Within(query) => {
                let mut cursor = compilation.trees().parent(tree);
                while let Some(current) = cursor {
                    if query.test(compilation, current) {
                        return true;
                    }
                    cursor = compilation.trees().parent(current);
                }
                false
            }
            Query::Not(query) => !query.test(compilation, tree),
            Query::And(queries) => queries.iter().all(|q| q.test(compilation, tree)),
            Query::Or(queries) => queries.iter().any(|q| q.test(compilation, tree)),
        }
    }
}

/// A tree-shape transformer; returns whether it changed anything.
pub trait Analyzer: Debug {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool;
}

/// Applies the inner analyzer to the tree and every descendant, stopping
/// at the first change so the driver sees one mutation per pass.
#[derive(Debug)]
pub struct HierarchyAnalyzer {
    inner: Box<dyn Analyzer>,
}

impl HierarchyAnalyzer {
    pub fn new(inner: Box<dyn Analyzer>) -> Self {
        Self { inner }
    }
}

impl Analyzer for HierarchyAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let trees = compilation.trees().hierarchy(tree);
        for id in trees {
            if self.inner.analyze(compilation, id) {
                return true;
            }
        }
        false
    }
}

/// Applies the inner analyzer to the direct children only.
#[derive(Debug)]
pub struct ChildrenAnalyzer {
    inner: Box<dyn Analyzer>,
}

impl ChildrenAnalyzer {
    pub fn new(inner: Box<dyn Analyzer>) -> Self {
        Self { inner }
    }
}

impl Analyzer for ChildrenAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let mut changed = false;
        for child in compilation.trees().children(tree) {
            changed |= self.inner.analyze(compilation, child);
        }
        changed
    }
}

/// Gates the inner analyzer with a query.
#[derive(Debug)]
pub struct FilterAnalyzer {
    inner: Box<dyn Analyzer>,
    query: Query,
}

impl FilterAnalyzer {
    pub fn new(inner: Box<dyn Analyzer>, query: Query) -> Self {
        Self { inner, query }
    }
}

impl Analyzer for FilterAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        if self.query.test(compilation, tree) {
            self.inner.analyze(compilation, tree)
        } else {
            false
        }
    }
}

/// Whether a tree is a delimiter part rather than an operand.
fn is_part(compilation: &Compilation, tree: TreeId) -> bool {
    compilation.kind(tree).starts_with("part:")
}

/// The first operand of the sibling chain `id` is on; delimiter parts
/// bound the walk.
pub fn operand_head(compilation: &Compilation, id: TreeId) -> TreeId {
    let mut current = id;
    while let Some(previous) = compilation.trees().previous(current) {
        if is_part(compilation, previous) {
            break;
        }
        current = previous;
    }
    current
}

/// The last operand of the sibling chain `id` is on; delimiter parts and
/// any of the `bounds` symbol kinds bound the walk.
pub fn operand_tail(compilation: &Compilation, id: TreeId, bounds: &[&str]) -> TreeId {
    let mut current = id;
    while let Some(next) = compilation.trees().next(current) {
        if is_part(compilation, next) || bounds.contains(&compilation.kind(next)) {
            break;
        }
        current = next;
    }
    current
}

/// Wraps an operator symbol together with its neighbours.
///
/// Given a symbol with both a previous and a next sibling, a wrapper is
/// offered around it, the symbol is bound as the `sign` component, and
/// two side parameters are offered covering `head…previous` and
/// `next…tail`. Delimiter parts (bracket and injection anchors) bound
/// both walks.
///
/// The left side runs back to the head of the chain, while the right
/// side stops before the next symbol listed in `operand_bounds`; with the
/// operator's own precedence group listed there, the leftmost occurrence
/// wraps first and takes only its immediate operand, so a chain like
/// `10 - 3 - 2` nests to the left.
#[derive(Debug)]
pub struct BinaryOperatorAnalyzer {
    pub wrapper_kind: &'static str,
    pub wrapper_weight: i32,
    pub side_kind: &'static str,
    pub side_weight: i32,
    /// Wrap symbols with no previous sibling, using `0`-like defaults on
    /// the left (unary usage).
    pub allow_missing_left: bool,
    /// Wrap only the last symbol of this kind on the chain, so chained
    /// occurrences nest to the left through the left side instead.
    pub rightmost_of: Option<&'static str>,
    /// Symbol kinds of the operator's precedence group; the right-side
    /// walk stops before them.
    pub operand_bounds: &'static [&'static str],
}

impl Analyzer for BinaryOperatorAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let previous = compilation
            .trees()
            .previous(tree)
            .filter(|&p| !is_part(compilation, p));
        let next = compilation
            .trees()
            .next(tree)
            .filter(|&n| !is_part(compilation, n));
        let Some(next) = next else { return false };
        if previous.is_none() && !self.allow_missing_left {
            return false;
        }
        if let Some(symbol) = self.rightmost_of {
            let mut cursor = Some(next);
            while let Some(current) = cursor {
                if compilation.kind(current) == symbol {
                    return false;
                }
                cursor = compilation.trees().next(current);
            }
        }

        let head = previous.map(|p| operand_head(compilation, p));
        let tail = operand_tail(compilation, next, self.operand_bounds);

        let start = head
            .map(|h| compilation.trees().reference(h))
            .unwrap_or_else(|| compilation.trees().reference(tree));
        let end = compilation.trees().reference(tail);
        let span = Reference::inclusive(start, end);

        let wrapper = compilation.tree(span, self.wrapper_kind, self.wrapper_weight);
        if compilation.offer(tree, wrapper).is_err() {
            return false;
        }

        let wrapper_sketch = compilation.trees().sketch(wrapper);
        let sign = compilation
            .sketches_mut()
            .component(wrapper_sketch, component::SIGN);
        compilation.sketches_mut().set_tree(sign, tree);

        if let (Some(head), Some(previous)) = (head, previous) {
            let left_span = Reference::inclusive(
                compilation.trees().reference(head),
                compilation.trees().reference(previous),
            );
            let left = compilation.tree(left_span, self.side_kind, self.side_weight);
            if compilation.offer(wrapper, left).is_ok() {
                let slot = compilation
                    .sketches_mut()
                    .component(wrapper_sketch, component::LEFT);
                compilation.sketches_mut().set_tree(slot, left);
            }
        }

        let right_span = Reference::inclusive(
            compilation.trees().reference(next),
            compilation.trees().reference(tail),
        );
        let right = compilation.tree(right_span, self.side_kind, self.side_weight);
        if compilation.offer(wrapper, right).is_ok() {
            let slot = compilation
                .sketches_mut()
                .component(wrapper_sketch, component::RIGHT);
            compilation.sketches_mut().set_tree(slot, right);
        }

        true
    }
}

/// Fuses a `start … end` command pair into a wrapping flow region with a
/// `body` component covering the text between them.
#[derive(Debug)]
pub struct BinaryFlowAnalyzer {
    pub start: Query,
    pub end: Query,
    pub wrapper_kind: &'static str,
    pub wrapper_weight: i32,
    pub body_kind: &'static str,
    pub body_weight: i32,
}

impl Analyzer for BinaryFlowAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let children = compilation.trees().children(tree);
        let Some(end_at) = children
            .iter()
            .position(|&c| self.end.test(compilation, c))
        else {
            return false;
        };
        let Some(start_tree) = children[..end_at]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.start.test(compilation, c))
        else {
            return false;
        };
        let end_tree = children[end_at];

        let start_ref = compilation.trees().reference(start_tree);
        let end_ref = compilation.trees().reference(end_tree);
        let span = Reference::inclusive(start_ref, end_ref);
        let wrapper = compilation.tree(span, self.wrapper_kind, self.wrapper_weight);
        if compilation.offer(start_tree, wrapper).is_err() {
            return false;
        }

        let wrapper_sketch = compilation.trees().sketch(wrapper);
        for (key, part) in [(component::START, start_tree), (component::END, end_tree)] {
            let slot = compilation.sketches_mut().component(wrapper_sketch, key);
            compilation.sketches_mut().set_tree(slot, part);
        }

        let body_ref = Reference::between(start_ref.end(), end_ref.position());
        let body = compilation.tree(body_ref, self.body_kind, self.body_weight);
        let slot = compilation
            .sketches_mut()
            .component(wrapper_sketch, component::BODY);
        compilation.sketches_mut().set_tree(slot, body);
        if !body_ref.is_empty() {
            let _ = compilation.offer(wrapper, body);
        }

        true
    }
}

/// Splits a region into slots around separator children.
#[derive(Debug)]
pub struct SeparatorsAnalyzer {
    pub separator: Query,
    pub slot_kind: &'static str,
    pub slot_weight: i32,
}

impl Analyzer for SeparatorsAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let children = compilation.trees().children(tree);
        if children
            .iter()
            .any(|&c| compilation.kind(c) == self.slot_kind)
        {
            return false;
        }
        let separators: Vec<TreeId> = children
            .iter()
            .copied()
            .filter(|&c| self.separator.test(compilation, c))
            .collect();
        if separators.is_empty() {
            return false;
        }

        let region = compilation.trees().reference(tree);
        let mut bounds = vec![region.position()];
        for &separator in &separators {
            let r = compilation.trees().reference(separator);
            bounds.push(r.position());
            bounds.push(r.end());
        }
        bounds.push(region.end());

        let mut changed = false;
        for slot in bounds.chunks(2) {
            let [start, end] = slot else { continue };
            if start >= end {
                continue;
            }
            let slot_tree =
                compilation.tree(Reference::between(*start, *end), self.slot_kind, self.slot_weight);
            if compilation.offer(tree, slot_tree).is_ok() {
                changed = true;
            }
        }
        changed
    }
}

/// An analyzer from a plain function.
pub struct FnAnalyzer<F>(pub F);

impl<F> Debug for FnAnalyzer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnAnalyzer")
    }
}

impl<F> Analyzer for FnAnalyzer<F>
where
    F: Fn(&mut Compilation, TreeId) -> bool,
{
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        (self.0)(compilation, tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn compilation(content: &str) -> Compilation {
        Compilation::new(Document::pseudo("test", content), "root", -1)
    }

    #[test]
    fn test_query_combinators() {
        let mut c = compilation("ab");
        let root = c.root();
        let child = c.tree(Reference::new(0, 1), "value:number", 0);
        c.offer(root, child).unwrap();

        assert!(Query::is("root").test(&c, root));
        assert!(Query::child(Query::starts("value:")).test(&c, root));
        assert!(Query::parent(Query::is("root")).test(&c, child));
        assert!(Query::within(Query::is("root")).test(&c, child));
        assert!(Query::not(Query::is("root")).test(&c, child));
        assert!(Query::and(vec![
            Query::is("value:number"),
            Query::parent(Query::is("root"))
        ])
        .test(&c, child));
    }

    #[test]
    fn test_children_analyzer_visits_direct_children_only() {
        let mut c = compilation("abc");
        let root = c.root();
        let child = c.tree(Reference::new(0, 2), "outer", 0);
        let grandchild = c.tree(Reference::new(0, 1), "inner", 0);
        c.offer(root, child).unwrap();
        c.offer(root, grandchild).unwrap();

        let analyzer = ChildrenAnalyzer::new(Box::new(FilterAnalyzer::new(
            Box::new(FnAnalyzer(|c: &mut Compilation, t| {
                let sketch = c.trees().sketch(t);
                c.sketches_mut().set_kind(sketch, "seen");
                true
            })),
            Query::not(Query::is("seen")),
        )));
        assert!(analyzer.analyze(&mut c, root));
        assert_eq!(c.kind(child), "seen");
        // the grandchild is out of reach
        assert_eq!(c.kind(grandchild), "inner");
    }

    #[test]
    fn test_binary_operator_wraps_the_sibling_chain() {
        // layout: [0,1) "1"  [2,3) "+"  [4,5) "2"  over "1 + 2"
        let mut c = compilation("1 + 2");
        let root = c.root();
        let left = c.tree(Reference::new(0, 1), "value:number", 0);
        let sign = c.tree(Reference::new(2, 1), "symbol:plus", 0);
        let right = c.tree(Reference::new(4, 1), "value:number", 0);
        for t in [left, sign, right] {
            c.offer(root, t).unwrap();
        }

        let analyzer = BinaryOperatorAnalyzer {
            wrapper_kind: "operator:adder",
            wrapper_weight: 0,
            side_kind: "parameter",
            side_weight: -1,
            allow_missing_left: false,
            rightmost_of: None,
            operand_bounds: &["symbol:plus"],
        };
        assert!(analyzer.analyze(&mut c, sign));

        let wrapper = c.trees().parent(sign).unwrap();
        assert_eq!(c.kind(wrapper), "operator:adder");
        assert_eq!(c.trees().reference(wrapper), Reference::new(0, 5));
        let sketch = c.trees().sketch(wrapper);
        let left_side = c.sketches().component_tree(sketch, component::LEFT).unwrap();
        let right_side = c
            .sketches()
            .component_tree(sketch, component::RIGHT)
            .unwrap();
        assert_eq!(c.trees().children(left_side), vec![left]);
        assert_eq!(c.trees().children(right_side), vec![right]);

        // a second run on the same sign finds no outer siblings
        assert!(!analyzer.analyze(&mut c, sign));
    }

    #[test]
    fn test_chained_operators_nest_to_the_left() {
        // layout: "1 - 2 - 3" with sign trees at both minus positions
        let mut c = compilation("1 - 2 - 3");
        let root = c.root();
        let one = c.tree(Reference::new(0, 1), "value:number", 0);
        let sign1 = c.tree(Reference::new(2, 1), "symbol:minus", 0);
        let two = c.tree(Reference::new(4, 1), "value:number", 0);
        let sign2 = c.tree(Reference::new(6, 1), "symbol:minus", 0);
        let three = c.tree(Reference::new(8, 1), "value:number", 0);
        for t in [one, sign1, two, sign2, three] {
            c.offer(root, t).unwrap();
        }

        let analyzer = BinaryOperatorAnalyzer {
            wrapper_kind: "operator:subtractor",
            wrapper_weight: 0,
            side_kind: "parameter",
            side_weight: -1,
            allow_missing_left: true,
            rightmost_of: None,
            operand_bounds: &["symbol:minus"],
        };
        // the leftmost sign wraps first and takes one operand each side
        assert!(analyzer.analyze(&mut c, sign1));
        let inner = c.trees().parent(sign1).unwrap();
        assert_eq!(c.trees().reference(inner), Reference::new(0, 5));

        // the second sign then wraps the inner wrapper as its left side
        assert!(analyzer.analyze(&mut c, sign2));
        let outer = c.trees().parent(sign2).unwrap();
        assert_eq!(c.trees().reference(outer), Reference::new(0, 9));
        let sketch = c.trees().sketch(outer);
        let left = c.sketches().component_tree(sketch, component::LEFT).unwrap();
        assert_eq!(c.trees().reference(left), Reference::new(0, 5));
        assert_eq!(c.trees().children(left), vec![inner]);
    }

    #[test]
    fn test_binary_flow_wraps_the_innermost_pair() {
        let mut c = compilation("A..B..C..D");
        let root = c.root();
        let s1 = c.tree(Reference::new(0, 1), "command:open", 0);
        let s2 = c.tree(Reference::new(3, 1), "command:open", 0);
        let e1 = c.tree(Reference::new(6, 1), "command:shut", 0);
        let e2 = c.tree(Reference::new(9, 1), "command:shut", 0);
        for t in [s1, s2, e1, e2] {
            c.offer(root, t).unwrap();
        }

        let analyzer = BinaryFlowAnalyzer {
            start: Query::is("command:open"),
            end: Query::is("command:shut"),
            wrapper_kind: "flow:test",
            wrapper_weight: 0,
            body_kind: "flow:body",
            body_weight: -2,
        };
        assert!(analyzer.analyze(&mut c, root));

        // the inner pair got fused
        let wrapper = c.trees().parent(s2).unwrap();
        assert_eq!(c.kind(wrapper), "flow:test");
        assert_eq!(c.trees().reference(wrapper), Reference::new(3, 4));

        // the second pass fuses the outer pair around it
        assert!(analyzer.analyze(&mut c, root));
        let outer = c.trees().parent(s1).unwrap();
        assert_eq!(c.trees().reference(outer), Reference::new(0, 10));
        assert_eq!(c.trees().children(root), vec![outer]);
    }

    #[test]
    fn test_separators_split_into_slots() {
        let mut c = compilation("a,b,c");
        let root = c.root();
        let comma1 = c.tree(Reference::new(1, 1), "symbol:comma", 0);
        let comma2 = c.tree(Reference::new(3, 1), "symbol:comma", 0);
        for t in [comma1, comma2] {
            c.offer(root, t).unwrap();
        }

        let analyzer = SeparatorsAnalyzer {
            separator: Query::is("symbol:comma"),
            slot_kind: "slot",
            slot_weight: -1,
        };
        assert!(analyzer.analyze(&mut c, root));
        let slots: Vec<Reference> = c
            .trees()
            .children(root)
            .into_iter()
            .filter(|&t| c.kind(t) == "slot")
            .map(|t| c.trees().reference(t))
            .collect();
        assert_eq!(
            slots,
            vec![
                Reference::new(0, 1),
                Reference::new(2, 1),
                Reference::new(4, 1)
            ]
        );

        // a second pass finds the slots in place and does nothing
        assert!(!analyzer.analyze(&mut c, root));
    }
}
