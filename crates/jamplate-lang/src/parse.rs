//! Pattern-based tree growers.
//!
//! A parser inspects one tree of a compilation and proposes new trees; the
//! driver offers them into the structure and re-runs every parser until a
//! full round places nothing new. Proposed trees may carry sketch
//! components (bound, free-standing trees) describing named sub-regions.

use std::fmt::Debug;

use regex_lite::Regex;

use crate::compilation::Compilation;
use crate::document::Reference;
use crate::relation::Dominance;
use crate::sketch::component;
use crate::tree::TreeId;

/// A tree grower; `parse` returns free-standing trees for the driver to
/// offer.
pub trait Parser: Debug {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> Vec<TreeId>;
}

/// A parser that never produces anything.
#[derive(Debug)]
pub struct IdleParser;

impl Parser for IdleParser {
    fn parse(&self, _compilation: &mut Compilation, _tree: TreeId) -> Vec<TreeId> {
        Vec::new()
    }
}

/// Whether the character at `position` is escaped by a backslash run.
pub(crate) fn is_escaped(text: &str, position: usize) -> bool {
    text[..position]
        .bytes()
        .rev()
        .take_while(|b| *b == b'\\')
        .count()
        % 2
        == 1
}

/// Whether a range intersects any direct child of `tree`.
fn covered(compilation: &Compilation, tree: TreeId, range: Reference) -> bool {
    compilation.trees().children(tree).into_iter().any(|child| {
        Dominance::compute(compilation.trees().reference(child), range) != Dominance::None
    })
}

/// Every regex match inside `tree` that is not covered by an existing
/// child, skipping escaped occurrences when asked to.
fn free_matches(
    compilation: &Compilation,
    tree: TreeId,
    pattern: &Regex,
    skip_escaped: bool,
) -> Vec<(usize, usize)> {
    let text = compilation.read(tree);
    let base = compilation.trees().reference(tree);
    pattern
        .find_iter(text)
        .filter(|found| !(skip_escaped && is_escaped(text, found.start())))
        .filter(|found| {
            let range = Reference::new(
                base.position() + found.start() as u32,
                (found.end() - found.start()) as u32,
            );
            !covered(compilation, tree, range)
        })
        .map(|found| (found.start(), found.end()))
        .collect()
}

/// Emits a single tree for the first free match of a pattern.
pub struct TermParser {
    pattern: Regex,
    kind: &'static str,
    weight: i32,
}

impl Debug for TermParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermParser")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl TermParser {
    pub fn new(pattern: &str, kind: &'static str, weight: i32) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("a valid builtin pattern"),
            kind,
            weight,
        }
    }
}

impl Parser for TermParser {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> Vec<TreeId> {
        let base = compilation.trees().reference(tree);
        let host_weight = compilation.trees().weight(tree);
        let candidate = free_matches(compilation, tree, &self.pattern, false)
            .into_iter()
            .map(|(start, end)| {
                Reference::between(base.position() + start as u32, base.position() + end as u32)
            })
            // re-proposing the host itself could never be placed
            .find(|range| !range.is_empty() && !(*range == base && self.weight == host_weight));
        match candidate {
            Some(range) => vec![compilation.tree(range, self.kind, self.weight)],
            None => Vec::new(),
        }
    }
}

/// Binds one capture group of a [`PatternParser`] to a sketch component.
#[derive(Debug, Clone, Copy)]
pub struct GroupBinding {
    pub group: usize,
    pub key: &'static str,
    pub kind: &'static str,
    pub weight: i32,
}

/// Emits a wrapper for the first free match of a pattern, binding each
/// configured capture group as a component tree.
///
/// Anchored patterns (`(?m)^…`) make this the grower for line directives.
/// Non-empty group trees are proposed after the wrapper so they join the
/// structure; empty ones are only bound in the sketch. A match is skipped
/// while an existing child covers or clashes with it; children enclosed
/// by the match are fine and get adopted on placement.
pub struct PatternParser {
    pattern: Regex,
    kind: &'static str,
    weight: i32,
    groups: Vec<GroupBinding>,
}

impl Debug for PatternParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternParser")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl PatternParser {
    pub fn new(pattern: &str, kind: &'static str, weight: i32) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("a valid builtin pattern"),
            kind,
            weight,
            groups: Vec::new(),
        }
    }

    /// Bind capture group `group` under `key`.
    pub fn group(mut self, group: usize, key: &'static str, kind: &'static str, weight: i32) -> Self {
        self.groups.push(GroupBinding {
            group,
            key,
            kind,
            weight,
        });
        self
    }
}

impl Parser for PatternParser {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> Vec<TreeId> {
        let base = compilation.trees().reference(tree);
        let text = compilation.read(tree).to_string();

        for captures in self.pattern.captures_iter(&text) {
            let whole = captures.get(0).expect("the whole match");
            let range = Reference::between(
                base.position() + whole.start() as u32,
                base.position() + whole.end() as u32,
            );
            if range.is_empty() || range == base {
                continue;
            }
            let blocked = compilation.trees().children(tree).into_iter().any(|child| {
                matches!(
                    Dominance::compute(compilation.trees().reference(child), range),
                    Dominance::Part | Dominance::Exact | Dominance::Share
                )
            });
            if blocked {
                continue;
            }

            let wrapper = compilation.tree(range, self.kind, self.weight);
            let sketch = compilation.trees().sketch(wrapper);
            let mut proposed = vec![wrapper];
            for binding in &self.groups {
                let Some(found) = captures.get(binding.group) else {
                    continue;
                };
                let part = compilation.tree(
                    Reference::between(
                        base.position() + found.start() as u32,
                        base.position() + found.end() as u32,
                    ),
                    binding.kind,
                    binding.weight,
                );
                let slot = compilation.sketches_mut().component(sketch, binding.key);
                compilation.sketches_mut().set_tree(slot, part);
                if found.end() > found.start() {
                    proposed.push(part);
                }
            }
            return proposed;
        }
        Vec::new()
    }
}

/// Emits a wrapper for a balanced open/close pair: the nearest close is
/// paired with the last open before it, which matches the innermost pair
/// first.
///
/// The wrapper is proposed together with its `open` and `close` component
/// trees (bound in the sketch), so the delimiter characters are covered
/// and cannot be re-paired by later parsers. The `body` component stays a
/// free-standing reference to the enclosed region.
pub struct DoublePatternParser {
    open: Regex,
    close: Regex,
    kind: &'static str,
    weight: i32,
    skip_escaped: bool,
}

impl Debug for DoublePatternParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoublePatternParser")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl DoublePatternParser {
    pub fn new(open: &str, close: &str, kind: &'static str, weight: i32) -> Self {
        Self {
            open: Regex::new(open).expect("a valid builtin pattern"),
            close: Regex::new(close).expect("a valid builtin pattern"),
            kind,
            weight,
            skip_escaped: false,
        }
    }

    /// Ignore matches preceded by an odd backslash run.
    pub fn skip_escaped(mut self) -> Self {
        self.skip_escaped = true;
        self
    }

}

impl Parser for DoublePatternParser {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> Vec<TreeId> {
        let base = compilation.trees().reference(tree);
        let opens = free_matches(compilation, tree, &self.open, self.skip_escaped);
        if opens.is_empty() {
            return Vec::new();
        }
        let closes = free_matches(compilation, tree, &self.close, self.skip_escaped);

        let host_weight = compilation.trees().weight(tree);
        for &(close_start, close_end) in &closes {
            // the last open strictly before this close
            let open = opens
                .iter()
                .rev()
                .find(|&&(open_start, open_end)| {
                    open_end <= close_start && (open_start, open_end) != (close_start, close_end)
                })
                .copied();
            let Some((open_start, open_end)) = open else {
                continue;
            };

            let at = |offset: usize| base.position() + offset as u32;
            let range = Reference::between(at(open_start), at(close_end));
            if range == base && self.weight == host_weight {
                // re-proposing the host itself could never be placed
                continue;
            }
            let wrapper = compilation.tree(range, self.kind, self.weight);
            let sketch = compilation.trees().sketch(wrapper);
            let mut proposed = vec![wrapper];
            for (key, tag, start, end) in [
                (component::OPEN, "part:open", open_start, open_end),
                (component::CLOSE, "part:close", close_start, close_end),
                (component::BODY, "part:body", open_end, close_start),
            ] {
                let part = compilation.tree(Reference::between(at(start), at(end)), tag, 0);
                let slot = compilation.sketches_mut().component(sketch, key);
                compilation.sketches_mut().set_tree(slot, part);
                if key != component::BODY && !compilation.trees().reference(part).is_empty() {
                    proposed.push(part);
                }
            }
            return proposed;
        }
        Vec::new()
    }
}

/// Gathers the proposals of every sub-parser.
#[derive(Debug)]
pub struct CombineParser {
    parsers: Vec<Box<dyn Parser>>,
}

impl CombineParser {
    pub fn new(parsers: Vec<Box<dyn Parser>>) -> Self {
        Self { parsers }
    }
}

impl Parser for CombineParser {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> Vec<TreeId> {
        self.parsers
            .iter()
            .flat_map(|parser| parser.parse(compilation, tree))
            .collect()
    }
}

/// Tries sub-parsers in order and keeps the first non-empty proposal.
#[derive(Debug)]
pub struct OrderParser {
    parsers: Vec<Box<dyn Parser>>,
}

impl OrderParser {
    pub fn new(parsers: Vec<Box<dyn Parser>>) -> Self {
        Self { parsers }
    }
}

impl Parser for OrderParser {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> Vec<TreeId> {
        for parser in &self.parsers {
            let proposed = parser.parse(compilation, tree);
            if !proposed.is_empty() {
                return proposed;
            }
        }
        Vec::new()
    }
}

/// Gathers sub-parser proposals, dropping any that overlaps an earlier
/// one.
#[derive(Debug)]
pub struct MergeParser {
    inner: CombineParser,
}

impl MergeParser {
    pub fn new(parsers: Vec<Box<dyn Parser>>) -> Self {
        Self {
            inner: CombineParser::new(parsers),
        }
    }
}

impl Parser for MergeParser {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> Vec<TreeId> {
        let proposed = self.inner.parse(compilation, tree);
        let mut kept: Vec<TreeId> = Vec::new();
        for candidate in proposed {
            let range = compilation.trees().reference(candidate);
            let clashes = kept.iter().any(|&earlier| {
                matches!(
                    Dominance::compute(compilation.trees().reference(earlier), range),
                    Dominance::Share | Dominance::Exact
                )
            });
            if !clashes {
                kept.push(candidate);
            }
        }
        kept
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
    fn test_is_escaped() {
        assert!(is_escaped("a\\'", 2));
        assert!(!is_escaped("a\\\\'", 3));
        assert!(!is_escaped("'", 0));
    }

    #[test]
    fn test_term_parser_finds_the_first_free_match() {
        let mut c = compilation("12 + 34");
        let root = c.root();
        let parser = TermParser::new(r"[0-9]+", "value:number", 0);

        let first = parser.parse(&mut c, root);
        assert_eq!(first.len(), 1);
        assert_eq!(c.trees().reference(first[0]), Reference::new(0, 2));
        c.offer(root, first[0]).unwrap();

        // the second round skips the covered range
        let second = parser.parse(&mut c, root);
        assert_eq!(c.trees().reference(second[0]), Reference::new(5, 2));
        c.offer(root, second[0]).unwrap();

        let third = parser.parse(&mut c, root);
        assert!(third.is_empty());
    }

    #[test]
    fn test_double_pattern_pairs_the_innermost_first() {
        let mut c = compilation("{ a { b } }");
        let root = c.root();
        let parser = DoublePatternParser::new(r"\{", r"\}", "syntax:curly", 0);

        let inner = parser.parse(&mut c, root);
        assert_eq!(c.trees().reference(inner[0]), Reference::new(4, 5));
        for &tree in &inner {
            c.offer(root, tree).unwrap();
        }

        let outer = parser.parse(&mut c, root);
        assert_eq!(c.trees().reference(outer[0]), Reference::new(0, 11));
        for &tree in &outer {
            c.offer(root, tree).unwrap();
        }

        assert!(parser.parse(&mut c, root).is_empty());
    }

    #[test]
    fn test_double_pattern_binds_components() {
        let mut c = compilation("(abc)");
        let root = c.root();
        let parser = DoublePatternParser::new(r"\(", r"\)", "syntax:round", 0);
        let wrapper = parser.parse(&mut c, root)[0];
        let sketch = c.trees().sketch(wrapper);
        let body = c.sketches().component_tree(sketch, component::BODY).unwrap();
        assert_eq!(c.trees().reference(body), Reference::new(1, 3));
        let open = c.sketches().component_tree(sketch, component::OPEN).unwrap();
        assert_eq!(c.trees().reference(open), Reference::new(0, 1));
    }

    #[test]
    fn test_double_pattern_with_identical_delimiters() {
        let mut c = compilation("'a' 'b'");
        let root = c.root();
        let parser = DoublePatternParser::new(r"'", r"'", "value:string", 0).skip_escaped();

        let first = parser.parse(&mut c, root);
        assert_eq!(c.trees().reference(first[0]), Reference::new(0, 3));
        c.offer(root, first[0]).unwrap();

        let second = parser.parse(&mut c, root);
        assert_eq!(c.trees().reference(second[0]), Reference::new(4, 3));
    }

    #[test]
    fn test_double_pattern_skips_escaped_delimiters() {
        let mut c = compilation(r"'a\'b'");
        let root = c.root();
        let parser = DoublePatternParser::new(r"'", r"'", "value:string", 0).skip_escaped();
        let found = parser.parse(&mut c, root);
        assert_eq!(c.trees().reference(found[0]), Reference::new(0, 6));
    }

    #[test]
    fn test_pattern_parser_binds_groups() {
        let mut c = compilation("#for X [1]\nrest");
        let root = c.root();
        let parser = PatternParser::new(
            r"(?m)^#([A-Za-z]+)([^\r\n]*)(?:\r\n|\r|\n|$)",
            "command",
            0,
        )
        .group(1, component::TYPE, "command:type", -1)
        .group(2, component::PARAMETER, "command:parameter", -1);

        let proposed = parser.parse(&mut c, root);
        // the line terminator belongs to the match
        assert_eq!(c.trees().reference(proposed[0]), Reference::new(0, 11));
        for &tree in &proposed {
            c.offer(root, tree).unwrap();
        }
        let sketch = c.trees().sketch(proposed[0]);
        let type_tree = c.sketches().component_tree(sketch, component::TYPE).unwrap();
        assert_eq!(c.read(type_tree), "for");
        let parameter = c
            .sketches()
            .component_tree(sketch, component::PARAMETER)
            .unwrap();
        assert_eq!(c.read(parameter), " X [1]");

        // the second round is blocked by the placed command
        assert!(parser.parse(&mut c, root).is_empty());
    }

    #[test]
    fn test_order_parser_prefers_the_first_producer() {
        let mut c = compilation("ab");
        let root = c.root();
        let parser = OrderParser::new(vec![
            Box::new(IdleParser),
            Box::new(TermParser::new("a", "first", 0)),
            Box::new(TermParser::new("b", "second", 0)),
        ]);
        let proposed = parser.parse(&mut c, root);
        assert_eq!(proposed.len(), 1);
        assert_eq!(c.kind(proposed[0]), "first");
    }

    #[test]
    fn test_merge_parser_drops_overlapping_proposals() {
        let mut c = compilation("abc");
        let root = c.root();
        let parser = MergeParser::new(vec![
            Box::new(TermParser::new("ab", "wide", 0)),
            Box::new(TermParser::new("bc", "clashing", 0)),
        ]);
        let proposed = parser.parse(&mut c, root);
        assert_eq!(proposed.len(), 1);
        assert_eq!(c.kind(proposed[0]), "wide");
    }
}
