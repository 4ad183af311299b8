//! Closed-form classification of how two half-open ranges relate.
//!
//! Both enums describe the *second* operand relative to the first: for
//! `compute(a, b)`, `Dominance::Contain` means `b` encloses `a` and
//! `Dominance::Part` means `b` fits inside `a`. With `a = [i, j)` and
//! `b = [s, e)` the classes partition the whole valid plane, so every pair
//! of ranges lands in exactly one class.

use crate::document::Reference;
use crate::error::RelationError;

/// The fine-grained relation between two ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intersection {
    /// `i == s && j == e`; the ranges coincide.
    Same,
    /// `i < s && e < j`; the second range is strictly inside the first.
    Fragment,
    /// `s < i && j < e`; the second range strictly encloses the first.
    Container,
    /// `i == s && e < j`; inside, sharing the start.
    Start,
    /// `i < s && e == j`; inside, sharing the end.
    End,
    /// `i == s && j < e`; enclosing, sharing the start.
    Ahead,
    /// `s < i && j == e`; enclosing, sharing the end.
    Behind,
    /// `j == s`; the second range begins exactly at the first's end.
    Next,
    /// `e == i`; the second range ends exactly at the first's start.
    Previous,
    /// `j < s`; strictly after.
    After,
    /// `e < i`; strictly before.
    Before,
    /// `i < s < j < e`; the second range hangs off the first's end.
    Overflow,
    /// `s < i < e < j`; the second range hangs off the first's start.
    Underflow,
}

impl Intersection {
    /// How `b` relates over `a`.
    pub fn compute(a: Reference, b: Reference) -> Intersection {
        intersection_unchecked(a.position(), a.end(), b.position(), b.end())
    }

    /// The intersection seen from the other range's point of view.
    pub fn opposite(self) -> Intersection {
        match self {
            Intersection::Same => Intersection::Same,
            Intersection::Fragment => Intersection::Container,
            Intersection::Container => Intersection::Fragment,
            Intersection::Start => Intersection::Ahead,
            Intersection::Ahead => Intersection::Start,
            Intersection::End => Intersection::Behind,
            Intersection::Behind => Intersection::End,
            Intersection::Next => Intersection::Previous,
            Intersection::Previous => Intersection::Next,
            Intersection::After => Intersection::Before,
            Intersection::Before => Intersection::After,
            Intersection::Overflow => Intersection::Underflow,
            Intersection::Underflow => Intersection::Overflow,
        }
    }

    /// The coarse projection of this intersection.
    pub fn dominance(self) -> Dominance {
        match self {
            Intersection::Same => Dominance::Exact,
            Intersection::Container | Intersection::Ahead | Intersection::Behind => {
                Dominance::Contain
            }
            Intersection::Fragment | Intersection::Start | Intersection::End => Dominance::Part,
            Intersection::Overflow | Intersection::Underflow => Dominance::Share,
            Intersection::Next
            | Intersection::Previous
            | Intersection::After
            | Intersection::Before => Dominance::None,
        }
    }

    pub fn test(self, a: Reference, b: Reference) -> bool {
        Intersection::compute(a, b) == self
    }
}

/// The coarse relation between two ranges; decides whether a candidate can
/// be placed inside, around, or beside another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dominance {
    /// The ranges coincide.
    Exact,
    /// The second range encloses the first.
    Contain,
    /// The second range fits inside the first.
    Part,
    /// The ranges partially overlap; never placeable.
    Share,
    /// The ranges are disjoint (possibly touching).
    None,
}

impl Dominance {
    /// How dominant `b` is over `a`.
    pub fn compute(a: Reference, b: Reference) -> Dominance {
        dominance_unchecked(a.position(), a.end(), b.position(), b.end())
    }

    pub fn opposite(self) -> Dominance {
        match self {
            Dominance::Exact => Dominance::Exact,
            Dominance::Contain => Dominance::Part,
            Dominance::Part => Dominance::Contain,
            Dominance::Share => Dominance::Share,
            Dominance::None => Dominance::None,
        }
    }

    pub fn test(self, a: Reference, b: Reference) -> bool {
        Dominance::compute(a, b) == self
    }
}

/// How the area `[s, e)` intersects the area `[i, j)`, validating bounds.
pub fn intersection(i: u32, j: u32, s: u32, e: u32) -> Result<Intersection, RelationError> {
    if i > j || s > e {
        return Err(RelationError::InvalidRange { i, j, s, e });
    }
    Ok(intersection_unchecked(i, j, s, e))
}

/// How dominant the area `[s, e)` is over the area `[i, j)`, validating
/// bounds.
pub fn dominance(i: u32, j: u32, s: u32, e: u32) -> Result<Dominance, RelationError> {
    if i > j || s > e {
        return Err(RelationError::InvalidRange { i, j, s, e });
    }
    Ok(dominance_unchecked(i, j, s, e))
}

fn intersection_unchecked(i: u32, j: u32, s: u32, e: u32) -> Intersection {
    if i == s && j == e {
        Intersection::Same
    } else if j < s {
        Intersection::After
    } else if e < i {
        Intersection::Before
    } else if i == s {
        // shares the start; j != e
        if j < e {
            Intersection::Ahead
        } else {
            Intersection::Start
        }
    } else if j == e {
        // shares the end; i != s
        if s < i {
            Intersection::Behind
        } else {
            Intersection::End
        }
    } else if s < i && j < e {
        Intersection::Container
    } else if i < s && e < j {
        Intersection::Fragment
    } else if j == s {
        Intersection::Next
    } else if e == i {
        Intersection::Previous
    } else if i < s {
        Intersection::Overflow
    } else {
        Intersection::Underflow
    }
}

fn dominance_unchecked(i: u32, j: u32, s: u32, e: u32) -> Dominance {
    if i == s && j == e {
        Dominance::Exact
    } else if (s < i && j < e) || (i == s && j < e) || (s < i && j == e) {
        Dominance::Contain
    } else if (i < s && e < j) || (i == s && e < j) || (i < s && j == e) {
        Dominance::Part
    } else if (i < s && s < j && j < e) || (s < i && i < e && e < j) {
        Dominance::Share
    } else {
        Dominance::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn references() -> impl Iterator<Item = Reference> {
        (0..=8u32).flat_map(|start| (start..=8).map(move |end| Reference::between(start, end)))
    }

    #[test]
    fn test_opposite_is_involutive() {
        for a in references() {
            for b in references() {
                let ab = Intersection::compute(a, b);
                let ba = Intersection::compute(b, a);
                assert_eq!(ab.opposite(), ba, "{a} vs {b}");
                assert_eq!(ab.opposite().opposite(), ab);
                assert_eq!(
                    Dominance::compute(a, b).opposite(),
                    Dominance::compute(b, a),
                    "{a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_dominance_matches_intersection_projection() {
        for a in references() {
            for b in references() {
                assert_eq!(
                    Intersection::compute(a, b).dominance(),
                    Dominance::compute(a, b),
                    "{a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_every_pair_is_classified_once() {
        // each pair must satisfy exactly one class's defining condition
        for a in references() {
            for b in references() {
                let (i, j, s, e) = (a.position(), a.end(), b.position(), b.end());
                let got = Intersection::compute(a, b);
                let by_condition = [
                    (Intersection::Same, i == s && j == e),
                    (Intersection::Fragment, i < s && e < j),
                    (Intersection::Container, s < i && j < e),
                    (Intersection::Start, i == s && e < j),
                    (Intersection::End, i < s && e == j),
                    (Intersection::Ahead, i == s && j < e),
                    (Intersection::Behind, s < i && j == e),
                    (Intersection::Next, i < j && j == s && s < e),
                    (Intersection::Previous, s < e && e == i && i < j),
                    (Intersection::After, j < s),
                    (Intersection::Before, e < i),
                    (Intersection::Overflow, i < s && s < j && j < e),
                    (Intersection::Underflow, s < i && i < e && e < j),
                ];
                let matching: Vec<_> = by_condition
                    .iter()
                    .filter(|(_, holds)| *holds)
                    .map(|(class, _)| *class)
                    .collect();
                assert!(
                    matching.contains(&got),
                    "{a} vs {b}: computed {got:?}, conditions matched {matching:?}"
                );
            }
        }
    }

    #[rstest]
    #[case(0, 5, 0, 5, Intersection::Same)]
    #[case(0, 5, 1, 4, Intersection::Fragment)]
    #[case(1, 4, 0, 5, Intersection::Container)]
    #[case(0, 5, 0, 3, Intersection::Start)]
    #[case(0, 5, 2, 5, Intersection::End)]
    #[case(0, 3, 0, 5, Intersection::Ahead)]
    #[case(2, 5, 0, 5, Intersection::Behind)]
    #[case(0, 2, 2, 5, Intersection::Next)]
    #[case(2, 5, 0, 2, Intersection::Previous)]
    #[case(0, 2, 3, 5, Intersection::After)]
    #[case(3, 5, 0, 2, Intersection::Before)]
    #[case(0, 3, 2, 5, Intersection::Overflow)]
    #[case(2, 5, 0, 3, Intersection::Underflow)]
    fn test_canonical_classes(
        #[case] i: u32,
        #[case] j: u32,
        #[case] s: u32,
        #[case] e: u32,
        #[case] expected: Intersection,
    ) {
        assert_eq!(
            Intersection::compute(Reference::between(i, j), Reference::between(s, e)),
            expected
        );
    }

    #[rstest]
    #[case(0, 2, 2, 5, Dominance::None)]
    #[case(0, 5, 0, 5, Dominance::Exact)]
    #[case(1, 4, 0, 5, Dominance::Contain)]
    #[case(0, 5, 1, 4, Dominance::Part)]
    #[case(0, 3, 2, 5, Dominance::Share)]
    fn test_dominance_classes(
        #[case] i: u32,
        #[case] j: u32,
        #[case] s: u32,
        #[case] e: u32,
        #[case] expected: Dominance,
    ) {
        assert_eq!(
            Dominance::compute(Reference::between(i, j), Reference::between(s, e)),
            expected
        );
        assert!(expected.test(Reference::between(i, j), Reference::between(s, e)));
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        assert!(matches!(
            intersection(5, 2, 0, 1),
            Err(RelationError::InvalidRange { .. })
        ));
        assert!(matches!(
            dominance(0, 1, 5, 2),
            Err(RelationError::InvalidRange { .. })
        ));
        assert!(intersection(0, 1, 0, 2).is_ok());
    }
}
