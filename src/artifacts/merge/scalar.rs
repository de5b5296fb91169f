use crate::artifacts::roster::marking::RevisionSet;
use derive_new::new;

/// A scalar value as one side of a merge sees it
#[derive(Debug, Clone, Copy, new)]
pub struct ScalarSide<'a, T> {
    pub value: &'a T,
    pub marks: &'a RevisionSet,
    pub uncommon: &'a RevisionSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarMerge<T> {
    Resolved(T),
    Conflict,
    /// Both sides win; the ancestry input contradicts itself
    Ambiguous,
}

/// A side wins when the other side's value was last set in history it shares
fn wins_against(other_marks: &RevisionSet, other_uncommon: &RevisionSet) -> bool {
    other_marks.is_disjoint(other_uncommon)
}

/// *-merge of a single scalar
pub fn merge_scalar<T: PartialEq + Clone>(
    left: ScalarSide<'_, T>,
    right: ScalarSide<'_, T>,
) -> ScalarMerge<T> {
    if left.value == right.value {
        return ScalarMerge::Resolved(left.value.clone());
    }

    let left_wins = wins_against(right.marks, right.uncommon);
    let right_wins = wins_against(left.marks, left.uncommon);

    match (left_wins, right_wins) {
        (true, true) => ScalarMerge::Ambiguous,
        (true, false) => ScalarMerge::Resolved(left.value.clone()),
        (false, true) => ScalarMerge::Resolved(right.value.clone()),
        (false, false) => ScalarMerge::Conflict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::core::hex_id::RevisionId;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn revs(bytes: &[u8]) -> RevisionSet {
        bytes
            .iter()
            .map(|b| RevisionId::try_parse(format!("{:02x}", b).repeat(20)).unwrap())
            .collect()
    }

    #[rstest]
    #[case::agreement("a", &[1], &[1], "a", &[2], &[2], ScalarMerge::Resolved("a"))]
    #[case::right_untouched("a", &[3], &[3], "b", &[1], &[4], ScalarMerge::Resolved("a"))]
    #[case::left_untouched("a", &[1], &[3], "b", &[4], &[4], ScalarMerge::Resolved("b"))]
    #[case::both_changed("a", &[3], &[3], "b", &[4], &[4], ScalarMerge::Conflict)]
    #[case::one_of_several_marks_uncommon("a", &[1, 3], &[3], "b", &[1, 4], &[4], ScalarMerge::Conflict)]
    #[case::neither_changed("a", &[1], &[3], "b", &[2], &[4], ScalarMerge::Ambiguous)]
    fn scalar_outcomes(
        #[case] left_value: &'static str,
        #[case] left_marks: &[u8],
        #[case] left_uncommon: &[u8],
        #[case] right_value: &'static str,
        #[case] right_marks: &[u8],
        #[case] right_uncommon: &[u8],
        #[case] expected: ScalarMerge<&'static str>,
    ) {
        let (left_marks, left_uncommon) = (revs(left_marks), revs(left_uncommon));
        let (right_marks, right_uncommon) = (revs(right_marks), revs(right_uncommon));

        let merged = merge_scalar(
            ScalarSide::new(&left_value, &left_marks, &left_uncommon),
            ScalarSide::new(&right_value, &right_marks, &right_uncommon),
        );

        assert_eq!(merged, expected);
    }

    proptest! {
        #[test]
        fn outcome_does_not_depend_on_argument_order(
            left_value in 0u8..3,
            right_value in 0u8..3,
            left_marks in proptest::collection::vec(0u8..6, 1..3),
            left_uncommon in proptest::collection::vec(0u8..6, 0..4),
            right_marks in proptest::collection::vec(0u8..6, 1..3),
            right_uncommon in proptest::collection::vec(0u8..6, 0..4),
        ) {
            let left = (revs(&left_marks), revs(&left_uncommon));
            let right = (revs(&right_marks), revs(&right_uncommon));

            let forward = merge_scalar(
                ScalarSide::new(&left_value, &left.0, &left.1),
                ScalarSide::new(&right_value, &right.0, &right.1),
            );
            let backward = merge_scalar(
                ScalarSide::new(&right_value, &right.0, &right.1),
                ScalarSide::new(&left_value, &left.0, &left.1),
            );

            prop_assert_eq!(forward, backward);
        }
    }
}
