// tests/index_parser.rs

use proptest::prelude::*;

use stepwatch::filter::{IndexParseError, StepRange, parse_indices, parse_range};

#[test]
fn lists_and_ranges_are_sorted_and_deduplicated() {
    assert_eq!(parse_indices("5,1,3,2,4").unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(parse_indices("1,3-5,7").unwrap(), vec![1, 3, 4, 5, 7]);
    assert_eq!(parse_indices("2-4,3").unwrap(), vec![2, 3, 4]);
    assert_eq!(parse_indices(" 1 , 2 ").unwrap(), vec![1, 2]);
}

#[test]
fn inverted_range_is_a_format_error() {
    assert!(matches!(parse_indices("5-3"), Err(IndexParseError::Format(_))));
}

#[test]
fn zero_is_a_range_error() {
    assert!(matches!(parse_indices("0"), Err(IndexParseError::Range(_))));
    assert!(matches!(parse_indices("0-2"), Err(IndexParseError::Range(_))));
}

#[test]
fn garbage_is_a_format_error() {
    for spec in ["", "a", "1,,2", "1-", "-2", "1-2-3"] {
        assert!(
            matches!(parse_indices(spec), Err(IndexParseError::Format(_))),
            "spec {spec:?}"
        );
    }
}

#[test]
fn range_specs_are_numeric_or_named() {
    assert_eq!(
        parse_range("2-5").unwrap(),
        StepRange::Numeric { start: 2, end: 5 }
    );
    assert_eq!(
        parse_range("2..5").unwrap(),
        StepRange::Numeric { start: 2, end: 5 }
    );
    assert_eq!(
        parse_range("Build..Test").unwrap(),
        StepRange::Named {
            start_name: "Build".into(),
            end_name: "Test".into()
        }
    );
}

proptest! {
    #[test]
    fn parsed_list_equals_the_input_set(values in proptest::collection::vec(1usize..500, 1..20)) {
        let spec = values.iter().map(usize::to_string).collect::<Vec<_>>().join(",");
        let parsed = parse_indices(&spec).unwrap();

        let mut expected = values.clone();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(parsed, expected);
    }

    #[test]
    fn dash_range_expands_inclusively(start in 1usize..100, len in 0usize..50) {
        let end = start + len;
        let parsed = parse_indices(&format!("{start}-{end}")).unwrap();
        prop_assert_eq!(parsed, (start..=end).collect::<Vec<_>>());
    }
}
