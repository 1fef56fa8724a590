//! Case-insensitive prefix filtering over an ordered name list.

/// Returns the names starting with `prefix`, ignoring case, in input order.
///
/// An empty prefix keeps every name.
#[must_use]
pub fn filter_by_prefix(names: &[String], prefix: &str) -> Vec<String> {
    if names.is_empty() {
        return Vec::new();
    }

    let prefix = prefix.to_lowercase();
    if prefix.is_empty() {
        return names.to_vec();
    }

    names
        .iter()
        .filter(|name| name.to_lowercase().starts_with(&prefix))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[rstest]
    #[case("ch", &["charmander"])]
    #[case("CH", &["charmander"])]
    #[case("", &["bulbasaur", "charmander", "squirtle"])]
    #[case("s", &["squirtle"])]
    #[case("z", &[])]
    fn test_prefix_cases(#[case] prefix: &str, #[case] expected: &[&str]) {
        let catalog = names(&["bulbasaur", "charmander", "squirtle"]);
        assert_eq!(filter_by_prefix(&catalog, prefix), names(expected));
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_by_prefix(&[], "a").is_empty());
        assert!(filter_by_prefix(&[], "").is_empty());
    }

    #[test]
    fn test_mixed_case_names() {
        let catalog = names(&["Mr-Mime", "mew", "MEWTWO"]);
        assert_eq!(filter_by_prefix(&catalog, "mE"), names(&["mew", "MEWTWO"]));
    }

    proptest! {
        #[test]
        fn prop_ordered_complete_subsequence(
            catalog in proptest::collection::vec("[a-dA-D]{0,5}", 0..40),
            prefix in "[a-dA-D]{0,2}",
        ) {
            let out = filter_by_prefix(&catalog, &prefix);
            let lower = prefix.to_lowercase();

            // Every output name matches.
            for name in &out {
                prop_assert!(name.to_lowercase().starts_with(&lower));
            }

            // Output is a subsequence of the catalog.
            let mut remaining = catalog.iter();
            for name in &out {
                prop_assert!(remaining.any(|candidate| candidate == name));
            }

            // Nothing that matches is left out.
            let matching = catalog
                .iter()
                .filter(|n| n.to_lowercase().starts_with(&lower))
                .count();
            prop_assert_eq!(out.len(), matching);

            // Same input, same output.
            prop_assert_eq!(out, filter_by_prefix(&catalog, &prefix));
        }
    }
}
