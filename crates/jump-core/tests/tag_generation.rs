use jump_core::tags::{MAX_TAGS_DOUBLE_ONLY, MAX_TAGS_WITH_SINGLE};
use jump_core::TagScheme;
use proptest::prelude::*;
use std::collections::HashSet;

fn schemes() -> impl Strategy<Value = TagScheme> {
    (any::<bool>(), any::<bool>()).prop_map(|(include_single_char, uppercase)| TagScheme {
        include_single_char,
        uppercase,
    })
}

proptest! {
    #[test]
    fn decode_inverts_generate(scheme in schemes(), n in 0usize..MAX_TAGS_DOUBLE_ONLY) {
        let tag = scheme.generate(n);
        prop_assert_eq!(scheme.decode(&tag), Some(n));
    }

    #[test]
    fn tag_length_never_decreases(scheme in schemes(), n in 0usize..MAX_TAGS_DOUBLE_ONLY - 1) {
        prop_assert!(scheme.tag_len(n) <= scheme.tag_len(n + 1));
    }

    #[test]
    fn tags_use_one_case(scheme in schemes(), n in 0usize..MAX_TAGS_DOUBLE_ONLY) {
        let tag = scheme.generate(n);
        if scheme.uppercase {
            prop_assert!(tag.chars().all(|c| c.is_ascii_uppercase()));
        } else {
            prop_assert!(tag.chars().all(|c| c.is_ascii_lowercase()));
        }
    }
}

#[test]
fn every_tag_of_a_full_session_is_distinct() {
    for scheme in [
        TagScheme::default(),
        TagScheme {
            include_single_char: false,
            uppercase: false,
        },
    ] {
        let tags: HashSet<String> = (0..scheme.capacity()).map(|n| scheme.generate(n)).collect();
        assert_eq!(tags.len(), scheme.capacity());
    }
}

#[test]
fn capacities_bound_tag_length() {
    let with_single = TagScheme::default();
    assert_eq!(with_single.capacity(), MAX_TAGS_WITH_SINGLE);
    assert_eq!(with_single.max_tag_len(26), 1);
    assert_eq!(with_single.max_tag_len(27), 2);
    assert_eq!(with_single.max_tag_len(MAX_TAGS_WITH_SINGLE), 3);

    let double_only = TagScheme {
        include_single_char: false,
        uppercase: true,
    };
    assert_eq!(double_only.capacity(), MAX_TAGS_DOUBLE_ONLY);
    assert_eq!(double_only.generate(0), "AA");
    assert_eq!(double_only.max_tag_len(MAX_TAGS_DOUBLE_ONLY), 2);
    assert_eq!(double_only.decode("zz"), Some(675));
}
