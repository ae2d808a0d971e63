#![forbid(unsafe_code)]

use proptest::prelude::*;
use webmail_core::forms::reply_subject;
use webmail_core::render::{capitalize_words, preview};

proptest! {
    #[test]
    fn reply_prefix_is_idempotent(subject in ".{0,40}") {
        let once = reply_subject(&subject);
        prop_assert!(once.starts_with("Re:"));
        prop_assert_eq!(reply_subject(&once), once.clone());
    }

    #[test]
    fn preview_never_exceeds_limit(body in "\\PC{0,200}", limit in 1usize..150) {
        let (shown, truncated) = preview(&body, limit);
        let total = body.chars().count();
        prop_assert_eq!(shown.chars().count(), total.min(limit));
        prop_assert_eq!(truncated, total > limit);
        prop_assert!(body.starts_with(&shown));
    }

    #[test]
    fn capitalizing_keeps_length_for_ascii(text in "[a-z_ ]{0,30}") {
        prop_assert_eq!(capitalize_words(&text).len(), text.len());
    }
}
