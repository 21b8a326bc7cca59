//! Property-based tests for response formatting

use super::formatter::{render, WARNING_MARKER};
use proptest::prelude::*;

fn arb_answer() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 .,!?]{0,60}",
        "[a-zA-Z ]{0,20}".prop_map(|s| format!("{WARNING_MARKER} {s}")),
        "[a-zA-Z ]{0,20}".prop_map(|s| format!("{s} \u{26a0}\u{26a0}\u{fe0f}{s}")),
        "[\u{26a0}\u{fe0f}a-z ]{0,20}",
    ]
}

proptest! {
    /// Formatting a healthy, unmarked answer twice changes nothing
    #[test]
    fn prop_healthy_formatting_is_idempotent(answer in "[a-zA-Z0-9 .,!?]{0,60}") {
        let once = render(Some(&answer), false);
        let twice = render(Some(&once), false);
        prop_assert_eq!(once, twice);
    }

    /// A degraded answer is marked once at the front and no second sign follows
    #[test]
    fn prop_marker_leads_exactly_once(answer in arb_answer()) {
        let rendered = render(Some(&answer), true);
        let rest = rendered.strip_prefix(WARNING_MARKER);
        prop_assert!(rest.is_some());
        prop_assert!(!rest.unwrap_or_default().trim_start().starts_with('\u{26a0}'), "second warning sign follows the marker");
    }

    /// Signs inside the text are kept
    #[test]
    fn prop_inner_signs_preserved(prefix in "[a-zA-Z]{1,10}", suffix in "[a-zA-Z ]{0,10}") {
        let answer = format!("{prefix} \u{26a0} {suffix}");
        let rendered = render(Some(&answer), true);
        prop_assert_eq!(rendered, format!("{WARNING_MARKER} {}", answer.trim()));
    }

    /// Marking is stable under repetition
    #[test]
    fn prop_degraded_formatting_is_idempotent(answer in arb_answer()) {
        let once = render(Some(&answer), true);
        prop_assert_eq!(render(Some(&once), true), once);
    }

    /// No answer is ever empty
    #[test]
    fn prop_rendered_never_empty(answer in proptest::option::of(arb_answer()), degraded in any::<bool>()) {
        prop_assert!(!render(answer.as_deref(), degraded).trim().is_empty());
    }
}
