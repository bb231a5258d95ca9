//! Property 3: for every subject, a valid publish subject is also a
//! valid subscribe pattern (the reverse need not hold), and the fixed
//! counter-examples from the property statement hold.

use nats_client_core::{validate_publish, validate_subscribe};
use proptest::prelude::*;

fn token_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,8}"
}

fn subject_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(token_strategy(), 1..6).prop_map(|tokens| tokens.join("."))
}

proptest! {
    #[test]
    fn publish_valid_implies_subscribe_valid(subject in subject_strategy()) {
        if validate_publish(&subject).is_ok() {
            prop_assert!(validate_subscribe(&subject).is_ok());
        }
    }
}

#[test]
fn fixed_counterexamples_from_the_property_statement() {
    assert!(validate_subscribe("a.>.b").is_err());
    assert!(validate_subscribe("a.*").is_ok());
    assert!(validate_publish("a.*").is_err());
}
