//! Property-based tests for the error taxonomy
//!
//! Tests that verify correctness properties of classified errors: wrapping,
//! reason ordering and reason parsing.
//! **Feature: ricecoder-dispatch, Property 6: Error taxonomy**

use proptest::prelude::*;
use ricecoder_dispatch::{wrap_error, AppError, DispatchError, ErrorKind, Reason};
use serde_json::{json, Value};

// Strategy for generating error kinds
fn error_kind_strategy() -> impl Strategy<Value = ErrorKind> {
    prop::sample::select(ErrorKind::ALL.to_vec())
}

// Strategy for generating reasons
fn reason_strategy() -> impl Strategy<Value = Reason> {
    ("[a-z]{1,8}(\\.[a-z]{1,8}){0,2}", "[A-Za-z ]{1,30}")
        .prop_map(|(path, message)| Reason::new(path, message))
}

proptest! {
    /// Property 6.1: Wrapping a classified error is the identity
    #[test]
    fn prop_wrap_keeps_classified_errors(kind in error_kind_strategy(), message in "[A-Za-z ]{1,30}") {
        let err = AppError::new(kind).with_message(message.clone());
        let wrapped = wrap_error(err.into());

        prop_assert_eq!(wrapped.kind(), kind);
        prop_assert_eq!(wrapped.message(), message.as_str());
        prop_assert!(wrapped.original_error().is_none());
    }

    /// Property 6.2: Wrapping a foreign error yields internal with the
    /// original preserved
    #[test]
    fn prop_wrap_foreign_errors(message in "[A-Za-z ]{1,30}") {
        let wrapped = wrap_error(anyhow::anyhow!(message.clone()));

        prop_assert_eq!(wrapped.kind(), ErrorKind::Internal);
        prop_assert_eq!(wrapped.message(), ErrorKind::Internal.default_message());
        prop_assert_eq!(wrapped.original_error().map(|e| e.to_string()), Some(message));
    }

    /// Property 6.3: Reasons keep insertion order, however they are added
    #[test]
    fn prop_reasons_keep_order(
        first in prop::collection::vec(reason_strategy(), 0..5),
        second in prop::collection::vec(reason_strategy(), 0..5),
    ) {
        let mut err = AppError::validation("Invalid input").with_reasons(first.clone());
        for reason in &second {
            err.add_reason(reason.clone());
        }

        let expected: Vec<Reason> = first.iter().chain(second.iter()).cloned().collect();
        prop_assert_eq!(err.has_reasons(), !expected.is_empty());
        prop_assert_eq!(err.reasons().unwrap_or_default(), expected.as_slice());
        prop_assert_eq!(err.to_json().reasons.unwrap_or_default(), expected);
    }

    /// Property 6.4: Reason parsing is all-or-nothing
    #[test]
    fn prop_invalid_reason_appends_nothing(
        valid in prop::collection::vec(reason_strategy(), 0..4),
        broken_at in 0usize..4,
    ) {
        let mut entries: Vec<Value> = valid
            .iter()
            .map(|reason| serde_json::to_value(reason).unwrap())
            .collect();
        let index = broken_at.min(entries.len());
        entries.insert(index, json!({ "path": 1, "message": "not a string path" }));

        let mut err = AppError::validation("Invalid input");
        let result = err.add_reason_json(&Value::Array(entries));

        prop_assert!(matches!(result, Err(DispatchError::InvalidReason(_))));
        prop_assert!(!err.has_reasons());
    }
}

#[test]
fn test_reason_extra_fields_round_trip_on_the_wire() {
    let mut err = AppError::validation("Invalid input");
    err.add_reason_json(&json!({ "path": "age", "message": "Too young", "min": 18 }))
        .unwrap();

    assert_eq!(
        serde_json::to_value(&err).unwrap()["reasons"],
        json!([{ "path": "age", "message": "Too young", "min": 18 }])
    );
    assert_eq!(
        err.reasons().unwrap()[0],
        Reason::new("age", "Too young").with_field("min", json!(18))
    );
}

#[test]
fn test_from_json_rejects_unknown_types() {
    let err = AppError::from_json(&json!({ "type": "teapot", "message": "short and stout" }))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "error type 'teapot' not found - could not build error from JSON"
    );

    let err = AppError::from_json(&json!({ "message": "no type" })).unwrap_err();
    assert!(matches!(err, DispatchError::UnknownErrorType(ref t) if t == "undefined"));
}
