//! Property-Based Tests for cryptauth
//!
//! These tests verify:
//! - Enum string round-trips (parse → to_string → parse)
//! - The fact parser never panics and keeps its uninitialized invariant
//! - Command building is deterministic and secret-independent in shape
//! - The strength predicate agrees with its per-class helpers

use proptest::prelude::*;

use cryptauth::secret::{has_digit, has_lowercase, has_punctuation, has_uppercase, MIN_STRONG_LEN};
use cryptauth::{
    is_strong_secret, parse, Action, AuthError, CommandBuilder, CommandIntent, IntentFlag, MethodType,
    ResourceAuthState,
};

// =============================================================================
// Enum Property Tests
// =============================================================================

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Initialize),
        Just(Action::Add),
        Just(Action::Delete),
        Just(Action::Unlock),
        Just(Action::Check),
    ]
}

fn method_type_strategy() -> impl Strategy<Value = MethodType> {
    prop_oneof![
        Just(MethodType::Passphrase),
        Just(MethodType::Keyfile),
        Just(MethodType::Pks),
    ]
}

proptest! {
    /// Action: to_string → parse round-trip is identity
    #[test]
    fn action_roundtrip(action in action_strategy()) {
        let parsed: Action = action.to_string().parse().expect("Should parse");
        prop_assert_eq!(action, parsed);
    }

    /// MethodType: the CLI spelling parses back, in any case
    #[test]
    fn method_type_roundtrip(method_type in method_type_strategy()) {
        let s = method_type.to_string();
        prop_assert_eq!(s.parse::<MethodType>().expect("Should parse"), method_type);
        prop_assert_eq!(s.to_uppercase().parse::<MethodType>().expect("Should parse"), method_type);
    }

    /// Arbitrary strings never panic the enum parsers
    #[test]
    fn enum_parse_doesnt_crash(s in ".*") {
        let _ = s.parse::<Action>();
        let _ = s.parse::<MethodType>();
    }
}

// =============================================================================
// Fact Parser Property Tests
// =============================================================================

proptest! {
    /// Any text is either rejected or yields a state honoring the invariant
    #[test]
    fn parse_never_panics(raw in "(.{0,40}\n){0,8}") {
        if let Ok(state) = parse("testlv", &raw) {
            if !state.initialized {
                prop_assert!(!state.locked);
                prop_assert!(state.methods.is_empty());
                prop_assert!(state.all_indices.is_empty());
            }
        }
    }

    /// Slot indices are recorded regardless of surrounding noise lines
    #[test]
    fn parse_collects_slot_indices(indices in prop::collection::btree_set(0u32..64, 0..6)) {
        let mut raw = String::from("NAME  CRYPTO_STATUS  KEY_PROTECTION_METHODS\ntestlv  locked\n");
        for i in &indices {
            raw.push_str(&format!("  #{}  PKS\n  noise line {}\n", i, i));
        }

        let state = parse("testlv", &raw).expect("valid status");
        let mut expected: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
        expected.sort();
        let actual: Vec<String> = state.all_indices.iter().cloned().collect();
        prop_assert_eq!(actual, expected);
    }
}

// =============================================================================
// Command Builder Property Tests
// =============================================================================

fn state_with(names: &[&str]) -> ResourceAuthState {
    let mut state = ResourceAuthState::uninitialized("testlv");
    state.initialized = true;
    state.locked = true;
    for (i, name) in names.iter().enumerate() {
        state.all_names.insert(name.to_string());
        state.all_indices.insert(i.to_string());
    }
    state
}

proptest! {
    /// Same intent and facts always produce the same argv
    #[test]
    fn build_is_deterministic(
        name in "[a-z]{1,8}",
        detail in proptest::option::of("/[a-z]{1,8}"),
        force in any::<bool>(),
    ) {
        let builder = CommandBuilder::new("/usr/sbin/hdcryptmgr");
        let state = state_with(&[name.as_str()]);
        let mut intent = CommandIntent::new(Action::Delete, "testlv")
            .with_type(MethodType::Pks)
            .with_name(name.clone());
        intent.method_detail = detail;
        if force {
            intent.flags.insert(IntentFlag::Force);
        }

        let first = builder.build(&intent, &state);
        let second = builder.build(&intent, &state);
        prop_assert_eq!(first.is_ok(), second.is_ok());
        if let (Ok(a), Ok(b)) = (first, second) {
            prop_assert_eq!(&a.argv, &b.argv);
            prop_assert_eq!(a.argv.last().map(String::as_str), Some("testlv"));
            prop_assert_eq!(a.argv.iter().any(|x| x == "-f"), force);
        }
    }

    /// The secret only picks the script, never the argv
    #[test]
    fn secret_does_not_shape_argv(secret in "[ -~]{1,24}", name in "[a-z]{3,8}") {
        let builder = CommandBuilder::new("/usr/sbin/hdcryptmgr");
        let intent = CommandIntent::new(Action::Add, "testlv")
            .with_type(MethodType::Passphrase)
            .with_name(name)
            .with_secret(secret.as_str());

        let built = builder.build(&intent, &state_with(&[])).expect("valid add");
        prop_assert!(built.needs_interactive);
        prop_assert!(built.prompt_kind.is_some());
        let baseline = builder
            .build(&intent.clone().with_secret("x"), &state_with(&[]))
            .expect("valid add");
        prop_assert_eq!(built.argv, baseline.argv);
    }

    /// A missing secret fails the same way for every passphrase action
    #[test]
    fn missing_secret_rejected(action in prop_oneof![
        Just(Action::Add),
        Just(Action::Unlock),
        Just(Action::Check),
        Just(Action::Delete),
    ]) {
        let builder = CommandBuilder::new("/usr/sbin/hdcryptmgr");
        let intent = CommandIntent::new(action, "testlv")
            .with_type(MethodType::Passphrase)
            .with_name(if action == Action::Add { "fresh" } else { "initpwd" });

        let err = builder.build(&intent, &state_with(&["initpwd"])).unwrap_err();
        prop_assert!(matches!(err, AuthError::Validation(_)));
        prop_assert!(err.to_string().contains("secret"));
    }

    /// Adding a passphrase without a secret is a validation error whatever
    /// else the intent carries
    #[test]
    fn add_passphrase_without_secret_rejected(
        name in proptest::option::of("[a-z]{1,8}"),
        detail in proptest::option::of("/[a-z]{1,8}"),
        index in proptest::option::of(0u32..8),
        force in any::<bool>(),
        auto_protection in any::<bool>(),
    ) {
        let builder = CommandBuilder::new("/usr/sbin/hdcryptmgr");
        let mut intent = CommandIntent::new(Action::Add, "testlv").with_type(MethodType::Passphrase);
        if let Some(name) = name {
            intent = intent.with_name(name);
        }
        if let Some(detail) = detail {
            intent = intent.with_detail(detail);
        }
        if let Some(index) = index {
            intent = intent.with_index(index.to_string());
        }
        if force {
            intent = intent.with_flag(IntentFlag::Force);
        }
        if auto_protection {
            intent = intent.with_flag(IntentFlag::AutoProtection);
        }

        let err = builder.build(&intent, &state_with(&["initpwd"])).unwrap_err();
        prop_assert!(matches!(err, AuthError::Validation(_)));
    }
}

// =============================================================================
// Strength Predicate Property Tests
// =============================================================================

proptest! {
    /// The predicate is exactly the conjunction of its parts
    #[test]
    fn strength_matches_helpers(secret in "[ -~]{0,20}") {
        let expected = secret.chars().count() >= MIN_STRONG_LEN
            && has_uppercase(&secret)
            && has_lowercase(&secret)
            && has_digit(&secret)
            && has_punctuation(&secret);
        prop_assert_eq!(is_strong_secret(&secret), expected);
    }
}
