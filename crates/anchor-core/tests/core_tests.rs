//! Tests for anchor-core: session keys, dimensions, errors

use anchor_core::*;

// ===========================================================================
// SessionKey
// ===========================================================================

#[test]
fn session_key_new_and_display() {
    let key = SessionKey::new("abc-123");
    assert_eq!(key.as_str(), "abc-123");
    assert_eq!(format!("{}", key), "abc-123");
}

#[test]
fn session_key_from_string() {
    let key: SessionKey = "hello".into();
    assert_eq!(key.as_str(), "hello");
    let key2: SessionKey = String::from("world").into();
    assert_eq!(key2.as_str(), "world");
}

#[test]
fn session_key_equality_and_hash() {
    use std::collections::HashSet;
    let a = SessionKey::new("same");
    let b = SessionKey::new("same");
    let c = SessionKey::new("different");
    assert_eq!(a, b);
    assert_ne!(a, c);
    let mut set = HashSet::new();
    set.insert(a.clone());
    assert!(set.contains(&b));
    assert!(!set.contains(&c));
}

#[test]
fn session_key_default_is_default() {
    assert_eq!(SessionKey::default().as_str(), "default");
}

// ===========================================================================
// Dimension
// ===========================================================================

#[test]
fn dimension_indices_cover_all() {
    let indices: Vec<usize> = Dimension::ALL.iter().map(|d| d.index()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn dimension_display_aliases_only_rename_two() {
    assert_eq!(Dimension::Fear.display_name(), "Instability");
    assert_eq!(Dimension::Safety.display_name(), "Stability");
    assert_eq!(Dimension::Time.display_name(), "Time");
    assert_eq!(Dimension::Choice.display_name(), "Choice");
}

#[test]
fn dimension_parses_canonical_and_alias_keys() {
    assert_eq!(Dimension::from_key("Fear"), Some(Dimension::Fear));
    assert_eq!(Dimension::from_key("Instability"), Some(Dimension::Fear));
    assert_eq!(Dimension::from_key("Stability"), Some(Dimension::Safety));
    assert_eq!(Dimension::from_key("Choice"), Some(Dimension::Choice));
    assert_eq!(Dimension::from_key("fear"), None);
    assert_eq!(Dimension::from_canonical("Instability"), None);
    assert_eq!(Dimension::from_alias("Fear"), None);
}

#[test]
fn dimension_categories() {
    assert_eq!(Dimension::Fear.category(), WeightCategory::Environment);
    assert_eq!(Dimension::Safety.category(), WeightCategory::Environment);
    assert_eq!(Dimension::Time.category(), WeightCategory::State);
    assert_eq!(Dimension::Choice.category(), WeightCategory::SelfImage);
}

#[test]
fn dimension_serializes_canonical() {
    assert_eq!(serde_json::to_string(&Dimension::Fear).unwrap(), r#""Fear""#);
    let back: Dimension = serde_json::from_str(r#""Choice""#).unwrap();
    assert_eq!(back, Dimension::Choice);
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_display_messages() {
    let e = Error::not_found("seed profile", "Therapist_Seed_v2");
    assert_eq!(e.to_string(), "seed profile not found: Therapist_Seed_v2");
    assert!(e.is_not_found());

    let e = Error::malformed("bias is not an object");
    assert_eq!(e.to_string(), "malformed entry: bias is not an object");
    assert!(!e.is_not_found());
}

#[test]
fn error_from_io_and_json() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let e: Error = io.into();
    assert!(matches!(e, Error::Io(_)));

    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let e: Error = json_err.into();
    assert!(e.to_string().starts_with("json error"));
}
