use super::*;
use std::str::FromStr;

#[test]
fn test_typed_id_from_i64() {
    let id = AccountId::from_i64(42);
    assert_eq!(id.into_inner(), 42);
    assert_eq!(i64::from(id), 42);
    assert_eq!(AccountId::from(42), id);
}

#[test]
fn test_typed_id_display() {
    let id = TransactionId::from_i64(7);
    assert_eq!(format!("{id}"), "7");
}

#[test]
fn test_typed_id_from_str() {
    let id = CategoryId::from_str("15").unwrap();
    assert_eq!(id.into_inner(), 15);
}

#[test]
fn test_typed_id_from_str_error() {
    assert!(AccountId::from_str("abc").is_err());
    assert!(AccountId::from_str("").is_err());
}

#[test]
fn test_typed_id_ordering() {
    assert!(AccountId::from_i64(1) < AccountId::from_i64(2));
}

#[test]
fn test_typed_id_serde_is_transparent() {
    let json = serde_json::to_string(&AccountId::from_i64(9)).unwrap();
    assert_eq!(json, "9");
    let back: AccountId = serde_json::from_str("9").unwrap();
    assert_eq!(back, AccountId::from_i64(9));
}
