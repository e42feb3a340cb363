use super::*;
use rstest::rstest;

#[test]
fn test_page_request_default() {
    let request = PageRequest::default();
    assert_eq!(request.page, 1);
    assert_eq!(request.limit, 10);
    assert!(request.is_valid());
}

#[test]
fn test_page_request_offset() {
    assert_eq!(PageRequest::new(1, 10).offset(), 0);
    assert_eq!(PageRequest::new(2, 10).offset(), 10);
    assert_eq!(PageRequest::new(3, 25).offset(), 50);
}

#[test]
fn test_page_request_offset_does_not_overflow() {
    let request = PageRequest::new(u32::MAX, MAX_PAGE_LIMIT);
    assert_eq!(
        request.offset(),
        u64::from(u32::MAX - 1) * u64::from(MAX_PAGE_LIMIT)
    );
}

#[rstest]
#[case(1, 1, true)]
#[case(1, 100, true)]
#[case(0, 10, false)]
#[case(1, 0, false)]
#[case(1, 101, false)]
fn test_page_request_validity(#[case] page: u32, #[case] limit: u32, #[case] valid: bool) {
    assert_eq!(PageRequest::new(page, limit).is_valid(), valid);
}

#[test]
fn test_page_request_deserialize_defaults() {
    let request: PageRequest = serde_json::from_str("{}").unwrap();
    assert_eq!(request, PageRequest::default());

    let request: PageRequest = serde_json::from_str(r#"{"limit": 3}"#).unwrap();
    assert_eq!(request, PageRequest::new(1, 3));
}
