//! Ordering and round-trip properties of CNNVD identifiers

use cnnvd_harvester::identifier::{CnnvdIdentifier, IdentifierError, Window};
use std::cmp::Ordering;

const SAMPLES: &[&str] = &[
    "CNNVD-198801-0001",
    "CNNVD-199912-0042",
    "CNNVD-202201-0001",
    "CNNVD-202207-0050",
    "CNNVD-202212-0099",
    "CNNVD-202304-0662",
    "CNNVD-202304",
    "CNNVD-202411-12345",
];

fn samples() -> Vec<CnnvdIdentifier> {
    SAMPLES
        .iter()
        .map(|s| CnnvdIdentifier::parse(s).unwrap())
        .collect()
}

#[test]
fn test_compare_is_transitive() {
    let ids = samples();
    for a in &ids {
        for b in &ids {
            for c in &ids {
                if a.compare(b) == Ordering::Less && b.compare(c) == Ordering::Less {
                    assert_eq!(a.compare(c), Ordering::Less, "{a} < {b} < {c}");
                }
            }
        }
    }
}

#[test]
fn test_compare_is_antisymmetric() {
    let ids = samples();
    for a in &ids {
        for b in &ids {
            assert_eq!(a.compare(b), b.compare(a).reverse(), "{a} vs {b}");
            assert_eq!(a.is_after(b), a.compare(b) == Ordering::Greater);
        }
    }
}

#[test]
fn test_same_month_is_same_window() {
    let a = CnnvdIdentifier::parse("CNNVD-202304-0001").unwrap();
    let b = CnnvdIdentifier::parse("CNNVD-202304-0662").unwrap();
    assert_eq!(a.compare(&b), Ordering::Equal);
    assert!(!a.is_after(&b));
    assert!(!b.is_after(&a));
}

#[test]
fn test_format_parse_round_trip() {
    for id in samples() {
        let reparsed = CnnvdIdentifier::parse(&id.to_string()).unwrap();
        assert_eq!(reparsed, id);
    }
}

#[test]
fn test_empty_resolves_to_oldest() {
    let oldest = CnnvdIdentifier::parse_or_oldest("").unwrap();
    assert_eq!(oldest, CnnvdIdentifier::oldest());
    assert_eq!(oldest.window(), Window::floor());
    assert_eq!(CnnvdIdentifier::parse_or_oldest("   ").unwrap(), oldest);
    for id in samples() {
        assert!(!oldest.is_after(&id));
    }
}

#[test]
fn test_malformed_inputs() {
    for bad in ["", "CVE-2023-1234", "CNNVD-2023-0001", "CNNVD-20230A-0001", "CNNVD-202304-"] {
        assert!(
            matches!(
                CnnvdIdentifier::parse(bad),
                Err(IdentifierError::Malformed(_))
            ),
            "{bad:?} should be malformed"
        );
    }
}

#[test]
fn test_out_of_range_inputs() {
    for bad in ["CNNVD-198712-0001", "CNNVD-202313-0001", "CNNVD-202300-0001"] {
        assert!(
            matches!(
                CnnvdIdentifier::parse(bad),
                Err(IdentifierError::OutOfRange(_))
            ),
            "{bad:?} should be out of range"
        );
        assert!(CnnvdIdentifier::parse(bad).unwrap_err().is_malformed());
    }
}
