//! Tests for size normalization

use super::*;
use crate::error::Error;
use test_case::test_case;

#[derive(Debug, Clone)]
struct Mailbox {
    owner: String,
    used: String,
    used_bytes: Option<f64>,
}

impl Mailbox {
    fn new(owner: &str, used: &str) -> Self {
        Self {
            owner: owner.to_string(),
            used: used.to_string(),
            used_bytes: None,
        }
    }
}

impl SizedRecord for Mailbox {
    fn size_text(&self) -> &str {
        &self.used
    }

    fn set_size_bytes(&mut self, bytes: f64) {
        self.used_bytes = Some(bytes);
    }

    fn label(&self) -> String {
        self.owner.clone()
    }
}

#[test_case("512 bytes", UnitBase::Decimal, 512.0 ; "plain bytes")]
#[test_case("2 KB", UnitBase::Decimal, 2_000.0 ; "decimal kilobytes")]
#[test_case("2 KB", UnitBase::Binary, 2_048.0 ; "binary kilobytes")]
#[test_case("1 MB", UnitBase::Binary, 1_048_576.0 ; "binary megabyte")]
#[test_case("1.5 GB", UnitBase::Decimal, 1_500_000_000.0 ; "fractional gigabytes")]
#[test_case("3 TB", UnitBase::Decimal, 3_000_000_000_000.0 ; "decimal terabytes")]
#[test_case("1 TB", UnitBase::Binary, 1_099_511_627_776.0 ; "binary terabyte")]
#[test_case("  0 MB ", UnitBase::Decimal, 0.0 ; "surrounding whitespace")]
fn test_parse_size(text: &str, base: UnitBase, expected: f64) {
    let bytes = parse_size(text, &UnitScale::new(base)).unwrap();
    assert!((bytes - expected).abs() < f64::EPSILON, "{text} -> {bytes}");
}

#[test_case("N/A" ; "no unit")]
#[test_case("N/A GB" ; "non numeric amount")]
#[test_case("12 PB" ; "unknown unit")]
#[test_case("-5 MB" ; "negative amount")]
#[test_case("" ; "empty")]
fn test_parse_size_rejects(text: &str) {
    let err = parse_size(text, &UnitScale::default()).unwrap_err();
    assert!(matches!(err, Error::Conversion { .. }));
}

#[test]
fn test_unit_base_select() {
    assert_eq!(UnitBase::select(true), UnitBase::Binary);
    assert_eq!(UnitBase::select(false), UnitBase::Decimal);
}

#[test]
fn test_unit_scale_cascade() {
    let scale = UnitScale::new(UnitBase::Binary);
    assert_eq!(scale.factor(ByteUnit::Kilobytes), 1024.0);
    assert_eq!(scale.factor(ByteUnit::Megabytes), 1024.0 * 1024.0);
    assert_eq!(scale.factor(ByteUnit::Gigabytes), 1024.0 * 1024.0 * 1024.0);
}

#[test]
fn test_byte_unit_from_str() {
    assert_eq!("bytes".parse::<ByteUnit>().unwrap(), ByteUnit::Bytes);
    assert_eq!("gb".parse::<ByteUnit>().unwrap(), ByteUnit::Gigabytes);
    assert!("XB".parse::<ByteUnit>().is_err());
}

#[tokio::test]
async fn test_convert_batch() {
    let mut records = vec![
        Mailbox::new("alice", "512 bytes"),
        Mailbox::new("bob", "2 KB"),
        Mailbox::new("carol", "1.5 GB"),
    ];

    let summary = UnitConverter::new(UnitBase::Decimal)
        .convert(&mut records)
        .await;

    assert_eq!(
        summary,
        ConversionSummary {
            converted: 3,
            failed: 0
        }
    );
    assert_eq!(records[0].used_bytes, Some(512.0));
    assert_eq!(records[1].used_bytes, Some(2_000.0));
    assert_eq!(records[2].used_bytes, Some(1_500_000_000.0));
}

#[tokio::test]
async fn test_convert_isolates_failures() {
    let mut records = vec![
        Mailbox::new("alice", "1 MB"),
        Mailbox::new("bob", "N/A"),
        Mailbox::new("carol", "4 KB"),
    ];

    let summary = UnitConverter::new(UnitBase::Binary)
        .convert(&mut records)
        .await;

    assert_eq!(summary.converted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].used_bytes, Some(1_048_576.0));
    assert_eq!(records[1].used_bytes, None);
    assert_eq!(records[2].used_bytes, Some(4_096.0));
}

#[tokio::test]
async fn test_convert_keeps_each_result_with_its_record() {
    let mut records: Vec<Mailbox> = (0..200)
        .map(|i| Mailbox::new(&format!("user{i}"), &format!("{i} KB")))
        .collect();

    UnitConverter::new(UnitBase::Decimal)
        .convert(&mut records)
        .await;

    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.owner, format!("user{i}"));
        assert_eq!(record.used_bytes, Some(i as f64 * 1000.0));
    }
}

#[tokio::test]
async fn test_convert_empty_batch() {
    let mut records: Vec<Mailbox> = Vec::new();
    let summary = UnitConverter::default().convert(&mut records).await;
    assert_eq!(summary, ConversionSummary::default());
}
