mod common;

use lancet::fram::{
    Error, FRAM_LEN,
    check::{COMMANDS_END, Region, compute_crc, validate, write_checksums},
};
use proptest::prelude::*;

#[test]
fn crc_known_vectors() {
    assert_eq!(compute_crc(b"123456789"), 0x89F6);
    assert_eq!(compute_crc(&[]), 0xFFFF);
}

#[test]
fn validate_short_image() {
    assert_eq!(
        validate(&[0; FRAM_LEN - 1]),
        Err(Error::IncompleteBuffer { len: FRAM_LEN - 1 })
    );
}

#[test]
fn validate_synthetic_image() {
    let fram = common::Image::new().build();
    let report = validate(&fram).unwrap();

    assert!(report.passed());
    assert!(report.commands.is_none());
    assert_eq!(report.checks().count(), 3);
}

#[test]
fn validate_reports_failing_region() {
    let mut fram = common::Image::new().build();
    fram[100] ^= 0x01;

    let report = validate(&fram).unwrap();

    assert!(report.header.passed());
    assert!(!report.body.passed());
    assert!(report.footer.passed());
    assert_eq!(
        report.ensure(),
        Err(Error::ChecksumMismatch {
            region: Region::Body,
            stored: report.body.stored,
            computed: report.body.computed,
        })
    );

    let text = report.to_string();
    assert!(text.contains("header CRC16"));
    assert!(text.lines().nth(1).unwrap().ends_with("(FAIL)"));
}

#[test]
fn stored_checksums_are_little_endian() {
    let fram = common::Image::new().build();
    let crc = compute_crc(&fram[Region::Footer.covered()]);

    assert_eq!(fram[320..322], crc.to_le_bytes());
}

#[test]
fn validate_command_region() {
    let mut fram = common::Image::with_len(COMMANDS_END).build();
    let report = validate(&fram).unwrap();

    assert!(report.commands.is_some_and(|c| c.passed()));
    assert_eq!(report.checks().count(), 4);

    // The command region holds no readings and does not fail the image.
    fram[COMMANDS_END - 1] ^= 0xFF;
    let report = validate(&fram).unwrap();

    assert!(report.commands.is_some_and(|c| !c.passed()));
    assert!(report.passed());
}

proptest! {
    #[test]
    fn crc_is_deterministic(r in prop::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(compute_crc(&r), compute_crc(&r.clone()));
    }

    #[test]
    fn stamped_images_validate(mut r in prop::collection::vec(any::<u8>(), FRAM_LEN..FRAM_LEN + 64)) {
        write_checksums(&mut r);
        let report = validate(&r).unwrap();

        prop_assert!(report.passed());
        prop_assert!(report.checks().all(|c| c.passed()));
    }
}
