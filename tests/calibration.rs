mod common;

use common::Image;
use lancet::fram::calibration::CalibrationInfo;

const CALIBRATION: CalibrationInfo = CalibrationInfo {
    i1: 5,
    i2: 0x2A7,
    i3: -37,
    i4: 0x1ABC,
    i5: 0xDEC << 2,
    i6: 0x6D6 << 2,
};

#[test]
fn extract_calibration() {
    let fram = Image::new().calibration(CALIBRATION).build();

    assert_eq!(CalibrationInfo::extract(&fram), CALIBRATION);
}

#[test]
fn extract_positive_offset() {
    let calibration = CalibrationInfo {
        i3: 37,
        ..CALIBRATION
    };
    let fram = Image::new().calibration(calibration).build();

    assert_eq!(CalibrationInfo::extract(&fram).i3, 37);
}

#[test]
fn extract_from_blank_image() {
    let calibration = CalibrationInfo::extract(&[0; 344]);

    assert!(calibration.is_empty());
}

#[cfg(feature = "std")]
mod factory {
    use csv::ReaderBuilder;
    use lancet::{fram::record::GlucoseRecord, glucose::factory_glucose};

    use super::{common::last_reading, *};

    fn raw_record(raw_value: u16, raw_temperature: u16, temperature_adjustment: i16) -> GlucoseRecord {
        GlucoseRecord {
            raw_value,
            raw_temperature,
            temperature_adjustment,
            slot_index: 100,
            timestamp: last_reading(),
            has_error: false,
            error_code: 0,
            quality_flags: 0,
            value: None,
            temperature: None,
        }
    }

    #[test]
    fn golden_vectors() {
        const PATH: &str = "fixtures/factory-glucose.csv";
        let mut reader = ReaderBuilder::new().from_path(PATH).unwrap();

        let mut count = 0;
        for row in reader.records() {
            let row = row.unwrap();
            let field = |i: usize| row[i].parse::<i32>().unwrap();

            let raw = raw_record(field(0) as u16, field(1) as u16, field(2) as i16);
            let calibration = CalibrationInfo {
                i3: field(3),
                i4: field(4),
                i6: field(5),
                ..CALIBRATION
            };

            let glucose = factory_glucose(&raw, &calibration);

            assert_eq!(glucose.value, Some(field(6)), "{row:?}");
            assert!(glucose.temperature.is_some_and(|t| (30.0..35.0).contains(&t)));
            assert_eq!(glucose.raw_value, raw.raw_value);
            assert_eq!(glucose.timestamp, raw.timestamp);

            count += 1;
        }

        assert_eq!(count, 6);
    }

    #[test]
    fn invalid_slot_is_unchanged() {
        let raw = GlucoseRecord {
            slot_index: -15,
            ..raw_record(1500, 7000, 0)
        };

        assert_eq!(factory_glucose(&raw, &CALIBRATION), raw);
    }

    #[test]
    fn missing_calibration_is_unchanged() {
        let raw = raw_record(1500, 7000, 0);

        assert_eq!(factory_glucose(&raw, &CalibrationInfo::default()), raw);
    }

    #[test]
    fn degenerate_calibration_is_unchanged() {
        let raw = raw_record(1500, 7000, 0);
        let calibration = CalibrationInfo {
            i4: CALIBRATION.i3,
            ..CALIBRATION
        };

        assert_eq!(factory_glucose(&raw, &calibration), raw);
    }

    #[test]
    fn higher_raw_reads_higher() {
        let low = factory_glucose(&raw_record(1200, 7000, 0), &CALIBRATION);
        let high = factory_glucose(&raw_record(2400, 7000, 0), &CALIBRATION);

        assert!(high.value > low.value);
    }
}
