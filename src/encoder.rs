//! Mapping of run-time attribute values to cell contents

use crate::types::{AttributeValue, CellValue, Column};
use chrono::{NaiveDate, NaiveDateTime};

/// Encode one attribute value for `column`.
///
/// Pure and total. Dispatch order is absent, numeric, temporal, geometric,
/// then the default string representation for everything else. Geometries
/// with non-finite coordinates have no valid WKT and take the string rule.
pub fn encode_value(value: Option<&AttributeValue>, column: &Column) -> CellValue {
    let value = match value {
        None | Some(AttributeValue::Null) => return CellValue::Null,
        Some(v) => v,
    };

    if let Some(n) = as_number(value) {
        return CellValue::Number(n);
    }
    if let Some(dt) = as_temporal(value) {
        return CellValue::Temporal(dt);
    }
    if let AttributeValue::Geometry(g) = value {
        if crate::wkt::is_representable(g) {
            return CellValue::GeometryText(crate::wkt::to_wkt(g));
        }
        log::warn!(
            "column '{}' ({}) holds a geometry with non-finite coordinates, exported as text",
            column.name,
            column.index
        );
    }
    if let AttributeValue::Text(s) = value {
        return CellValue::Text(s.clone());
    }

    log::trace!(
        "column '{}' ({}) exported through its string form: {:?}",
        column.name,
        column.index,
        value
    );
    CellValue::Text(value.to_string())
}

fn as_number(value: &AttributeValue) -> Option<f64> {
    // Integers beyond 2^53 lose precision here
    match value {
        AttributeValue::Int(i) => Some(*i as f64),
        AttributeValue::UInt(u) => Some(*u as f64),
        AttributeValue::BigInt(i) => Some(*i as f64),
        AttributeValue::Float(f) => Some(*f),
        _ => None,
    }
}

fn as_temporal(value: &AttributeValue) -> Option<NaiveDateTime> {
    match value {
        AttributeValue::DateTime(dt) => Some(*dt),
        AttributeValue::Date(d) => Some(d.and_time(chrono::NaiveTime::MIN)),
        // time-only values sit on 1970-01-01
        AttributeValue::Time(t) => Some(NaiveDate::default().and_time(*t)),
        AttributeValue::Timestamp(ts) => Some(ts.naive_local()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveTime, TimeZone};
    use geo_types::point;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn col() -> Column {
        Column::new(0, "c")
    }

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .unwrap()
    }

    #[test]
    fn test_absent_and_null() {
        assert_eq!(encode_value(None, &col()), CellValue::Null);
        assert_eq!(encode_value(Some(&AttributeValue::Null), &col()), CellValue::Null);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(encode_value(Some(&7i8.into()), &col()), CellValue::Number(7.0));
        assert_eq!(encode_value(Some(&u64::MAX.into()), &col()), CellValue::Number(u64::MAX as f64));
        assert_eq!(encode_value(Some(&2.5f32.into()), &col()), CellValue::Number(2.5));
        assert_eq!(
            encode_value(Some(&AttributeValue::BigInt(-3)), &col()),
            CellValue::Number(-3.0)
        );
    }

    #[test]
    fn test_temporals_keep_wall_clock() {
        let dt = ymd_hms(2023, 6, 30, 23, 59, 58);
        assert_eq!(encode_value(Some(&dt.into()), &col()), CellValue::Temporal(dt));

        let date = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        assert_eq!(
            encode_value(Some(&date.into()), &col()),
            CellValue::Temporal(ymd_hms(2020, 2, 29, 0, 0, 0))
        );

        let time = NaiveTime::from_hms_opt(12, 30, 0).unwrap();
        assert_eq!(
            encode_value(Some(&time.into()), &col()),
            CellValue::Temporal(ymd_hms(1970, 1, 1, 12, 30, 0))
        );

        // no shift towards UTC
        let offset = FixedOffset::west_opt(6 * 3600).unwrap();
        let ts = offset.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(
            encode_value(Some(&ts.into()), &col()),
            CellValue::Temporal(ymd_hms(2024, 3, 1, 8, 0, 0))
        );
    }

    #[test]
    fn test_geometry() {
        let value: AttributeValue = point!(x: 0.0, y: 0.0).into();
        assert_eq!(
            encode_value(Some(&value), &col()),
            CellValue::GeometryText("POINT (0 0)".to_string())
        );
    }

    #[test]
    fn test_non_finite_geometry_is_text() {
        let value: AttributeValue = point!(x: f64::NAN, y: 1.0).into();
        assert_eq!(
            encode_value(Some(&value), &col()),
            CellValue::Text("POINT (NaN 1)".to_string())
        );
    }

    #[test]
    fn test_text_fallback() {
        assert_eq!(
            encode_value(Some(&"a".into()), &col()),
            CellValue::Text("a".to_string())
        );
        assert_eq!(
            encode_value(Some(&true.into()), &col()),
            CellValue::Text("true".to_string())
        );
        let other = AttributeValue::Other(Arc::new(uuid_like()));
        assert_eq!(
            encode_value(Some(&other), &col()),
            CellValue::Text("0000-1111".to_string())
        );
    }

    fn uuid_like() -> String {
        "0000-1111".to_string()
    }

    proptest! {
        #[test]
        fn prop_integers_become_numbers(i in any::<i64>()) {
            let cell = encode_value(Some(&AttributeValue::Int(i)), &col());
            prop_assert_eq!(cell, CellValue::Number(i as f64));
        }

        #[test]
        fn prop_floats_are_preserved(f in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
            let value = AttributeValue::Float(f);
            let first = encode_value(Some(&value), &col());
            let second = encode_value(Some(&value), &col());
            prop_assert_eq!(&first, &CellValue::Number(f));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_strings_pass_through(s in ".*") {
            let cell = encode_value(Some(&AttributeValue::Text(s.clone())), &col());
            prop_assert_eq!(cell, CellValue::Text(s));
        }
    }
}
