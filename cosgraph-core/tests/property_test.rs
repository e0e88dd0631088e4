//! Property checks for atom encoding and copying

use chrono::{FixedOffset, TimeZone};
use cosgraph::parser::ObjectParser;
use cosgraph::{Array, Dictionary, Name, Node, PdfDate, PdfString};
use proptest::prelude::*;

fn parse(bytes: &[u8]) -> Node {
    ObjectParser::new(bytes, 0).parse_object().unwrap()
}

proptest! {
    #[test]
    fn test_date_survives_pdf_spelling(
        year in 1900i32..2100,
        month in 1u32..=12,
        day in 1u32..=28,
        hour in 0u32..24,
        minute in 0u32..60,
        second in 0u32..60,
        offset_minutes in -(23 * 60i32)..=(23 * 60),
    ) {
        let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
        let datetime = offset
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .unwrap();
        let date = PdfDate::new(datetime);

        let parsed = PdfDate::parse(date.to_pdf_string().as_bytes()).unwrap();
        prop_assert_eq!(parsed, date);
        prop_assert_eq!(
            parsed.datetime().offset().local_minus_utc(),
            offset_minutes * 60
        );
    }

    #[test]
    fn test_written_names_parse_back(name in "\\PC{1,16}") {
        let node = Node::name(Name::new(name.clone()));
        let bytes = node.to_pdf_bytes().unwrap();

        prop_assert_eq!(parse(&bytes).as_name(), Some(Name::new(name)));
    }

    #[test]
    fn test_written_strings_parse_back(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let literal = Node::string(PdfString::new(bytes.clone()));
        let parsed = parse(&literal.to_pdf_bytes().unwrap()).as_string().unwrap();
        prop_assert_eq!(parsed.as_bytes(), bytes.as_slice());

        let hex = Node::string(PdfString::hex(bytes.clone()));
        let parsed = parse(&hex.to_pdf_bytes().unwrap()).as_string().unwrap();
        prop_assert_eq!(parsed.as_bytes(), bytes.as_slice());
        prop_assert!(parsed.is_hex());
    }

    #[test]
    fn test_duplicate_is_equal_and_detached(
        values in prop::collection::vec(-1000i64..1000, 0..8),
        key in "K[a-z]{0,7}",
    ) {
        let dict = Dictionary::new();
        dict.set(key.as_str(), values.iter().copied().collect::<Array>());
        dict.set("Label", PdfString::new(key.clone().into_bytes()));

        let copy = dict.node().duplicate();
        prop_assert_eq!(&copy, dict.node());
        prop_assert!(!Node::ptr_eq(&copy, dict.node()));
        prop_assert!(copy.parent().is_none());

        let copy = copy.as_dictionary().unwrap();
        copy.get_array(&key).unwrap().push(1);
        prop_assert_eq!(dict.get_array(&key).unwrap().len(), values.len());
    }
}
