use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use std::borrow::Borrow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    number: u32,
    generation: u16,
}

impl ObjectId {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Name atom (`/Type`, `/Page`, ...). Stored without the leading slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name(name.to_string())
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Name(name)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// String atom. The bytes are opaque; `hex` only records how the string was
/// spelled in the source so it can be written back the same way.
#[derive(Debug, Clone)]
pub struct PdfString {
    bytes: Vec<u8>,
    hex: bool,
}

impl PdfString {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            hex: false,
        }
    }

    pub fn hex(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            hex: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_hex(&self) -> bool {
        self.hex
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl PartialEq for PdfString {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for PdfString {}

impl From<&str> for PdfString {
    fn from(s: &str) -> Self {
        PdfString::new(s.as_bytes())
    }
}

impl From<String> for PdfString {
    fn from(s: String) -> Self {
        PdfString::new(s.into_bytes())
    }
}

impl From<Vec<u8>> for PdfString {
    fn from(bytes: Vec<u8>) -> Self {
        PdfString::new(bytes)
    }
}

/// Date atom, spelled `D:YYYYMMDDHHmmSSOHH'mm'` on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfDate(DateTime<FixedOffset>);

impl PdfDate {
    pub fn new(datetime: DateTime<FixedOffset>) -> Self {
        Self(datetime)
    }

    pub fn from_utc(datetime: DateTime<Utc>) -> Self {
        Self(datetime.fixed_offset())
    }

    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn datetime(&self) -> DateTime<FixedOffset> {
        self.0
    }

    /// Parses a date string. Every field after the year is optional; a
    /// missing offset means UTC.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(raw).ok()?.trim();
        let text = text.strip_prefix("D:").unwrap_or(text);

        let digits_end = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (digits, rest) = text.split_at(digits_end);
        if digits.len() < 4 || digits.len() > 14 || digits.len() % 2 != 0 {
            return None;
        }

        let field = |start: usize, default: u32| -> Option<u32> {
            match digits.get(start..start + 2) {
                Some(s) => s.parse().ok(),
                None => Some(default),
            }
        };

        let year: i32 = digits[..4].parse().ok()?;
        let month = field(4, 1)?;
        let day = field(6, 1)?;
        let hour = field(8, 0)?;
        let minute = field(10, 0)?;
        let second = field(12, 0)?;

        let offset = parse_offset(rest)?;
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
        offset.from_local_datetime(&naive).single().map(PdfDate)
    }

    pub fn to_pdf_string(&self) -> String {
        let offset = self.0.offset().local_minus_utc();
        let mut out = self.0.format("D:%Y%m%d%H%M%S").to_string();
        if offset == 0 {
            out.push('Z');
        } else {
            let sign = if offset < 0 { '-' } else { '+' };
            let abs = offset.abs();
            out.push_str(&format!("{sign}{:02}'{:02}'", abs / 3600, (abs % 3600) / 60));
        }
        out
    }
}

fn parse_offset(rest: &str) -> Option<FixedOffset> {
    let mut chars = rest.chars();
    match chars.next() {
        None | Some('Z') => FixedOffset::east_opt(0),
        Some(sign @ ('+' | '-')) => {
            let digits: String = chars.filter(|c| c.is_ascii_digit()).collect();
            let hours: i32 = digits.get(0..2)?.parse().ok()?;
            let minutes: i32 = match digits.get(2..4) {
                Some(m) => m.parse().ok()?,
                None => 0,
            };
            let seconds = hours * 3600 + minutes * 60;
            if sign == '+' {
                FixedOffset::east_opt(seconds)
            } else {
                FixedOffset::west_opt(seconds)
            }
        }
        _ => None,
    }
}

impl fmt::Display for PdfDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pdf_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_object_id_display() {
        assert_eq!(ObjectId::new(12, 3).to_string(), "12 3 R");
    }

    #[test]
    fn test_name_borrow_and_compare() {
        let name = Name::new("Page");
        assert_eq!(name, "Page");
        assert_eq!(name.to_string(), "/Page");
        let as_str: &str = name.borrow();
        assert_eq!(as_str, "Page");
    }

    #[test]
    fn test_string_equality_ignores_spelling() {
        assert_eq!(PdfString::new(b"abc".to_vec()), PdfString::hex(b"abc".to_vec()));
        assert!(PdfString::hex(vec![0x41]).is_hex());
    }

    #[test]
    fn test_date_parse_full() {
        let date = PdfDate::parse(b"D:20230415103000+02'00'").unwrap();
        let dt = date.datetime();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 4);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_date_parse_partial() {
        let date = PdfDate::parse(b"D:1999").unwrap();
        let dt = date.datetime();
        assert_eq!((dt.year(), dt.month(), dt.day()), (1999, 1, 1));
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_date_parse_negative_offset() {
        let date = PdfDate::parse(b"D:20200101120000-05'30'").unwrap();
        assert_eq!(date.datetime().offset().local_minus_utc(), -(5 * 3600 + 30 * 60));
    }

    #[test]
    fn test_date_rejects_garbage() {
        assert!(PdfDate::parse(b"Hello").is_none());
        assert!(PdfDate::parse(b"D:20231").is_none());
        assert!(PdfDate::parse(b"D:20231345").is_none());
    }

    #[test]
    fn test_date_format() {
        let date = PdfDate::parse(b"D:20230415103000+02'00'").unwrap();
        assert_eq!(date.to_pdf_string(), "D:20230415103000+02'00'");

        let utc = PdfDate::parse(b"D:20230415103000Z").unwrap();
        assert_eq!(utc.to_pdf_string(), "D:20230415103000Z");
    }
}
