//! Header cards and values
//!
//! A header is an ordered sequence of 80-byte cards. Cards that are never
//! touched keep their original bytes so a rewrite does not reformat them.

use super::FitsError;

/// Width of one header card
pub const CARD_LEN: usize = 80;
/// Header and data units are padded to multiples of this
pub const BLOCK_LEN: usize = 2880;

const END_CARD: &str = "END";

/// Typed header value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; quoted numbers are accepted since some capture
    /// software writes `EXPTIME = '300'`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse().ok(),
            Value::Logical(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the value the way it would appear inside a filename
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_number(*f),
            Value::Logical(b) => if *b { "T" } else { "F" }.to_string(),
        }
    }

    fn to_card_field(&self) -> String {
        match self {
            Value::String(s) => {
                let escaped = s.replace('\'', "''");
                // Closing quote may not come before column 20
                format!("'{:<8}'", escaped)
            }
            Value::Integer(i) => format!("{:>20}", i),
            Value::Float(f) => format!("{:>20}", format_float(*f)),
            Value::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        }
    }
}

/// Integral numbers print without a fractional part (`300`, `-10`), others
/// in shortest round-trip form (`0.5`, `-10.25`)
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_float(value: f64) -> String {
    let text = format!("{:E}", value);
    match text.find('E') {
        Some(idx) if !text[..idx].contains('.') => {
            format!("{}.0{}", &text[..idx], &text[idx..])
        }
        _ => text,
    }
}

/// One header record
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<Value>,
    pub comment: Option<String>,
    raw: Option<String>,
}

impl Card {
    pub fn new(keyword: &str, value: Value) -> Self {
        Self {
            keyword: keyword.trim().to_uppercase(),
            value: Some(value),
            comment: None,
            raw: None,
        }
    }

    /// Parse one 80-byte record
    pub fn parse(bytes: &[u8]) -> Result<Self, FitsError> {
        if bytes.len() != CARD_LEN {
            return Err(FitsError::InvalidFormat(format!(
                "card is {} bytes, expected {}",
                bytes.len(),
                CARD_LEN
            )));
        }
        let comment_at = comment_offset(bytes);
        if let Some(pos) = bytes.iter().position(|b| !is_printable(*b)) {
            if pos < comment_at {
                return Err(FitsError::InvalidFormat(format!(
                    "non-ASCII byte in keyword or value at column {}",
                    pos + 1
                )));
            }
        }

        // Stray bytes in the comment area (often a Latin-1 degree sign) become '?'
        let cleaned: Vec<u8> = bytes
            .iter()
            .map(|b| if is_printable(*b) { *b } else { b'?' })
            .collect();
        if cleaned.as_slice() != bytes {
            let keyword = String::from_utf8_lossy(&cleaned[..8]).trim().to_string();
            tracing::warn!(
                keyword = %keyword,
                "Non-ASCII characters in card comment replaced with '?'"
            );
        }

        // Every byte is now printable ASCII, so this is lossless
        let record = String::from_utf8_lossy(&cleaned).into_owned();
        let keyword = record[..8].trim().to_string();

        let (value, comment) = if &record[8..10] == "= " {
            parse_value_field(&record[10..])?
        } else {
            (None, None)
        };

        Ok(Self {
            keyword,
            value,
            comment,
            raw: Some(record),
        })
    }

    pub fn is_end(&self) -> bool {
        self.keyword == END_CARD && self.value.is_none()
    }

    /// Serialize to exactly 80 bytes
    pub fn to_record(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }

        let mut record = format!("{:<8}", self.keyword);
        if let Some(value) = &self.value {
            record.push_str("= ");
            record.push_str(&value.to_card_field());
            if let Some(comment) = &self.comment {
                record.push_str(" / ");
                record.push_str(comment);
            }
        }
        let mut record: String = record.chars().take(CARD_LEN).collect();
        while record.len() < CARD_LEN {
            record.push(' ');
        }
        record
    }

    fn set_value(&mut self, value: Value) {
        self.value = Some(value);
        self.raw = None;
    }
}

fn is_printable(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}

/// Byte offset where free text starts: after the keyword for commentary
/// cards, at the `/` that follows the value for value cards, or the card
/// length when there is none
fn comment_offset(bytes: &[u8]) -> usize {
    if bytes.get(8..10) != Some(b"= ".as_slice()) {
        return 8;
    }

    let mut pos = 10;
    while pos < bytes.len() && bytes[pos] == b' ' {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'\'') {
        pos += 1;
        while pos < bytes.len() {
            if bytes[pos] == b'\'' {
                if bytes.get(pos + 1) == Some(&b'\'') {
                    pos += 2;
                    continue;
                }
                pos += 1;
                break;
            }
            pos += 1;
        }
    }

    bytes[pos..]
        .iter()
        .position(|b| *b == b'/')
        .map_or(bytes.len(), |idx| pos + idx)
}

fn parse_value_field(field: &str) -> Result<(Option<Value>, Option<String>), FitsError> {
    let field = field.trim_start();

    if let Some(rest) = field.strip_prefix('\'') {
        // Quoted string, '' is an escaped quote
        let mut value = String::new();
        let mut chars = rest.char_indices().peekable();
        let mut end = None;
        while let Some((idx, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    value.push('\'');
                    chars.next();
                } else {
                    end = Some(idx + 1);
                    break;
                }
            } else {
                value.push(c);
            }
        }
        let end = end.ok_or_else(|| {
            FitsError::InvalidFormat(format!("unterminated string value: {}", field))
        })?;
        let comment = extract_comment(&rest[end..]);
        return Ok((Some(Value::String(value.trim_end().to_string())), comment));
    }

    let (value_part, comment) = match field.find('/') {
        Some(idx) => (field[..idx].trim(), extract_comment(&field[idx..])),
        None => (field.trim(), None),
    };

    if value_part.is_empty() {
        return Ok((None, comment));
    }

    let value = match value_part {
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        _ => {
            if let Ok(i) = value_part.parse::<i64>() {
                Value::Integer(i)
            } else if let Ok(f) = value_part.replace(|c: char| c == 'D' || c == 'd', "E").parse::<f64>() {
                Value::Float(f)
            } else {
                Value::String(value_part.to_string())
            }
        }
    };

    Ok((Some(value), comment))
}

fn extract_comment(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    let comment = rest.strip_prefix('/')?.trim();
    if comment.is_empty() {
        None
    } else {
        Some(comment.to_string())
    }
}

/// Ordered header with keyed access
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a header from cards; an END card, if present, is dropped since
    /// it is re-emitted on serialization
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self {
            cards: cards.into_iter().filter(|c| !c.is_end()).collect(),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    fn find(&self, key: &str) -> Option<&Card> {
        let key = key.to_uppercase();
        self.cards.iter().find(|c| c.keyword == key && c.value.is_some())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.find(key).and_then(|c| c.value.as_ref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Any value rendered as text, trimmed; empty strings count as absent
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(Value::to_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Replace the first card carrying `key`, or append a new card
    pub fn set(&mut self, key: &str, value: Value) {
        let key = key.to_uppercase();
        match self
            .cards
            .iter_mut()
            .find(|c| c.keyword == key && c.value.is_some())
        {
            Some(card) => card.set_value(value),
            None => self.cards.push(Card::new(&key, value)),
        }
    }

    /// Serialized header including END, padded with spaces to whole blocks
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.block_count() * BLOCK_LEN);
        for card in &self.cards {
            bytes.extend_from_slice(card.to_record().as_bytes());
        }
        bytes.extend_from_slice(format!("{:<80}", END_CARD).as_bytes());
        let padded = bytes.len().div_ceil(BLOCK_LEN) * BLOCK_LEN;
        bytes.resize(padded, b' ');
        bytes
    }

    /// Number of 2880-byte blocks the serialized header occupies
    pub fn block_count(&self) -> usize {
        (self.cards.len() + 1).div_ceil(BLOCK_LEN / CARD_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(text: &str) -> Card {
        Card::parse(format!("{:<80}", text).as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_string_value_with_comment() {
        let c = card("OBJECT  = 'NGC 7000'           / target name");
        assert_eq!(c.keyword, "OBJECT");
        assert_eq!(c.value, Some(Value::String("NGC 7000".to_string())));
        assert_eq!(c.comment.as_deref(), Some("target name"));
    }

    #[test]
    fn test_parse_escaped_quote() {
        let c = card("OBSERVER= 'O''Brien'");
        assert_eq!(c.value, Some(Value::String("O'Brien".to_string())));
    }

    #[test]
    fn test_parse_numbers_and_logicals() {
        assert_eq!(card("EXPTIME =                  300").value, Some(Value::Integer(300)));
        assert_eq!(card("CCD-TEMP=                -10.5").value, Some(Value::Float(-10.5)));
        assert_eq!(card("CDELT1  =         -2.5D-04").value, Some(Value::Float(-2.5e-4)));
        assert_eq!(card("SIMPLE  =                    T").value, Some(Value::Logical(true)));
    }

    fn card_bytes(text: &str, patch_at: usize, byte: u8) -> Vec<u8> {
        let mut bytes = format!("{:<80}", text).into_bytes();
        bytes[patch_at] = byte;
        bytes
    }

    #[test]
    fn test_latin1_in_comment_becomes_question_mark() {
        let bytes = card_bytes("CCD-TEMP=                -10.0 / sensor temp  C", 45, 0xB0);
        let c = Card::parse(&bytes).unwrap();
        assert_eq!(c.value, Some(Value::Float(-10.0)));
        assert_eq!(c.comment.as_deref(), Some("sensor temp ?C"));
        assert_eq!(c.to_record().len(), CARD_LEN);

        let bytes = card_bytes("HISTORY calibrated at  C", 22, 0xB0);
        assert_eq!(Card::parse(&bytes).unwrap().keyword, "HISTORY");
    }

    #[test]
    fn test_latin1_in_keyword_or_value_is_rejected() {
        let bytes = card_bytes("OBJECT  = 'M31 core'", 14, 0xB0);
        assert!(matches!(Card::parse(&bytes), Err(FitsError::InvalidFormat(_))));

        let bytes = card_bytes("CCD-TEMP=                -10.0", 2, 0xB0);
        assert!(matches!(Card::parse(&bytes), Err(FitsError::InvalidFormat(_))));
    }

    #[test]
    fn test_slash_inside_string_is_not_a_comment() {
        let bytes = card_bytes("TELESCOP= 'f/4.9 scope' / main  ", 31, 0xB0);
        let c = Card::parse(&bytes).unwrap();
        assert_eq!(c.value, Some(Value::String("f/4.9 scope".to_string())));

        let bytes = card_bytes("TELESCOP= 'f/4.9 scope' / main  ", 13, 0xB0);
        assert!(Card::parse(&bytes).is_err());
    }

    #[test]
    fn test_commentary_card_has_no_value() {
        let c = card("COMMENT this is a comment");
        assert_eq!(c.keyword, "COMMENT");
        assert!(c.value.is_none());
    }

    #[test]
    fn test_untouched_card_keeps_raw_bytes() {
        let text = format!("{:<80}", "TELESCOP= 'ScopeA  '   /  odd   spacing");
        let c = Card::parse(text.as_bytes()).unwrap();
        assert_eq!(c.to_record(), text);
    }

    #[test]
    fn test_new_card_layout() {
        let record = Card::new("OBJECT", Value::String("M31".to_string())).to_record();
        assert_eq!(record.len(), 80);
        assert!(record.starts_with("OBJECT  = 'M31     '"));

        let record = Card::new("EXPTIME", Value::Integer(300)).to_record();
        assert_eq!(&record[10..30], format!("{:>20}", 300));
    }

    #[test]
    fn test_float_card_round_trips() {
        let written = Card::new("CD1_1", Value::Float(-0.000277)).to_record();
        let parsed = Card::parse(written.as_bytes()).unwrap();
        assert_eq!(parsed.value, Some(Value::Float(-0.000277)));
    }

    #[test]
    fn test_set_replaces_then_appends() {
        let mut header = Header::new();
        header.set("object", Value::String("M 31".to_string()));
        header.set("OBJECT", Value::String("M31".to_string()));
        header.set("EXPTIME", Value::Float(60.0));
        assert_eq!(header.cards().len(), 2);
        assert_eq!(header.get_str("OBJECT"), Some("M31"));
        assert_eq!(header.get_f64("exptime"), Some(60.0));
    }

    #[test]
    fn test_to_bytes_is_block_aligned() {
        let mut header = Header::new();
        header.set("SIMPLE", Value::Logical(true));
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), BLOCK_LEN);
        assert_eq!(header.block_count(), 1);

        for i in 0..40 {
            header.set(&format!("KEY{}", i), Value::Integer(i));
        }
        assert_eq!(header.block_count(), 2);
        assert_eq!(header.to_bytes().len(), 2 * BLOCK_LEN);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(300.0), "300");
        assert_eq!(format_number(-10.0), "-10");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-10.25), "-10.25");
    }
}
