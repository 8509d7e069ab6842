//! Tokenizer for read headers such as
//! `@b13de425 runid=97039b6e read=45559 ch=270 start_time=2022-06-16T00:20:20Z`.

use memchr::memchr;

use std::num::IntErrorKind;
use rustc_hash::FxHashMap;

use crate::errors::HeaderError;

/// Annotation key holding the channel number.
pub const CHANNEL_KEY: &str = "ch";

/// The read id and `key=value` annotations of a single header line.
#[derive(Debug, Clone)]
pub struct HeaderFields<'a> {
    id: &'a str,
    annotations: FxHashMap<&'a str, &'a str>,
    header: &'a str,
}

impl<'a> HeaderFields<'a> {
    /// Split a header on whitespace. The first token is the read id and every later token
    /// containing `=` is an annotation. If a key repeats, its first value is kept.
    pub fn parse(header: &'a str) -> Result<Self, HeaderError> {
        let mut tokens = header.split_ascii_whitespace();
        let id = tokens.next().ok_or(HeaderError::Empty)?;

        let mut annotations = FxHashMap::default();
        for token in tokens {
            if let Some(i) = memchr(b'=', token.as_bytes()) {
                annotations.entry(&token[..i]).or_insert(&token[i + 1..]);
            }
        }

        Ok(Self {
            id,
            annotations,
            header,
        })
    }

    /// The first whitespace-delimited token, including the leading `@`.
    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.annotations.get(key).copied()
    }

    /// The `ch=` value. Integers too large for `i64` saturate, so they are never in range.
    pub fn channel(&self) -> Result<i64, HeaderError> {
        let value = self
            .get(CHANNEL_KEY)
            .ok_or_else(|| HeaderError::MissingChannel {
                header: self.header.to_owned(),
            })?;

        match value.parse::<i64>() {
            Ok(channel) => Ok(channel),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Ok(i64::MAX),
                IntErrorKind::NegOverflow => Ok(i64::MIN),
                _ => Err(HeaderError::InvalidChannel {
                    value: value.to_owned(),
                    source: e,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NANOPORE_HEADER: &str = "@b13de425-8e68-4cb7-a946-e524ac5ae492 runid=97039b6eb894fd91e4dcbd537db29268f9ca15a7 sampleid=tets1_R10 read=45559 ch=270 start_time=2022-06-16T00:20:20Z barcode=barcode07";

    #[test]
    fn parse_nanopore_header() {
        let fields = HeaderFields::parse(NANOPORE_HEADER).unwrap();
        assert_eq!(fields.id(), "@b13de425-8e68-4cb7-a946-e524ac5ae492");
        assert_eq!(fields.channel(), Ok(270));
        assert_eq!(fields.get("read"), Some("45559"));
        assert_eq!(fields.get("start_time"), Some("2022-06-16T00:20:20Z"));
        assert_eq!(fields.get("barcode"), Some("barcode07"));
        assert_eq!(fields.get("flow_cell_id"), None);
    }

    #[test]
    fn tabs_and_repeated_spaces_separate_tokens() {
        let fields = HeaderFields::parse("@read1\t read=3   ch=7 ").unwrap();
        assert_eq!(fields.id(), "@read1");
        assert_eq!(fields.channel(), Ok(7));
    }

    #[test]
    fn only_exact_channel_key_counts() {
        let fields = HeaderFields::parse("@read1 batch=3 xch=4").unwrap();
        assert!(matches!(
            fields.channel(),
            Err(HeaderError::MissingChannel { .. })
        ));
    }

    #[test]
    fn first_channel_annotation_wins() {
        let fields = HeaderFields::parse("@read1 ch=12 ch=400").unwrap();
        assert_eq!(fields.channel(), Ok(12));
    }

    #[test]
    fn missing_channel() {
        let fields = HeaderFields::parse("@read1 read=5").unwrap();
        assert_eq!(
            fields.channel(),
            Err(HeaderError::MissingChannel {
                header: "@read1 read=5".to_owned()
            })
        );
    }

    #[test]
    fn non_integer_channel() {
        let fields = HeaderFields::parse("@read1 ch=twelve").unwrap();
        assert!(matches!(
            fields.channel(),
            Err(HeaderError::InvalidChannel { value, .. }) if value == "twelve"
        ));

        let fields = HeaderFields::parse("@read1 ch=").unwrap();
        assert!(fields.channel().is_err());
    }

    #[test]
    fn huge_channel_saturates() {
        let fields = HeaderFields::parse("@read1 ch=99999999999999999999").unwrap();
        assert_eq!(fields.channel(), Ok(i64::MAX));

        let fields = HeaderFields::parse("@read1 ch=-99999999999999999999").unwrap();
        assert_eq!(fields.channel(), Ok(i64::MIN));
    }

    #[test]
    fn empty_header() {
        assert_eq!(HeaderFields::parse("").unwrap_err(), HeaderError::Empty);
        assert_eq!(HeaderFields::parse("   ").unwrap_err(), HeaderError::Empty);
    }
}
