//! Parsing of attribute tags given on the command line.
//!
//! Tags are written as `"GGGG,EEEE"`: four hexadecimal digits for the
//! group, a comma, and four hexadecimal digits for the element. Filters for
//! the `select` command append `=VALUE` to a tag.

use dicom::core::Tag;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagParseError {
    #[error("invalid tag `{0}`: expected `GGGG,EEEE`")]
    TokenCount(String),

    #[error("invalid tag `{0}`: `{1}` is not a 4-digit hexadecimal number")]
    InvalidHex(String, String),

    #[error("invalid filter `{0}`: expected `GGGG,EEEE=VALUE`")]
    InvalidFilter(String),
}

/// Parse a tag in the `GGGG,EEEE` notation.
///
/// Surrounding parentheses, as printed by most DICOM dump tools, are
/// accepted.
pub fn parse_tag(text: &str) -> Result<Tag, TagParseError> {
    let trimmed = text
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');
    let tokens: Vec<&str> = trimmed.split(',').collect();
    let [group, element] = tokens.as_slice() else {
        return Err(TagParseError::TokenCount(text.to_string()));
    };
    Ok(Tag(parse_hex(text, group)?, parse_hex(text, element)?))
}

fn parse_hex(text: &str, token: &str) -> Result<u16, TagParseError> {
    let token = token.trim();
    if token.len() != 4 {
        return Err(TagParseError::InvalidHex(
            text.to_string(),
            token.to_string(),
        ));
    }
    u16::from_str_radix(token, 16)
        .map_err(|_| TagParseError::InvalidHex(text.to_string(), token.to_string()))
}

/// Parse a list of tags, failing on the first malformed entry.
pub fn parse_tags<S: AsRef<str>>(texts: &[S]) -> Result<Vec<Tag>, TagParseError> {
    texts.iter().map(|t| parse_tag(t.as_ref())).collect()
}

/// A `GGGG,EEEE=VALUE` pair used to select files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub tag: Tag,
    pub value: String,
}

impl TagFilter {
    pub fn parse(text: &str) -> Result<Self, TagParseError> {
        let parts: Vec<&str> = text.split('=').collect();
        let [tag, value] = parts.as_slice() else {
            return Err(TagParseError::InvalidFilter(text.to_string()));
        };
        Ok(Self {
            tag: parse_tag(tag)?,
            value: (*value).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_and_element() {
        assert_eq!(parse_tag("0020,000E"), Ok(Tag(0x0020, 0x000E)));
        assert_eq!(parse_tag("0008,103e"), Ok(Tag(0x0008, 0x103E)));
        assert_eq!(parse_tag("(0051,100F)"), Ok(Tag(0x0051, 0x100F)));
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert!(matches!(
            parse_tag("00200011"),
            Err(TagParseError::TokenCount(_))
        ));
        assert!(matches!(
            parse_tag("0020,0011,0001"),
            Err(TagParseError::TokenCount(_))
        ));
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(matches!(
            parse_tag("0020,00ZZ"),
            Err(TagParseError::InvalidHex(..))
        ));
        assert!(matches!(
            parse_tag("20,11"),
            Err(TagParseError::InvalidHex(..))
        ));
    }

    #[test]
    fn parse_tags_stops_at_first_error() {
        assert!(parse_tags(&["0020,0011", "0008,103E"]).is_ok());
        assert!(parse_tags(&["0020,0011", "oops"]).is_err());
    }

    #[test]
    fn filter_splits_tag_and_value() {
        let filter = TagFilter::parse("0020,0011=3").unwrap();
        assert_eq!(filter.tag, Tag(0x0020, 0x0011));
        assert_eq!(filter.value, "3");

        let empty = TagFilter::parse("0008,103E=").unwrap();
        assert_eq!(empty.value, "");

        assert_eq!(
            TagFilter::parse("0020,0011"),
            Err(TagParseError::InvalidFilter("0020,0011".to_string()))
        );
        assert!(TagFilter::parse("0020,0011=3=4").is_err());
    }
}
