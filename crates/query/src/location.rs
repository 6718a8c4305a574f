//! Splitting free-text addresses into settlement tokens.
//!
//! `"Model Town, Lahore, Pakistan"` is read as settlements `["Model Town", "Lahore"]`
//! plus the coarse region `"Pakistan"`. Only settlements are matched against
//! documents; the region is too broad to be useful as a filter.

/// Result of [`parse_location`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLocation {
    pub settlements: Vec<String>,
    pub region: Option<String>,
}

impl ParsedLocation {
    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }
}

/// Split `raw` on `delimiter`.
///
/// With a single part, that part is the settlement and there is no region.
/// Settlement tokens shorter than `min_len` characters are dropped as noise.
pub fn parse_location(raw: &str, delimiter: char, min_len: usize) -> ParsedLocation {
    let raw = raw.trim();
    if raw.is_empty() {
        return ParsedLocation::default();
    }

    let mut parts: Vec<&str> = raw.split(delimiter).map(str::trim).collect();
    let region = if parts.len() > 1 {
        parts.pop().filter(|r| !r.is_empty()).map(str::to_string)
    } else {
        None
    };

    let settlements = parts
        .into_iter()
        .filter(|p| p.chars().count() >= min_len)
        .map(str::to_string)
        .collect();

    ParsedLocation {
        settlements,
        region,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_part_is_region() {
        let parsed = parse_location("Gulberg, Lahore, Pakistan", ',', 2);
        assert_eq!(parsed.settlements, vec!["Gulberg", "Lahore"]);
        assert_eq!(parsed.region.as_deref(), Some("Pakistan"));
    }

    #[test]
    fn single_part_is_settlement() {
        let parsed = parse_location("Karachi", ',', 2);
        assert_eq!(parsed.settlements, vec!["Karachi"]);
        assert_eq!(parsed.region, None);
    }

    #[test]
    fn short_and_empty_tokens_dropped() {
        let parsed = parse_location("X, , Islamabad, PK", ',', 2);
        assert_eq!(parsed.settlements, vec!["Islamabad"]);

        assert!(parse_location("A, Pakistan", ',', 2).is_empty());
        assert!(parse_location("Q", ',', 2).is_empty());
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert_eq!(parse_location("", ',', 2), ParsedLocation::default());
        assert_eq!(parse_location("   \t", ',', 2), ParsedLocation::default());
    }

    #[test]
    fn custom_delimiter_and_unicode_length() {
        let parsed = parse_location("Zürich | CH", '|', 2);
        assert_eq!(parsed.settlements, vec!["Zürich"]);
        // Counted in characters, not bytes.
        assert!(parse_location("é", ',', 2).is_empty());
    }
}
