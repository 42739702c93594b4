//! Tradeable universe: an ordered, de-duplicated list of tickers.
//!
//! Universe order is significant: the momentum ranker breaks score ties by it.

use crate::domain::error::UniverseError;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub tickers: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.tickers.len()
    }

    /// Builds a universe from raw identifiers, normalizing each and dropping
    /// later duplicates. Blank entries are ignored.
    pub fn from_raw<I, S>(raw: I, suffix: Option<&str>) -> Result<Self, UniverseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tickers = Vec::new();
        let mut seen = HashSet::new();

        for entry in raw {
            let trimmed = entry.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            let ticker = normalize_ticker(trimmed, suffix);
            if seen.insert(ticker.clone()) {
                tickers.push(ticker);
            } else {
                log::warn!("universe: ignoring duplicate ticker {ticker}");
            }
        }

        if tickers.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(Self { tickers })
    }
}

/// Upper-cases a ticker and appends the exchange suffix when missing.
pub fn normalize_ticker(raw: &str, suffix: Option<&str>) -> String {
    let ticker = raw.trim().to_uppercase();
    match suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(suffix) => {
            let suffix = suffix.to_uppercase();
            if ticker.ends_with(&suffix) {
                ticker
            } else {
                format!("{ticker}{suffix}")
            }
        }
        None => ticker,
    }
}

/// Parses a comma-separated ticker list from configuration. Unlike file
/// input, empty tokens and duplicates are rejected.
pub fn parse_tickers(input: &str, suffix: Option<&str>) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = normalize_ticker(trimmed, suffix);
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tickers_basic() {
        let result = parse_tickers("TCS,INFY,SBIN", None).unwrap();
        assert_eq!(result, vec!["TCS", "INFY", "SBIN"]);
    }

    #[test]
    fn test_parse_tickers_with_whitespace_and_case() {
        let result = parse_tickers("  tcs , Infy ,SBIN", None).unwrap();
        assert_eq!(result, vec!["TCS", "INFY", "SBIN"]);
    }

    #[test]
    fn test_parse_tickers_appends_suffix() {
        let result = parse_tickers("TCS,INFY.NS", Some(".NS")).unwrap();
        assert_eq!(result, vec!["TCS.NS", "INFY.NS"]);
    }

    #[test]
    fn test_parse_tickers_empty_token() {
        let result = parse_tickers("TCS,,INFY", None);
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_tickers_duplicate_after_normalization() {
        let result = parse_tickers("TCS,tcs.ns", Some(".NS"));
        assert!(matches!(result, Err(UniverseError::DuplicateTicker(s)) if s == "TCS.NS"));
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("reliance", Some(".ns")), "RELIANCE.NS");
        assert_eq!(normalize_ticker("^NSEI", None), "^NSEI");
        assert_eq!(normalize_ticker("TCS", Some("  ")), "TCS");
    }

    #[test]
    fn test_from_raw_keeps_order_and_dedups() {
        let universe =
            Universe::from_raw(["TCS", "", "INFY", "tcs", "SBIN"], Some(".NS")).unwrap();
        assert_eq!(universe.tickers, vec!["TCS.NS", "INFY.NS", "SBIN.NS"]);
        assert_eq!(universe.count(), 3);
    }

    #[test]
    fn test_from_raw_empty() {
        let result = Universe::from_raw(Vec::<String>::new(), None);
        assert!(matches!(result, Err(UniverseError::Empty)));
    }
}
