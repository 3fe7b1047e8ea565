//! Catalog discovery: listing pages → detail pages → resource ids
//!
//! - [`scanner`] walks the alphabetical and numeric listing pages of one
//!   console and yields detail page urls
//! - [`resolver`] visits each detail page and pulls out the media id the
//!   download endpoint expects
//!
//! Both stages share one HTTP client, sleep before every request, and never
//! retry. A page that fails is logged and skipped.

mod resolver;
mod scanner;


pub use resolver::EntryResolver;
pub use scanner::CatalogScanner;

use crate::error::{Error, Result};
use regex::Regex;

/// Inclusive, uppercase range of listing letters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LetterRange {
    first: char,
    last: char,
}

impl LetterRange {
    /// Validate and normalize a letter range
    pub fn new(first: char, last: char) -> Result<Self> {
        if !first.is_ascii_alphabetic() {
            return Err(Error::config(
                format!("start letter '{}' is not A-Z", first),
                "catalog.first_letter",
            ));
        }
        if !last.is_ascii_alphabetic() {
            return Err(Error::config(
                format!("end letter '{}' is not A-Z", last),
                "catalog.last_letter",
            ));
        }
        let (first, last) = (first.to_ascii_uppercase(), last.to_ascii_uppercase());
        if first > last {
            return Err(Error::config(
                format!("start letter '{}' comes after end letter '{}'", first, last),
                "catalog.first_letter",
            ));
        }
        Ok(Self { first, last })
    }

    /// Every letter in the range, in order
    pub fn letters(&self) -> std::ops::RangeInclusive<char> {
        self.first..=self.last
    }
}

/// Compile a scraping pattern that must capture one group
pub(crate) fn compile_pattern(pattern: &str, key: &str) -> Result<Regex> {
    let regex = regex::RegexBuilder::new(pattern)
        .size_limit(1 << 20)
        .build()
        .map_err(|e| Error::config(format!("invalid pattern '{}': {}", pattern, e), key))?;
    if regex.captures_len() < 2 {
        return Err(Error::config(
            format!("pattern '{}' has no capture group", pattern),
            key,
        ));
    }
    Ok(regex)
}

/// Detail page url for one catalog entry token
pub(crate) fn detail_url(base_url: &str, token: &str) -> String {
    format!("{}/vault/{}", base_url.trim_end_matches('/'), token)
}
