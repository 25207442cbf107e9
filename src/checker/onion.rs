// src/checker/onion.rs
// =============================================================================
// Decides whether a string looks like a link into the Tor network.
//
// Grammar (anchored at both ends):
//
//   [http:// | https://] [www.] <one or more [A-Za-z0-9]> .onion [/ <anything>]
//
// Scheme, "www." and the path are all optional, so both
// "http://abc.onion/" and "https://www.abc.onion" qualify. A scheme-less
// match such as "abc.onion/page" passes here but is dropped later because
// it does not parse as an absolute URL.
//
// Extra suffixes (e.g. "com", "org") can be allowed next to "onion".
// =============================================================================

use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;

/// The suffix reserved for onion services
pub const ONION_SUFFIX: &str = "onion";

// The grammar for the onion suffix alone. A fixed literal, identical to what
// with_suffixes builds for no extra suffixes, so it always compiles.
static ONION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?[A-Za-z0-9]+\.(?:onion)(?:/.*)?$").unwrap()
});

static ONION_FILTER: Lazy<LinkFilter> = Lazy::new(LinkFilter::onion);

/// Returns true when `link` is an address under the .onion suffix
///
/// Pure and deterministic: no network access.
pub fn is_valid_onion_link(link: &str) -> bool {
    ONION_FILTER.matches(link)
}

/// The compiled address grammar for a set of suffixes
#[derive(Debug, Clone)]
pub struct LinkFilter {
    suffixes: Vec<String>,
    pattern: Regex,
}

impl LinkFilter {
    /// Accepts .onion addresses only
    pub fn onion() -> Self {
        Self {
            suffixes: vec![ONION_SUFFIX.to_string()],
            pattern: ONION_PATTERN.clone(),
        }
    }

    /// Accepts .onion plus every suffix in `extra`
    ///
    /// Leading dots are ignored, so "com" and ".com" are the same suffix.
    /// Fails only when the combined grammar is too large to compile.
    pub fn with_suffixes<I, S>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes = vec![ONION_SUFFIX.to_string()];
        for suffix in extra {
            let suffix = suffix.as_ref().trim().trim_start_matches('.');
            if !suffix.is_empty() && !suffixes.iter().any(|s| s == suffix) {
                suffixes.push(suffix.to_string());
            }
        }

        let alternatives = suffixes
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"^(?:https?://)?(?:www\.)?[A-Za-z0-9]+\.(?:{alternatives})(?:/.*)?$");

        let pattern = Regex::new(&pattern)?;

        Ok(Self { suffixes, pattern })
    }

    pub fn matches(&self, link: &str) -> bool {
        self.pattern.is_match(link)
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::onion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_onion_table() {
        let table = [
            ("https://www.google.com", false),
            ("http://torlinkbgs6aabns.onion/", true),
            ("https://www.propub3r6espa33w.onion", true),
            ("asfasf", false),
            ("www.twitter.com", false),
            ("ftp://asfasdf.lkjkl", false),
        ];

        for (link, expected) in table {
            assert_eq!(is_valid_onion_link(link), expected, "{link}");
        }
    }

    #[test]
    fn test_path_is_optional() {
        assert!(is_valid_onion_link("http://abcdef.onion"));
        assert!(is_valid_onion_link("http://abcdef.onion/"));
        assert!(is_valid_onion_link("http://abcdef.onion/forum/index.php?t=1"));
    }

    #[test]
    fn test_rejects_subdomains_and_ports() {
        assert!(!is_valid_onion_link("http://mail.abcdef.onion/"));
        assert!(!is_valid_onion_link("http://abcdef.onion:8080/"));
        assert!(!is_valid_onion_link("http://.onion/"));
        assert!(!is_valid_onion_link("http://abcdef.onionx/"));
    }

    #[test]
    fn test_extra_suffixes() {
        let filter = LinkFilter::with_suffixes([".com", "org"]).unwrap();
        assert!(filter.matches("https://www.google.com"));
        assert!(filter.matches("http://example.org/about"));
        assert!(filter.matches("http://torlinkbgs6aabns.onion/"));
        assert!(!filter.matches("ftp://asfasdf.lkjkl"));
        assert_eq!(filter.suffixes(), ["onion", "com", "org"]);
    }

    #[test]
    fn test_suffix_is_escaped() {
        // "c.m" must not behave like the regex "c.m"
        let filter = LinkFilter::with_suffixes(["c.m"]).unwrap();
        assert!(filter.matches("http://site.c.m"));
        assert!(!filter.matches("http://site.cxm"));
    }

    #[test]
    fn test_fixed_onion_grammar_matches_generated_one() {
        let generated = LinkFilter::with_suffixes(std::iter::empty::<&str>()).unwrap();
        let fixed = LinkFilter::onion();
        assert_eq!(generated.pattern.as_str(), fixed.pattern.as_str());
        assert_eq!(generated.suffixes(), fixed.suffixes());
    }
}
