//! Redirect rule evaluation.
//!
//! Rules, in order:
//! 1. canonical host at `/` → external root
//! 2. path contains the address prefix → explorer page
//! 3. path matches the address with its last character optional → explorer page
//! 4. anything else → external root + path + query

use axum::http::StatusCode;
use regex_lite::Regex;
use url::Url;

use crate::config::RedirectConfig;
use crate::traffic::record::query_string;

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectRule {
    CanonicalRoot,
    AddressPrefix,
    AddressPattern,
    Passthrough,
}

impl RedirectRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectRule::CanonicalRoot => "canonical_root",
            RedirectRule::AddressPrefix => "address_prefix",
            RedirectRule::AddressPattern => "address_pattern",
            RedirectRule::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision {
    pub target: String,
    pub status: StatusCode,
    pub rule: RedirectRule,
}

#[derive(Debug, Clone)]
pub struct RedirectResolver {
    canonical_host: String,
    external_root: String,
    explorer_url: String,
    address_prefix: String,
    address_pattern: Regex,
}

impl RedirectResolver {
    pub fn new(config: &RedirectConfig) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            canonical_host: config.canonical_host.to_ascii_lowercase(),
            external_root: config.external_root.clone(),
            explorer_url: format!(
                "{}/{}",
                config.explorer_base.trim_end_matches('/'),
                config.address
            ),
            address_prefix: config.address_prefix.clone(),
            address_pattern: Regex::new(&address_pattern(&config.address))?,
        })
    }

    pub fn explorer_url(&self) -> &str {
        &self.explorer_url
    }

    pub fn external_root(&self) -> &str {
        &self.external_root
    }

    pub fn resolve(&self, url: &Url) -> RedirectDecision {
        let path = url.path();

        if url.host_str() == Some(self.canonical_host.as_str()) && path == "/" {
            return self.decision(self.external_root.clone(), RedirectRule::CanonicalRoot);
        }
        if path.contains(self.address_prefix.as_str()) {
            return self.decision(self.explorer_url.clone(), RedirectRule::AddressPrefix);
        }
        if self.address_pattern.is_match(path) {
            return self.decision(self.explorer_url.clone(), RedirectRule::AddressPattern);
        }

        let target = format!("{}{}{}", self.external_root, path, query_string(url));
        self.decision(target, RedirectRule::Passthrough)
    }

    fn decision(&self, target: String, rule: RedirectRule) -> RedirectDecision {
        RedirectDecision {
            target,
            status: StatusCode::MOVED_PERMANENTLY,
            rule,
        }
    }
}

/// The address as a literal pattern whose final character is optional.
fn address_pattern(address: &str) -> String {
    let mut chars = address.chars();
    match chars.next_back() {
        Some(last) => format!(
            "{}(?:{})?",
            regex_lite::escape(chars.as_str()),
            regex_lite::escape(&last.to_string())
        ),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPLORER: &str =
        "https://www.blockchain.com/explorer/addresses/btc/bc1qx9n80t5q7tfmutzaj0ramzzzsvtveara68zntc";

    fn resolver() -> RedirectResolver {
        RedirectResolver::new(&RedirectConfig::default()).unwrap()
    }

    fn resolve(url: &str) -> RedirectDecision {
        resolver().resolve(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_canonical_root() {
        let d = resolve("https://amp-blockchain.com/");
        assert_eq!(d.target, "https://www.blockchain.com");
        assert_eq!(d.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(d.rule, RedirectRule::CanonicalRoot);

        // Host comparison is on the normalized (lowercase) host.
        assert_eq!(resolve("https://AMP-Blockchain.com/").rule, RedirectRule::CanonicalRoot);
    }

    #[test]
    fn test_root_on_other_host_passes_through() {
        let d = resolve("https://www.amp-blockchain.com/");
        assert_eq!(d.target, "https://www.blockchain.com/");
        assert_eq!(d.rule, RedirectRule::Passthrough);
    }

    #[test]
    fn test_address_prefix() {
        let d = resolve("https://amp-blockchain.com/bc1qx9n8anything");
        assert_eq!(d.target, EXPLORER);
        assert_eq!(d.rule, RedirectRule::AddressPrefix);

        let d = resolve("https://amp-blockchain.com/wallet/bc1qx9n8?ref=1");
        assert_eq!(d.target, EXPLORER);
    }

    #[test]
    fn test_passthrough_keeps_path_and_query() {
        let d = resolve("https://amp-blockchain.com/somepage?x=1");
        assert_eq!(d.target, "https://www.blockchain.com/somepage?x=1");
        assert_eq!(d.rule, RedirectRule::Passthrough);

        let d = resolve("https://amp-blockchain.com/a/b?");
        assert_eq!(d.target, "https://www.blockchain.com/a/b");
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let d = resolve("https://amp-blockchain.com/BC1QX9N80T5Q7TFMUTZAJ0RAMZZZSVTVEARA68ZNTC");
        assert_eq!(d.rule, RedirectRule::Passthrough);
    }

    #[test]
    fn test_address_pattern_last_char_optional() {
        // A prefix that never occurs isolates the pattern rule.
        let config = RedirectConfig {
            address_prefix: "no-such-fragment".into(),
            ..RedirectConfig::default()
        };
        let resolver = RedirectResolver::new(&config).unwrap();

        let full = Url::parse("https://x.test/bc1qx9n80t5q7tfmutzaj0ramzzzsvtveara68zntc").unwrap();
        let short = Url::parse("https://x.test/bc1qx9n80t5q7tfmutzaj0ramzzzsvtveara68znt").unwrap();
        let shorter = Url::parse("https://x.test/bc1qx9n80t5q7tfmutzaj0ramzzzsvtveara68zn").unwrap();

        assert_eq!(resolver.resolve(&full).rule, RedirectRule::AddressPattern);
        assert_eq!(resolver.resolve(&short).rule, RedirectRule::AddressPattern);
        assert_eq!(resolver.resolve(&shorter).rule, RedirectRule::Passthrough);
    }

    #[test]
    fn test_pattern_escapes_metacharacters() {
        assert_eq!(address_pattern("a.b+"), r"a\.b(?:\+)?");
        let config = RedirectConfig {
            address: "a.b+".into(),
            address_prefix: "no-such-fragment".into(),
            ..RedirectConfig::default()
        };
        let resolver = RedirectResolver::new(&config).unwrap();
        assert_eq!(
            resolver.resolve(&Url::parse("https://x.test/a.b").unwrap()).rule,
            RedirectRule::AddressPattern
        );
        assert_eq!(
            resolver.resolve(&Url::parse("https://x.test/axb").unwrap()).rule,
            RedirectRule::Passthrough
        );
    }
}
