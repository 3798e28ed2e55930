use crate::assessment::SuspiciousUrl;
use lazy_static::lazy_static;
use regex::Regex;
use url::{Host, Url};

lazy_static! {
    /// Permissive URL pattern used when a message does not arrive with its
    /// links pre-split.
    static ref URL_PATTERN: Regex =
        Regex::new(r#"https?://[^\s<>"')\]]+|www\.[^\s<>"')\]]+"#).expect("valid URL pattern");
}

/// Hosts operated by URL shorteners. Links through these hide their
/// destination entirely.
const SHORTENER_HOSTS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "t.co",
    "goo.gl",
    "ow.ly",
    "is.gd",
    "buff.ly",
    "rebrand.ly",
    "short.link",
];

/// TLDs with disproportionate phishing registration rates.
const SUSPICIOUS_TLDS: &[&str] = &["tk", "ml", "ga", "cf", "gq", "xyz", "top", "click", "zip"];

/// Path keywords that mimic credential flows.
const SUSPICIOUS_PATH_WORDS: &[&str] = &[
    "login", "signin", "verify", "account", "confirm", "update", "secure", "webscr",
];

/// Brand tokens and the registrable domain they legitimately belong to.
/// A brand token appearing in any other registrable domain is a classic
/// impersonation signal.
pub const BRAND_DOMAINS: &[(&str, &str)] = &[
    ("paypal", "paypal.com"),
    ("amazon", "amazon.com"),
    ("microsoft", "microsoft.com"),
    ("apple", "apple.com"),
    ("google", "google.com"),
    ("facebook", "facebook.com"),
    ("netflix", "netflix.com"),
    ("chase", "chase.com"),
    ("wellsfargo", "wellsfargo.com"),
    ("ebay", "ebay.com"),
    ("linkedin", "linkedin.com"),
    ("dropbox", "dropbox.com"),
    ("docusign", "docusign.com"),
    ("dhl", "dhl.com"),
    ("fedex", "fedex.com"),
    ("ups", "ups.com"),
    ("irs", "irs.gov"),
];

/// Structural analysis of a single URL.
#[derive(Debug, Clone)]
pub struct UrlAnalysis {
    pub url: String,
    pub host: Option<String>,
    pub registrable_domain: Option<String>,
    pub tld: Option<String>,
    pub is_ip_literal: bool,
    pub is_shortener: bool,
    pub domain_entropy: f64,
    pub subdomain_depth: usize,
    pub path_query_length: usize,
    pub has_suspicious_pattern: bool,
    pub has_suspicious_tld: bool,
    pub has_suspicious_path: bool,
    pub brand_impersonation: bool,
    pub reasons: Vec<&'static str>,
}

/// URL feature sub-vector plus per-URL reasons for explainability.
pub struct UrlFeatures {
    pub entries: Vec<(&'static str, f64)>,
    pub suspicious_urls: Vec<SuspiciousUrl>,
}

/// Structural and domain features from embedded links. Never fails on
/// malformed input; an unparseable URL is itself a suspicious signal.
#[derive(Default)]
pub struct UrlFeatureExtractor;

impl UrlFeatureExtractor {
    pub fn new() -> Self {
        UrlFeatureExtractor
    }

    /// Pull URLs out of body text when the message was not pre-parsed.
    pub fn extract_urls_from_text(text: &str) -> Vec<String> {
        URL_PATTERN
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn extract(&self, urls: &[String]) -> UrlFeatures {
        let analyses: Vec<UrlAnalysis> = urls.iter().map(|u| self.analyze_url(u)).collect();

        let count = analyses.len();
        let entropies: Vec<f64> = analyses.iter().map(|a| a.domain_entropy).collect();
        let max_entropy = entropies.iter().cloned().fold(0.0, f64::max);
        let mean_entropy = if count > 0 {
            entropies.iter().sum::<f64>() / count as f64
        } else {
            0.0
        };
        let mean_path_query = if count > 0 {
            analyses.iter().map(|a| a.path_query_length).sum::<usize>() as f64 / count as f64
        } else {
            0.0
        };

        let entries = vec![
            ("url_count", count as f64),
            ("url_max_domain_entropy", max_entropy),
            ("url_mean_domain_entropy", mean_entropy),
            (
                "url_ip_literal_count",
                analyses.iter().filter(|a| a.is_ip_literal).count() as f64,
            ),
            (
                "url_shortener_count",
                analyses.iter().filter(|a| a.is_shortener).count() as f64,
            ),
            (
                "url_suspicious_pattern_count",
                analyses.iter().filter(|a| a.has_suspicious_pattern).count() as f64,
            ),
            (
                "url_suspicious_tld_count",
                analyses.iter().filter(|a| a.has_suspicious_tld).count() as f64,
            ),
            (
                "url_suspicious_path_count",
                analyses.iter().filter(|a| a.has_suspicious_path).count() as f64,
            ),
            (
                "url_brand_impersonation_count",
                analyses.iter().filter(|a| a.brand_impersonation).count() as f64,
            ),
            (
                "url_max_subdomain_depth",
                analyses
                    .iter()
                    .map(|a| a.subdomain_depth)
                    .max()
                    .unwrap_or(0) as f64,
            ),
            ("url_mean_path_query_length", mean_path_query),
        ];

        let suspicious_urls = analyses
            .iter()
            .map(|a| SuspiciousUrl {
                url: a.url.chars().take(200).collect(),
                reason: if a.reasons.is_empty() {
                    "None".to_string()
                } else {
                    a.reasons.join("; ")
                },
            })
            .collect();

        UrlFeatures {
            entries,
            suspicious_urls,
        }
    }

    pub fn analyze_url(&self, raw: &str) -> UrlAnalysis {
        let mut analysis = UrlAnalysis {
            url: raw.to_string(),
            host: None,
            registrable_domain: None,
            tld: None,
            is_ip_literal: false,
            is_shortener: false,
            domain_entropy: 0.0,
            subdomain_depth: 0,
            path_query_length: 0,
            has_suspicious_pattern: false,
            has_suspicious_tld: false,
            has_suspicious_path: false,
            brand_impersonation: false,
            reasons: Vec::new(),
        };

        let normalized = if raw.starts_with("www.") {
            format!("http://{raw}")
        } else {
            raw.to_string()
        };

        let parsed = match Url::parse(&normalized) {
            Ok(u) => u,
            Err(_) => {
                analysis.has_suspicious_pattern = true;
                analysis.reasons.push("unparseable URL");
                return analysis;
            }
        };

        // Userinfo before the host is a classic trick to fake the apparent
        // destination (http://paypal.com@evil.example/...).
        if !parsed.username().is_empty() || parsed.password().is_some() {
            analysis.has_suspicious_pattern = true;
            analysis.reasons.push("credentials embedded before host");
        }

        analysis.path_query_length =
            parsed.path().len() + parsed.query().map(|q| q.len()).unwrap_or(0);

        let path_lower = parsed.path().to_lowercase();
        if SUSPICIOUS_PATH_WORDS.iter().any(|w| path_lower.contains(w)) {
            analysis.has_suspicious_path = true;
            analysis.reasons.push("path mimics a credential flow");
        }

        match parsed.host() {
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
                analysis.is_ip_literal = true;
                analysis.host = parsed.host_str().map(|h| h.to_string());
                analysis.reasons.push("IP address instead of domain");
            }
            Some(Host::Domain(domain)) => {
                let domain = domain.to_lowercase();
                analysis.host = Some(domain.clone());

                if domain.split('.').any(|label| label.starts_with("xn--")) {
                    analysis.has_suspicious_pattern = true;
                    analysis.reasons.push("punycode/IDN host");
                }

                let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
                if labels.len() >= 2 {
                    let registrable = format!(
                        "{}.{}",
                        labels[labels.len() - 2],
                        labels[labels.len() - 1]
                    );
                    analysis.tld = Some(labels[labels.len() - 1].to_string());
                    analysis.subdomain_depth = labels.len().saturating_sub(2);
                    analysis.domain_entropy = shannon_entropy(labels[labels.len() - 2]);

                    if SHORTENER_HOSTS.contains(&registrable.as_str())
                        || SHORTENER_HOSTS.contains(&domain.as_str())
                    {
                        analysis.is_shortener = true;
                        analysis.reasons.push("URL shortener");
                    }
                    if SUSPICIOUS_TLDS.contains(&labels[labels.len() - 1]) {
                        analysis.has_suspicious_tld = true;
                        analysis.reasons.push("high-risk TLD");
                    }
                    if brand_impersonation(&registrable) {
                        analysis.brand_impersonation = true;
                        analysis.reasons.push("brand impersonation");
                    }
                    analysis.registrable_domain = Some(registrable);
                } else {
                    analysis.domain_entropy = shannon_entropy(&domain);
                }
            }
            None => {
                analysis.has_suspicious_pattern = true;
                analysis.reasons.push("no host");
            }
        }

        analysis
    }
}

/// True when a brand token appears in the registrable domain but the
/// registrable domain is not the brand's canonical one.
pub fn brand_impersonation(registrable: &str) -> bool {
    let label = registrable.split('.').next().unwrap_or(registrable);
    for (token, canonical) in BRAND_DOMAINS {
        if label.contains(token) && registrable != *canonical {
            return true;
        }
    }
    false
}

/// Shannon entropy over the characters of a domain label. High entropy
/// correlates with algorithmically generated phishing domains.
pub fn shannon_entropy(label: &str) -> f64 {
    if label.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    let chars: Vec<char> = label.chars().collect();
    for c in &chars {
        *counts.entry(*c).or_insert(0usize) += 1;
    }
    let len = chars.len() as f64;
    -counts
        .values()
        .map(|&n| {
            let p = n as f64 / len;
            p * p.log2()
        })
        .sum::<f64>()
}

/// Canonical URL feature names, in vector order.
pub const FEATURE_NAMES: &[&str] = &[
    "url_count",
    "url_max_domain_entropy",
    "url_mean_domain_entropy",
    "url_ip_literal_count",
    "url_shortener_count",
    "url_suspicious_pattern_count",
    "url_suspicious_tld_count",
    "url_suspicious_path_count",
    "url_brand_impersonation_count",
    "url_max_subdomain_depth",
    "url_mean_path_query_length",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_urls_from_text() {
        let urls = UrlFeatureExtractor::extract_urls_from_text(
            "see https://example.com/a and www.test.org/b here",
        );
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://example.com/a");
        assert_eq!(urls[1], "www.test.org/b");
    }

    #[test]
    fn test_ip_literal_is_flagged() {
        let extractor = UrlFeatureExtractor::new();
        let analysis = extractor.analyze_url("http://192.168.1.1/verify");
        assert!(analysis.is_ip_literal);
        assert!(analysis.has_suspicious_path);
        assert!(analysis.reasons.contains(&"IP address instead of domain"));
    }

    #[test]
    fn test_suspicious_tld_and_brand() {
        let extractor = UrlFeatureExtractor::new();
        let analysis = extractor.analyze_url("http://paypal-verify.tk/login");
        assert!(analysis.has_suspicious_tld);
        assert!(analysis.brand_impersonation);
        assert!(analysis.has_suspicious_path);
        assert_eq!(analysis.registrable_domain.as_deref(), Some("paypal-verify.tk"));
    }

    #[test]
    fn test_legitimate_brand_domain_not_flagged() {
        let extractor = UrlFeatureExtractor::new();
        let analysis = extractor.analyze_url("https://amazon.com/orders/123");
        assert!(!analysis.brand_impersonation);
        assert!(!analysis.has_suspicious_tld);
        assert!(!analysis.has_suspicious_path);
    }

    #[test]
    fn test_shortener_detection() {
        let extractor = UrlFeatureExtractor::new();
        let analysis = extractor.analyze_url("https://bit.ly/3xyzzy");
        assert!(analysis.is_shortener);
    }

    #[test]
    fn test_userinfo_is_suspicious() {
        let extractor = UrlFeatureExtractor::new();
        let analysis = extractor.analyze_url("http://paypal.com@evil.example/login");
        assert!(analysis.has_suspicious_pattern);
    }

    #[test]
    fn test_entropy() {
        // Uniform label has higher entropy than a repeated one.
        assert!(shannon_entropy("abcdefgh") > shannon_entropy("aaaaaaaa"));
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn test_aggregate_features() {
        let extractor = UrlFeatureExtractor::new();
        let features = extractor.extract(&[
            "http://paypal-verify.tk/login".to_string(),
            "http://192.168.1.1/verify".to_string(),
        ]);
        let get = |name: &str| {
            features
                .entries
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v)
                .unwrap()
        };
        assert_eq!(get("url_count"), 2.0);
        assert_eq!(get("url_ip_literal_count"), 1.0);
        assert_eq!(get("url_suspicious_tld_count"), 1.0);
        assert_eq!(get("url_brand_impersonation_count"), 1.0);
        assert_eq!(features.suspicious_urls.len(), 2);
        assert_ne!(features.suspicious_urls[0].reason, "None");
    }

    #[test]
    fn test_empty_input_is_zeroed() {
        let extractor = UrlFeatureExtractor::new();
        let features = extractor.extract(&[]);
        assert_eq!(features.entries.len(), FEATURE_NAMES.len());
        for (_, value) in &features.entries {
            assert_eq!(*value, 0.0);
        }
    }
}
