use crate::features::url::BRAND_DOMAINS;
use crate::message::{extract_domain, extract_local_part};

/// Seed list of domains with established reputation. Everything else is
/// bucketed as "unknown"; a real deployment would back this with a
/// reputation feed.
const KNOWN_DOMAINS: &[&str] = &[
    "gmail.com",
    "outlook.com",
    "yahoo.com",
    "hotmail.com",
    "icloud.com",
    "protonmail.com",
    "aol.com",
    "google.com",
    "amazon.com",
    "paypal.com",
    "microsoft.com",
    "apple.com",
    "github.com",
    "facebook.com",
    "netflix.com",
    "linkedin.com",
    "ebay.com",
    "chase.com",
    "wellsfargo.com",
    "docusign.com",
    "irs.gov",
];

/// Free webmail providers. Fine for a person, suspicious for a claimed
/// organization.
const FREE_WEBMAIL: &[&str] = &[
    "gmail.com",
    "outlook.com",
    "yahoo.com",
    "hotmail.com",
    "aol.com",
    "icloud.com",
    "protonmail.com",
    "mail.com",
    "gmx.com",
];

/// Words in a display name that claim to speak for an organization.
const ORG_CLAIM_WORDS: &[&str] = &[
    "security",
    "support",
    "billing",
    "service",
    "account",
    "department",
    "team",
    "official",
    "bank",
    "admin",
];

pub struct MetadataFeatures {
    pub entries: Vec<(&'static str, f64)>,
}

/// Sender/reply-to/address-consistency features. Degrades to an all-zero
/// sub-vector when headers are absent.
#[derive(Default)]
pub struct MetadataFeatureExtractor;

impl MetadataFeatureExtractor {
    pub fn new() -> Self {
        MetadataFeatureExtractor
    }

    pub fn extract(
        &self,
        sender: &str,
        sender_name: Option<&str>,
        reply_to: Option<&str>,
    ) -> MetadataFeatures {
        let sender_domain = extract_domain(sender);
        let local_part = extract_local_part(sender);

        let mut display_name_mismatch = 0.0;
        let mut free_webmail_claimed_org = 0.0;
        if let (Some(name), Some(domain)) = (sender_name, sender_domain.as_deref()) {
            let name_lower = name.to_lowercase();
            for (token, canonical) in BRAND_DOMAINS {
                if name_lower.contains(token) && !domain_matches(domain, canonical) {
                    display_name_mismatch = 1.0;
                    break;
                }
            }
            let claims_org = ORG_CLAIM_WORDS.iter().any(|w| name_lower.contains(w))
                || display_name_mismatch > 0.0;
            if claims_org && FREE_WEBMAIL.iter().any(|d| domain_matches(domain, d)) {
                free_webmail_claimed_org = 1.0;
            }
        }

        let reply_to_mismatch = match (sender_domain.as_deref(), reply_to.and_then(extract_domain))
        {
            (Some(from), Some(reply)) if from != reply => 1.0,
            _ => 0.0,
        };

        let domain_reputation_unknown = match sender_domain.as_deref() {
            Some(domain) => {
                if KNOWN_DOMAINS.iter().any(|d| domain_matches(domain, d)) {
                    0.0
                } else {
                    1.0
                }
            }
            None => 0.0,
        };

        // Brand token inside the sender's own domain label, but not the
        // brand's real domain (paypal-verify.tk style spoofs).
        let sender_brand_mismatch = match sender_domain.as_deref() {
            Some(domain) => {
                let label = domain.split('.').next().unwrap_or(domain);
                let spoofed = BRAND_DOMAINS
                    .iter()
                    .any(|(token, canonical)| label.contains(token) && !domain_matches(domain, canonical));
                if spoofed {
                    1.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        let sender_local_has_digits = local_part
            .map(|l| l.chars().any(|c| c.is_ascii_digit()))
            .unwrap_or(false);

        // Random-looking mailbox: long local part where most characters are
        // distinct.
        let sender_local_random = local_part
            .map(|l| {
                let chars: Vec<char> = l.chars().collect();
                if chars.len() > 10 {
                    let distinct: std::collections::HashSet<char> = chars.iter().copied().collect();
                    distinct.len() as f64 / chars.len() as f64 > 0.7
                } else {
                    false
                }
            })
            .unwrap_or(false);

        let entries = vec![
            ("meta_display_name_mismatch", display_name_mismatch),
            ("meta_reply_to_mismatch", reply_to_mismatch),
            ("meta_free_webmail_claimed_org", free_webmail_claimed_org),
            ("meta_domain_reputation_unknown", domain_reputation_unknown),
            ("meta_sender_brand_mismatch", sender_brand_mismatch),
            (
                "meta_sender_local_has_digits",
                if sender_local_has_digits { 1.0 } else { 0.0 },
            ),
            (
                "meta_sender_local_random",
                if sender_local_random { 1.0 } else { 0.0 },
            ),
        ];

        MetadataFeatures { entries }
    }
}

/// Exact or subdomain match against a registrable domain.
fn domain_matches(domain: &str, pattern: &str) -> bool {
    domain == pattern || domain.ends_with(&format!(".{pattern}"))
}

/// Canonical metadata feature names, in vector order.
pub const FEATURE_NAMES: &[&str] = &[
    "meta_display_name_mismatch",
    "meta_reply_to_mismatch",
    "meta_free_webmail_claimed_org",
    "meta_domain_reputation_unknown",
    "meta_sender_brand_mismatch",
    "meta_sender_local_has_digits",
    "meta_sender_local_random",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn get(features: &MetadataFeatures, name: &str) -> f64 {
        features
            .entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .unwrap()
    }

    #[test]
    fn test_absent_headers_degrade_to_zero() {
        let extractor = MetadataFeatureExtractor::new();
        let features = extractor.extract("", None, None);
        assert_eq!(features.entries.len(), FEATURE_NAMES.len());
        for (_, value) in &features.entries {
            assert_eq!(*value, 0.0);
        }
    }

    #[test]
    fn test_display_name_brand_spoof() {
        let extractor = MetadataFeatureExtractor::new();
        let features = extractor.extract(
            "security@random-mailer.net",
            Some("PayPal Security"),
            None,
        );
        assert_eq!(get(&features, "meta_display_name_mismatch"), 1.0);
        assert_eq!(get(&features, "meta_domain_reputation_unknown"), 1.0);
    }

    #[test]
    fn test_brand_in_sender_domain() {
        let extractor = MetadataFeatureExtractor::new();
        let features = extractor.extract("security@paypal-verify.tk", None, None);
        assert_eq!(get(&features, "meta_sender_brand_mismatch"), 1.0);

        // The real brand domain is not a mismatch.
        let legit = extractor.extract("service@paypal.com", Some("PayPal"), None);
        assert_eq!(get(&legit, "meta_sender_brand_mismatch"), 0.0);
        assert_eq!(get(&legit, "meta_display_name_mismatch"), 0.0);
        assert_eq!(get(&legit, "meta_domain_reputation_unknown"), 0.0);
    }

    #[test]
    fn test_reply_to_mismatch() {
        let extractor = MetadataFeatureExtractor::new();
        let features = extractor.extract(
            "billing@company.com",
            None,
            Some("attacker@webmail.example"),
        );
        assert_eq!(get(&features, "meta_reply_to_mismatch"), 1.0);

        let same = extractor.extract("billing@company.com", None, Some("other@company.com"));
        assert_eq!(get(&same, "meta_reply_to_mismatch"), 0.0);
    }

    #[test]
    fn test_free_webmail_claiming_org() {
        let extractor = MetadataFeatureExtractor::new();
        let features = extractor.extract(
            "irs.tax.department@gmail.com",
            Some("IRS Tax Department"),
            None,
        );
        assert_eq!(get(&features, "meta_free_webmail_claimed_org"), 1.0);

        // A person on webmail claims nothing.
        let personal = extractor.extract("friend@gmail.com", Some("John Smith"), None);
        assert_eq!(get(&personal, "meta_free_webmail_claimed_org"), 0.0);
    }

    #[test]
    fn test_random_local_part() {
        let extractor = MetadataFeatureExtractor::new();
        let features = extractor.extract("xk9q2vwp7ztr4@unknown-host.biz", None, None);
        assert_eq!(get(&features, "meta_sender_local_random"), 1.0);
        assert_eq!(get(&features, "meta_sender_local_has_digits"), 1.0);
    }
}
