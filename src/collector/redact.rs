//! Scrubbing secrets out of user-visible error text and urls

use url::Url;

const SENSITIVE_QUERY_KEYS: &[&str] = &[
    "private_token",
    "access_token",
    "token",
    "api_key",
    "apikey",
    "key",
    "password",
    "secret",
    "sig",
];

const MASK: &str = "***";

/// Replaces known secret values with a mask
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let mut secrets: Vec<String> = secrets.into_iter().filter(|s| s.len() >= 3).collect();
        // longest first so a secret containing another is masked whole
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        Self { secrets }
    }

    pub fn text(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
    }

    /// A url without user info and with sensitive query values masked
    pub fn url(&self, url: &Url) -> String {
        self.text(&redact_url(url))
    }
}

/// Strip credentials from a url for display
pub fn redact_url(url: &Url) -> String {
    let mut clean = url.clone();
    let _ = clean.set_username("");
    let _ = clean.set_password(None);

    if clean.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let masked = SENSITIVE_QUERY_KEYS.contains(&k.to_lowercase().as_str());
                let value = if masked { MASK.to_string() } else { v.into_owned() };
                (k.into_owned(), value)
            })
            .collect();
        clean.query_pairs_mut().clear().extend_pairs(pairs);
    }

    clean.to_string()
}
