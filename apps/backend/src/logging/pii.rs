use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Email addresses: keep the first character of the local part and the domain.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{1,}\b").unwrap()
});

/// Compact JWS tokens (`header.payload.signature`, base64url segments).
static SIGNED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]{8,}\b").unwrap()
});

/// bcrypt digests (`$2b$12$` + 53 chars of salt and hash).
static BCRYPT_DIGEST: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\$2[abxy]?\$\d{2}\$[./A-Za-z0-9]{53}").unwrap()
});

/// Mask credentials and personal data before they reach a log line.
///
/// Digests and tokens go first so their base64 bodies are never mistaken for
/// email fragments.
pub fn redact(input: &str) -> String {
    let without_digests = BCRYPT_DIGEST.replace_all(input, "[REDACTED_DIGEST]");
    let without_tokens = SIGNED_TOKEN.replace_all(&without_digests, "[REDACTED_TOKEN]");

    EMAIL
        .replace_all(&without_tokens, |caps: &regex::Captures| {
            let full = &caps[0];
            match full.split_once('@') {
                Some((local, domain)) => match local.chars().next() {
                    Some(first) => format!("{first}***@{domain}"),
                    None => format!("@{domain}"),
                },
                None => full.to_string(),
            }
        })
        .into_owned()
}

/// Display wrapper that applies [`redact`] when formatted.
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}
