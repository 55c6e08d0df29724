//! Usage: Security-sensitive helpers (token masking, state comparison, HTML escaping).

use subtle::ConstantTimeEq;

const TOKEN_MASK_PREFIX_LEN: usize = 6;
const TOKEN_MASK_SUFFIX_LEN: usize = 4;
const TOKEN_DISPLAY_MAX_LEN: usize = 50;
const TOKEN_DISPLAY_EDGE_LEN: usize = 25;

/// Short mask used for tokens embedded in logs and error bodies.
pub(crate) fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let len = trimmed.chars().count();
    if len <= TOKEN_MASK_PREFIX_LEN + TOKEN_MASK_SUFFIX_LEN {
        return "*".repeat(len.min(8));
    }

    let prefix: String = trimmed.chars().take(TOKEN_MASK_PREFIX_LEN).collect();
    let suffix: String = trimmed.chars().skip(len - TOKEN_MASK_SUFFIX_LEN).collect();
    format!("{prefix}...{suffix}")
}

/// Operator-facing form of a token: long values keep 25 chars at each end.
pub(crate) fn abbreviate_token(token: &str) -> String {
    let len = token.chars().count();
    if len <= TOKEN_DISPLAY_MAX_LEN {
        return token.to_string();
    }
    let head: String = token.chars().take(TOKEN_DISPLAY_EDGE_LEN).collect();
    let tail: String = token.chars().skip(len - TOKEN_DISPLAY_EDGE_LEN).collect();
    format!("{head}...{tail}")
}

pub(crate) fn is_sensitive_key(key: &str) -> bool {
    let key_lc = key.trim().to_ascii_lowercase();
    key_lc.contains("token")
        || key_lc.contains("secret")
        || key_lc == "authorization"
        || key_lc == "proxy-authorization"
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
