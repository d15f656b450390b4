use reqwest::Url;

/// Parse "true"/"false"/"1"/"0" from an owned String.
pub fn parse_bool_flag(s: String) -> Option<bool> {
    parse_bool_str(&s)
}

/// Parse "true"/"false"/"1"/"0" from a &str.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Numeric env override with a clamp, falling back to `default` when the
/// variable is unset or unparseable.
pub fn env_override_usize(key: &str, default: usize, min: usize, max: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|v| v.clamp(min, max))
        .unwrap_or(default)
}

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
/// Local endpoints get relaxed rules: no API key required, dev-server hints
/// in error messages.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };

    parsed.host_str().is_some_and(|host| {
        let normalized = host.trim().to_ascii_lowercase();
        normalized == "localhost"
            || normalized == "::1"
            || normalized == "0.0.0.0"
            || normalized.starts_with("127.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_helpers() {
        assert_eq!(parse_bool_str("true"), Some(true));
        assert_eq!(parse_bool_str("0"), Some(false));
        assert_eq!(parse_bool_flag("YES".to_string()), Some(true));
        assert_eq!(parse_bool_flag("off".to_string()), Some(false));
        assert_eq!(parse_bool_str("maybe"), None);
    }

    #[test]
    fn test_env_override_usize_clamps_and_defaults() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::remove_var("FOLIO_TEST_OVERRIDE");
        assert_eq!(env_override_usize("FOLIO_TEST_OVERRIDE", 32, 4, 128), 32);
        std::env::set_var("FOLIO_TEST_OVERRIDE", "9999");
        assert_eq!(env_override_usize("FOLIO_TEST_OVERRIDE", 32, 4, 128), 128);
        std::env::set_var("FOLIO_TEST_OVERRIDE", "not-a-number");
        assert_eq!(env_override_usize("FOLIO_TEST_OVERRIDE", 32, 4, 128), 32);
        std::env::remove_var("FOLIO_TEST_OVERRIDE");
    }

    #[test]
    fn test_is_local_endpoint_url_normalizes_case_and_space() {
        assert!(is_local_endpoint_url(" HTTP://LOCALHOST:3000/demo/api "));
        assert!(is_local_endpoint_url("https://127.0.0.1/demo/api"));
        assert!(is_local_endpoint_url("https://0.0.0.0/demo/api"));
        assert!(!is_local_endpoint_url("https://evil-localhost.com/api"));
        assert!(!is_local_endpoint_url("https://folio.example.com/api"));
    }
}
