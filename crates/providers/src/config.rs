use std::env;
use std::str::FromStr;

pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Non-blank value of `key`, trimmed.
pub fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_on_missing_or_invalid_values() {
        assert_eq!(env_parse("MAUSAM_TEST_SURELY_UNSET", 42u64), 42);
        assert!(env_string("MAUSAM_TEST_SURELY_UNSET").is_none());
    }
}
