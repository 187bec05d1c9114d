pub fn is_truthy(value: impl AsRef<str>) -> bool {
    matches!(
        value.as_ref().trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn is_falsy(value: impl AsRef<str>) -> bool {
    matches!(
        value.as_ref().trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Flags default to `default` when unset or set to something unrecognised.
pub fn flag_or(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(value) if is_truthy(value) => true,
        Some(value) if is_falsy(value) => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::flag_or;

    #[test]
    fn flag_or_keeps_default_for_noise() {
        assert!(flag_or(None, true));
        assert!(!flag_or(Some("FALSE"), true));
        assert!(flag_or(Some("on"), false));
        assert!(flag_or(Some("maybe"), true));
    }
}
