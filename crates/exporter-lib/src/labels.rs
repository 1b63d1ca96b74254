//! Label helpers shared by the per-kind generators

/// Label value used for identity-style fields that are absent on the object
pub const NONE_VALUE: &str = "<none>";

/// Prefix for metric labels derived from object labels
pub const OBJECT_LABEL_PREFIX: &str = "label_";

/// Replace every character outside `[A-Za-z0-9_]` with `_`
///
/// Used to turn arbitrary object label keys into metric label names and to
/// turn resource names such as `nvidia.com/gpu` into label values.
pub fn sanitize_label_key(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Metric label name for an object label key (`app.kubernetes.io/name` -> `label_app_kubernetes_io_name`)
pub fn object_label_name(key: &str) -> String {
    format!("{}{}", OBJECT_LABEL_PREFIX, sanitize_label_key(key))
}

/// Render an optional boolean as `"true"`, `"false"` or the `<none>` sentinel
pub fn optional_bool(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => NONE_VALUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_label_key("nvidia.com/gpu"), "nvidia_com_gpu");
        assert_eq!(sanitize_label_key("ephemeral-storage"), "ephemeral_storage");
        assert_eq!(sanitize_label_key("already_valid_09"), "already_valid_09");
    }

    #[test]
    fn test_sanitize_non_ascii() {
        // Each char is replaced once, regardless of its UTF-8 width
        assert_eq!(sanitize_label_key("tier-é"), "tier__");
    }

    #[test]
    fn test_object_label_name() {
        assert_eq!(object_label_name("app"), "label_app");
        assert_eq!(
            object_label_name("app.kubernetes.io/name"),
            "label_app_kubernetes_io_name"
        );
    }

    #[test]
    fn test_optional_bool() {
        assert_eq!(optional_bool(Some(true)), "true");
        assert_eq!(optional_bool(Some(false)), "false");
        assert_eq!(optional_bool(None), "<none>");
    }
}
