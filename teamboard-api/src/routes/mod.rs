/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `me`: The signed-in user's profile
/// - `organizations`: Organizations, the current-organization cookie, leaving
/// - `members`: Team membership and roles
/// - `projects`: Projects inside an organization
/// - `tasks`: Tasks, task listing and the project board
/// - `notifications`: The signed-in user's notifications
/// - `activity`: An organization's activity log

pub mod activity;
pub mod me;
pub mod members;
pub mod notifications;
pub mod organizations;
pub mod projects;
pub mod tasks;

use serde::{Deserialize, Deserializer, Serialize};

/// `Cache-Control` for listing reads
pub const LISTING_CACHE_CONTROL: &str = "private, max-age=60";

/// `Cache-Control` for per-user reads that must never be cached
pub const NO_STORE_CACHE_CONTROL: &str = "private, no-cache, no-store, must-revalidate";

/// Body of delete endpoints; `false` when there was nothing to delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`)
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims optional free text; blank becomes None
pub(crate) fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.description, None);

        let null: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Some(None));

        let set: Patch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  notes ".to_string())), Some("notes".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
