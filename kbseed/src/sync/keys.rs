use thiserror::Error;

pub const CATEGORY_KEY_PREFIX: &str = "cat:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("no explicit key and the label is empty")]
    Empty,
}

/// Returns the explicit key untouched, otherwise the slug of `label`.
///
/// Labels that slug the same produce the same key; that is how re-runs
/// without explicit keys stay idempotent.
pub fn derive_key(explicit: Option<&str>, label: &str) -> String {
    match explicit.filter(|key| !key.trim().is_empty()) {
        Some(key) => key.to_string(),
        None => slugify(label),
    }
}

/// Lower-cases `label`, collapses every run of characters outside
/// `[a-z0-9]` into one `-` and trims dashes at both ends.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;
    for ch in label.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// External key of an article or action link. Explicit keys are trusted
/// verbatim; derived ones get `prefix`.
pub fn entry_external_key(
    explicit: Option<&str>,
    label: &str,
    prefix: &str,
) -> Result<String, KeyError> {
    if let Some(key) = explicit.filter(|key| !key.trim().is_empty()) {
        return Ok(key.to_string());
    }
    let slug = slugify(label);
    if slug.is_empty() {
        return Err(KeyError::Empty);
    }
    Ok(format!("{prefix}{slug}"))
}

/// External key of a category, always `cat:`-prefixed so every locale of
/// the category shares it.
pub fn category_external_key(explicit: Option<&str>, name: &str) -> Result<String, KeyError> {
    let key = derive_key(explicit, name);
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.starts_with(CATEGORY_KEY_PREFIX) {
        Ok(key)
    } else {
        Ok(format!("{CATEGORY_KEY_PREFIX}{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_is_returned_unchanged() {
        assert_eq!(derive_key(Some("art:x"), "Whatever"), "art:x");
        assert_eq!(
            derive_key(Some("action.kyc.show"), "Open Account"),
            "action.kyc.show"
        );
    }

    #[test]
    fn blank_explicit_key_falls_back_to_slug() {
        assert_eq!(derive_key(Some("  "), "Card"), "card");
    }

    #[test]
    fn slug_collapses_runs_and_trims() {
        assert_eq!(slugify("Profile & Security"), "profile-security");
        assert_eq!(slugify("  --Is SumUp Pay free?--  "), "is-sumup-pay-free");
        assert_eq!(slugify("Top-ups: 3 ways"), "top-ups-3-ways");
    }

    #[test]
    fn slug_drops_non_ascii_letters() {
        assert_eq!(slugify("Karte prüfen"), "karte-pr-fen");
        assert_eq!(slugify("Didn’t find it"), "didn-t-find-it");
    }

    #[test]
    fn derivation_is_deterministic_and_collides_on_purpose() {
        let first = derive_key(None, "Bill Splitting");
        let second = derive_key(None, "Bill Splitting");
        assert_eq!(first, second);
        assert_eq!(derive_key(None, "bill  splitting!"), first);
    }

    #[test]
    fn empty_label_yields_empty_key() {
        assert_eq!(derive_key(None, ""), "");
        assert_eq!(derive_key(None, "!!!"), "");
        assert_eq!(entry_external_key(None, "", "art:"), Err(KeyError::Empty));
        assert_eq!(category_external_key(None, "  "), Err(KeyError::Empty));
    }

    #[test]
    fn entry_keys_prefix_only_derived_values() {
        assert_eq!(
            entry_external_key(Some("art:x"), "X", "art:").unwrap(),
            "art:x"
        );
        assert_eq!(
            entry_external_key(None, "Sending limits for transfers", "art:").unwrap(),
            "art:sending-limits-for-transfers"
        );
    }

    #[test]
    fn category_keys_are_prefixed_once() {
        assert_eq!(
            category_external_key(Some("profile"), "Profile & Security").unwrap(),
            "cat:profile"
        );
        assert_eq!(
            category_external_key(Some("cat:profile"), "Profile & Security").unwrap(),
            "cat:profile"
        );
        assert_eq!(
            category_external_key(None, "Paying Merchants").unwrap(),
            "cat:paying-merchants"
        );
    }
}
