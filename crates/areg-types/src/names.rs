//! Name validation for spaces, apps, and editors.
//!
//! Space and app names end up inside database and object-storage names, so
//! they are restricted to a small charset:
//! - 1 to [`MAX_NAME_LEN`] characters
//! - lowercase ASCII letters, digits, `-` and `_`
//! - must start with a letter or digit
//!
//! Space names additionally must not end with [`RESERVED_SUFFIX`], which is
//! reserved for the overwrite stores of virtual spaces.
//!
//! Editor names are display identities and keep their case, but are limited
//! to ASCII alphanumerics plus `-`, `_` and `.`.

use crate::error::TypeError;

/// Maximum length of any registry name.
pub const MAX_NAME_LEN: usize = 64;

/// Suffix reserved for virtual-space overwrite stores.
pub const RESERVED_SUFFIX: &str = "-overwrites";

fn invalid(what: &'static str, name: &str, reason: impl Into<String>) -> TypeError {
    TypeError::InvalidName {
        what,
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn validate_slug(what: &'static str, name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(invalid(what, name, "must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(
            what,
            name,
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    let first = name.as_bytes()[0];
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Err(invalid(what, name, "must start with a lowercase letter or digit"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_'))
    {
        return Err(invalid(what, name, format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

/// Validate a space or virtual-space name.
///
/// # Examples
///
/// ```
/// use areg_types::names::validate_space_name;
///
/// assert!(validate_space_name("main").is_ok());
/// assert!(validate_space_name("Main").is_err());
/// assert!(validate_space_name("main-overwrites").is_err());
/// ```
pub fn validate_space_name(name: &str) -> Result<(), TypeError> {
    validate_slug("space", name)?;
    if name.ends_with(RESERVED_SUFFIX) {
        return Err(invalid(
            "space",
            name,
            format!("must not end with the reserved suffix {RESERVED_SUFFIX:?}"),
        ));
    }
    Ok(())
}

/// Validate an app slug.
pub fn validate_app_name(name: &str) -> Result<(), TypeError> {
    validate_slug("app", name)
}

/// Validate an editor name.
pub fn validate_editor_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(invalid("editor", name, "must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(
            "editor",
            name,
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid("editor", name, format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}
