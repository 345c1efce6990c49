//! Field rules shared by API payloads and import rows.
//!
//! Messages follow the wording clients of the directory already display.

use crate::ValidationError;
use validator::ValidateEmail;

/// Maximum length of entity names.
pub const NAME_MAX: usize = 200;
/// Maximum length of phone numbers.
pub const PHONE_MAX: usize = 35;
/// Maximum length of websites and website usernames.
pub const WEBSITE_MAX: usize = 255;
/// Maximum length of a stored password token.
pub const PASSWORD_TOKEN_MAX: usize = 500;
/// Maximum length of usernames.
pub const USERNAME_MAX: usize = 150;

/// Blank-field message.
pub const BLANK: &str = "This field may not be blank.";
/// Invalid-email message.
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Records an error when a required text field is blank.
pub fn required(errors: &mut ValidationError, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, BLANK);
    }
}

/// Records an error when a value exceeds `max` characters.
pub fn max_chars(errors: &mut ValidationError, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        if v.chars().count() > max {
            errors.add(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
        }
    }
}

/// Records an error when a non-empty value is not an email address.
pub fn email(errors: &mut ValidationError, field: &str, value: Option<&str>) {
    if let Some(v) = value {
        if !v.is_empty() && !v.to_string().validate_email() {
            errors.add(field, INVALID_EMAIL);
        }
    }
}

/// Validates a required name with the default length limit.
pub fn name(errors: &mut ValidationError, field: &str, value: &str) {
    required(errors, field, value);
    max_chars(errors, field, Some(value), NAME_MAX);
}

/// Trims a cell or payload string, mapping empty to `None`.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
