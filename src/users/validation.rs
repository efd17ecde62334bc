use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{RegistrationRequest, ValidRegistration};
use super::error::ValidationErrors;

pub const NAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 120;
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Emails are compared lowercased; usernames are kept as typed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims surrounding whitespace; case is significant.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_string()
}

/// Checks a registration body against the schema and returns the normalized form.
///
/// Every broken field is reported, not only the first one.
pub fn validate_registration(
    input: RegistrationRequest,
) -> Result<ValidRegistration, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let first_name = check_name(&mut errors, "first_name", &input.first_name);
    let last_name = check_name(&mut errors, "last_name", &input.last_name);

    let email = normalize_email(&input.email);
    if email.is_empty() {
        errors.add("email", "must not be empty");
    } else if email.chars().count() > EMAIL_MAX_CHARS {
        errors.add("email", format!("must be at most {EMAIL_MAX_CHARS} characters"));
    } else if !is_valid_email(&email) {
        errors.add("email", "is not a valid email address");
    }

    let username = normalize_username(&input.username);
    let username_len = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&username_len) {
        errors.add(
            "username",
            format!("must be {USERNAME_MIN_CHARS}-{USERNAME_MAX_CHARS} characters"),
        );
    } else if !USERNAME_RE.is_match(&username) {
        errors.add(
            "username",
            "may only contain letters, digits, '_', '.' and '-'",
        );
    }

    let password = input.password;
    if password.chars().count() < PASSWORD_MIN_CHARS {
        errors.add(
            "password",
            format!("must be at least {PASSWORD_MIN_CHARS} characters"),
        );
    } else if !password.chars().any(|c| c.is_alphabetic())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        errors.add("password", "must contain a letter and a digit");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidRegistration {
        first_name,
        last_name,
        email,
        username,
        password,
    })
}

fn check_name(errors: &mut ValidationErrors, field: &'static str, raw: &str) -> String {
    let name = raw.trim().to_string();
    if name.is_empty() {
        errors.add(field, "must not be empty");
    } else if name.chars().count() > NAME_MAX_CHARS {
        errors.add(field, format!("must be at most {NAME_MAX_CHARS} characters"));
    }
    name
}
