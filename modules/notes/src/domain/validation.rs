use crate::domain::error::FieldError;

pub const BLANK: &str = "This field may not be blank.";

/// Appends the username's problems to `errors`; returns whether it was acceptable.
pub fn check_username(username: &str, max_len: usize, errors: &mut Vec<FieldError>) -> bool {
    if username.is_empty() {
        errors.push(FieldError::new("username", BLANK));
        return false;
    }
    if username.chars().count() > max_len {
        errors.push(FieldError::new(
            "username",
            format!("Ensure this field has no more than {max_len} characters."),
        ));
        return false;
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.push(FieldError::new(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
        return false;
    }
    true
}

pub fn check_password(password: &str, min_len: usize, errors: &mut Vec<FieldError>) {
    if password.is_empty() {
        errors.push(FieldError::new("password", BLANK));
    } else if password.chars().count() < min_len {
        errors.push(FieldError::new(
            "password",
            format!("Ensure this field has at least {min_len} characters."),
        ));
    }
}

/// Empty means "no email" and is accepted.
pub fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if !email.is_empty() && !is_valid_email(email) {
        errors.push(FieldError::new("email", "Enter a valid email address."));
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || !domain.contains('.') {
        return false;
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}

/// Trimmed note text, or a field error when nothing is left.
pub fn clean_text(text: &str) -> Result<String, FieldError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(FieldError::new("text", BLANK))
    } else {
        Ok(trimmed.to_string())
    }
}
