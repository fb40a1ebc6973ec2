//! PII masking for log-safe output.
//!
//! Censors sensitive values before they reach logs or responses. The
//! generic mask uses a fixed-width asterisk run so the original length is
//! not leaked.

/// `johndoe@example.com` -> `j*****e@example.com`
pub fn mask_email(email: &str) -> String {
    let Some((user, domain)) = email.split_once('@') else {
        return email.to_string();
    };

    let chars: Vec<char> = user.chars().collect();
    let masked_user = match chars.as_slice() {
        [] => String::new(),
        [only] => format!("{only}*"),
        [first, .., last] if chars.len() > 2 => format!("{first}*****{last}"),
        [first, ..] => format!("{first}*"),
    };

    format!("{masked_user}@{domain}")
}

/// `081234567890` -> `********7890`
pub fn mask_phone(phone: &str) -> String {
    let len = phone.chars().count();
    if len < 4 {
        return "***".to_string();
    }
    let visible: String = phone.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(len - 4), visible)
}

/// `1234 5678 1234 5678` -> `************5678`
pub fn mask_credit_card(cc: &str) -> String {
    let digits: Vec<char> = cc.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return "***".to_string();
    }
    let visible: String = digits[digits.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(digits.len() - 4), visible)
}

/// Generic masking: `abcdefg` -> `ab************fg`
///
/// The asterisk run has a fixed length so the masked output does not reveal
/// how long the original was.
pub fn mask_string(text: &str, visible_start: usize, visible_end: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if visible_start + visible_end >= chars.len() {
        return text.to_string();
    }

    let start: String = chars[..visible_start].iter().collect();
    let end: String = chars[chars.len() - visible_end..].iter().collect();
    format!("{start}{}{end}", "*".repeat(12))
}
