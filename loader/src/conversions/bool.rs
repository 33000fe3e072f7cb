use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// Tokens accepted as `true`, compared case-insensitively after trimming.
pub const TRUE_TOKENS: &[&str] = &["true", "t", "1", "yes", "y"];
/// Tokens accepted as `false`, compared case-insensitively after trimming.
pub const FALSE_TOKENS: &[&str] = &["false", "f", "0", "no", "n"];

pub fn parse_bool(s: &str) -> EtlResult<bool> {
    let token = s.trim().to_ascii_lowercase();

    if TRUE_TOKENS.contains(&token.as_str()) {
        Ok(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Ok(false)
    } else {
        bail!(
            ErrorKind::InvalidData,
            "Invalid boolean value",
            format!("Boolean value must be one of true/t/1/yes/y or false/f/0/no/n (received: {s})")
        );
    }
}
