//! Input validation for the server, script, and group directories.
//!
//! Pure functions returning [`CoreError::Validation`] so handlers can reject
//! bad input before touching any store.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default SSH port used when a server is registered without one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Maximum length of a hostname, per RFC 1035.
const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of a group or script name.
const MAX_NAME_LEN: usize = 128;

/// Maximum length of a remote login name.
const MAX_USERNAME_LEN: usize = 64;

/// Maximum size of a script body in bytes (1 MiB).
const MAX_SCRIPT_BYTES: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

/// Validate a server hostname.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_HOSTNAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, or dot characters.
pub fn validate_hostname(hostname: &str) -> Result<(), CoreError> {
    if hostname.is_empty() {
        return Err(CoreError::Validation(
            "Hostname must not be empty".to_string(),
        ));
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(CoreError::Validation(format!(
            "Hostname must not exceed {MAX_HOSTNAME_LEN} characters"
        )));
    }
    if !hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(CoreError::Validation(
            "Hostname may only contain alphanumeric, hyphen, or dot characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate the address used to reach a server (IP literal or DNS name).
pub fn validate_address(address: &str) -> Result<(), CoreError> {
    if address.trim().is_empty() {
        return Err(CoreError::Validation(
            "Address must not be empty".to_string(),
        ));
    }
    if address.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(
            "Address must not contain whitespace".to_string(),
        ));
    }
    Ok(())
}

/// Validate a port. Port 0 cannot be connected to.
pub fn validate_port(port: u16) -> Result<(), CoreError> {
    if port == 0 {
        return Err(CoreError::Validation("Port must be between 1 and 65535".to_string()));
    }
    Ok(())
}

/// Validate the login name used for remote sessions.
///
/// It ends up on the `ssh` command line as `user@address`, so it must not
/// start with `-` or contain `@` or whitespace.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    if username.is_empty() {
        return Err(CoreError::Validation(
            "Username must not be empty".to_string(),
        ));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(CoreError::Validation(format!(
            "Username must not exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.starts_with('-')
        || username.contains('@')
        || username.chars().any(char::is_whitespace)
    {
        return Err(CoreError::Validation(format!(
            "Invalid username: \"{username}\""
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scripts and groups
// ---------------------------------------------------------------------------

/// Validate a display name (scripts and groups).
pub fn validate_name(kind: &str, name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "{kind} name must not be empty"
        )));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "{kind} name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a script body.
pub fn validate_script_content(content: &str) -> Result<(), CoreError> {
    if content.trim().is_empty() {
        return Err(CoreError::Validation(
            "Script content must not be empty".to_string(),
        ));
    }
    if content.len() > MAX_SCRIPT_BYTES {
        return Err(CoreError::Validation(format!(
            "Script content must not exceed {MAX_SCRIPT_BYTES} bytes"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
