//! General utilities shared across the application.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;

use crate::protocol_constants::GENERATED_PASSWORD_BYTES;

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Secrets
// ─────────────────────────────────────────────────────────────────────────────

/// Generates a random base64 password for the VLC HTTP interface.
///
/// Used when no password is configured; the same value is handed to the
/// launcher and to the control client.
#[must_use]
pub fn generate_password() -> String {
    let mut bytes = [0u8; GENERATED_PASSWORD_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment Expansion
// ─────────────────────────────────────────────────────────────────────────────

/// Expands environment variables in a path-like string.
///
/// Supports `%NAME%`, `$NAME` and `${NAME}`. Unknown variables are left
/// untouched.
#[must_use]
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(|c| c == '%' || c == '$') {
        out.push_str(&rest[..pos]);
        let marker = &rest[pos..];

        let (name, consumed) = if let Some(tail) = marker.strip_prefix('%') {
            match tail.find('%') {
                Some(end) if end > 0 => (&tail[..end], end + 2),
                _ => ("", 1),
            }
        } else if let Some(tail) = marker.strip_prefix("${") {
            match tail.find('}') {
                Some(end) if end > 0 => (&tail[..end], end + 3),
                _ => ("", 1),
            }
        } else {
            let tail = &marker[1..];
            let end = tail
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(tail.len());
            (&tail[..end], end + 1)
        };

        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => out.push_str(&marker[..consumed]),
        }
        rest = &marker[consumed..];
    }

    out.push_str(rest);
    out
}
