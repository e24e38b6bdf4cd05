//! Environment-sourced defaults.
//!
//! Builders consult these only for values the caller did not pass
//! explicitly. Empty values count as unset.

/// Base URL of the relay.
pub const URL_VAR: &str = "SINKR_URL";

/// Application id appended to a path-less base URL.
pub const APP_ID_VAR: &str = "SINKR_APP_ID";

/// Application key used as the bearer credential by the source.
pub const APP_KEY_VAR: &str = "SINKR_APP_KEY";

/// Reads a variable from the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Picks the explicit value, falling back to `lookup(name)`.
pub(crate) fn explicit_or_env<F>(explicit: Option<String>, name: &str, lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let is_set = |value: &String| !value.trim().is_empty();

    explicit.filter(is_set).or_else(|| lookup(name).filter(is_set))
}
