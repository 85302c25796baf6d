use std::{env, str::FromStr};

/// Read `name` through `lookup`, falling back to `default` when unset.
/// A value that is set but does not parse is an error.
pub fn env_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|err| anyhow::anyhow!("Environment variable {name} is invalid: {err}")),
        None => Ok(default),
    }
}

pub fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}
