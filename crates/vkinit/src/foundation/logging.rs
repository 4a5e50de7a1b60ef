//! Logging setup
//!
//! The library only talks to the `log` facade; binaries call [`init`] once.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// `default_level` applies when `RUST_LOG` is unset. Calling this twice is
/// harmless; the second call is ignored.
pub fn init(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init("debug");
        init("info");
    }
}
