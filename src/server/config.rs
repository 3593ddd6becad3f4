use std::net::SocketAddr;

use crate::pem_decoder::{BlockPolicy, EngineOptions};

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
/// 2MB is plenty for PEM text.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 2 * 1000 * 1000;

const ENV_ADDR: &str = "PEMVIEW_ADDR";
const ENV_MAX_REQUEST_BYTES: &str = "PEMVIEW_MAX_REQUEST_BYTES";
const ENV_ALLOW_CHAIN: &str = "PEMVIEW_ALLOW_CHAIN";
const ENV_FINGERPRINTS: &str = "PEMVIEW_FINGERPRINTS";
const ENV_DEBUG: &str = "PEMVIEW_DEBUG";
const DEBUG_ARG: &str = "--debug";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub max_request_bytes: usize,
    pub allow_chain: bool,
    pub fingerprints: bool,
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            allow_chain: false,
            fingerprints: true,
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Read the process environment and command line arguments.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }

    /// Whether debug logging was asked for. Needed before the logger exists.
    pub fn debug_requested() -> bool {
        debug_from(
            std::env::var(ENV_DEBUG).ok().as_deref(),
            std::env::args().skip(1),
        )
    }

    pub fn from_lookup<F, I>(lookup: F, args: I) -> Self
    where
        F: Fn(&str) -> Option<String>,
        I: IntoIterator<Item = String>,
    {
        let defaults = Self::default();
        let addr = match lookup(ENV_ADDR) {
            Some(raw) => raw.trim().parse::<SocketAddr>().unwrap_or_else(|err| {
                log::warn!(target: "pemview/config", "ignoring {ENV_ADDR}={raw:?}: {err}, using {DEFAULT_ADDR}");
                defaults.addr
            }),
            None => defaults.addr,
        };
        let max_request_bytes = match lookup(ENV_MAX_REQUEST_BYTES) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => {
                    log::warn!(
                        target: "pemview/config",
                        "ignoring {ENV_MAX_REQUEST_BYTES}={raw:?}, using {DEFAULT_MAX_REQUEST_BYTES}"
                    );
                    defaults.max_request_bytes
                }
            },
            None => defaults.max_request_bytes,
        };
        let debug_env = lookup(ENV_DEBUG);

        Self {
            addr,
            max_request_bytes,
            allow_chain: flag(ENV_ALLOW_CHAIN, lookup(ENV_ALLOW_CHAIN), defaults.allow_chain),
            fingerprints: flag(ENV_FINGERPRINTS, lookup(ENV_FINGERPRINTS), defaults.fingerprints),
            debug: debug_from(debug_env.as_deref(), args),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            policy: if self.allow_chain {
                BlockPolicy::Chain
            } else {
                BlockPolicy::Single
            },
            fingerprints: self.fingerprints,
        }
    }
}

fn debug_from<I>(env: Option<&str>, args: I) -> bool
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().any(|arg| arg == DEBUG_ARG) || env.and_then(parse_bool).unwrap_or(false)
}

fn flag(name: &str, raw: Option<String>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    parse_bool(&raw).unwrap_or_else(|| {
        log::warn!(target: "pemview/config", "ignoring {name}={raw:?}, using {default}");
        default
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ServerConfig, parse_bool};
    use crate::pem_decoder::BlockPolicy;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)], args: &[&str]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(
            |key| vars.get(key).cloned(),
            args.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        )
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[], &[]);
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.addr.port(), 8080);
        assert_eq!(cfg.max_request_bytes, 2_000_000);
        assert_eq!(cfg.engine_options().policy, BlockPolicy::Single);
        assert!(cfg.engine_options().fingerprints);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(
            &[
                ("PEMVIEW_ADDR", "127.0.0.1:9000"),
                ("PEMVIEW_MAX_REQUEST_BYTES", "4096"),
                ("PEMVIEW_ALLOW_CHAIN", "true"),
                ("PEMVIEW_FINGERPRINTS", "0"),
            ],
            &[],
        );
        assert_eq!(cfg.addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.max_request_bytes, 4096);
        assert_eq!(cfg.engine_options().policy, BlockPolicy::Chain);
        assert!(!cfg.fingerprints);
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config(
            &[
                ("PEMVIEW_ADDR", "not an address"),
                ("PEMVIEW_MAX_REQUEST_BYTES", "-3"),
                ("PEMVIEW_ALLOW_CHAIN", "maybe"),
            ],
            &[],
        );
        let defaults = ServerConfig::default();
        assert_eq!(cfg.addr, defaults.addr);
        assert_eq!(cfg.max_request_bytes, defaults.max_request_bytes);
        assert!(!cfg.allow_chain);
    }

    #[test]
    fn debug_from_flag_or_env() {
        assert!(config(&[], &["--debug"]).debug);
        assert!(config(&[("PEMVIEW_DEBUG", "1")], &[]).debug);
        assert!(!config(&[("PEMVIEW_DEBUG", "off")], &["--other"]).debug);
    }

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
