//! KDL configuration parser

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a configuration file, falling back to defaults when it doesn't exist
///
/// The daemon is usable without any configuration, so a missing file is not
/// an error. Any other IO failure or a malformed file still is.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!(
            "No configuration at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    parse_config(path)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so we need to extract offset/len manually
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    let Some(children) = node.children() else {
        return Ok(global);
    };

    for child in children.nodes() {
        match child.name().value() {
            "log-level" => {
                let val = string_arg(child)?;
                global.log_level = val
                    .parse()
                    .map_err(|message| ConfigError::Invalid { message })?;
            }
            "state-file" => {
                global.state_file = expand_path(string_arg(child)?);
            }
            "xkb-rules" => {
                global.xkb_rules = expand_path(string_arg(child)?);
            }
            "flush-interval" => {
                let secs = integer_arg(child)?;
                if secs <= 0 {
                    return Err(ConfigError::Invalid {
                        message: format!("flush-interval must be positive, got {}", secs),
                    });
                }
                global.flush_interval = Duration::from_secs(secs as u64);
            }
            "request-timeout" => {
                let millis = integer_arg(child)?;
                global.request_timeout = match millis {
                    0 => None,
                    ms if ms > 0 => Some(Duration::from_millis(ms as u64)),
                    ms => {
                        return Err(ConfigError::Invalid {
                            message: format!("request-timeout must not be negative, got {}", ms),
                        })
                    }
                };
            }
            name => {
                tracing::warn!("Unknown global config option: {}", name);
            }
        }
    }

    Ok(global)
}

/// `-` selects the in-memory store and must not be touched by tilde expansion
fn expand_path(val: &str) -> PathBuf {
    if val == "-" {
        return PathBuf::from(val);
    }
    shellexpand::tilde(val).into_owned().into()
}

fn string_arg(node: &kdl::KdlNode) -> Result<&str, ConfigError> {
    node.entries()
        .first()
        .and_then(|entry| entry.value().as_string())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!("{} expects a string argument", node.name().value()),
        })
}

fn integer_arg(node: &kdl::KdlNode) -> Result<i64, ConfigError> {
    node.entries()
        .first()
        .and_then(|entry| entry.value().as_i64())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!("{} expects an integer argument", node.name().value()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = r#"
            global {
                log-level "debug"
                state-file "/var/lib/hyprboard/state.json"
                xkb-rules "/opt/xkb/evdev.xml"
                flush-interval 30
                request-timeout 250
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.global.log_level, LogLevel::Debug);
        assert_eq!(
            result.global.state_file,
            PathBuf::from("/var/lib/hyprboard/state.json")
        );
        assert_eq!(result.global.xkb_rules, PathBuf::from("/opt/xkb/evdev.xml"));
        assert_eq!(result.global.flush_interval, Duration::from_secs(30));
        assert_eq!(
            result.global.request_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let result = parse_config_str("").unwrap();
        assert_eq!(result, Config::default());
        assert_eq!(result.global.xkb_rules, PathBuf::from(DEFAULT_XKB_RULES));
        assert_eq!(result.global.flush_interval, DEFAULT_FLUSH_INTERVAL);
    }

    #[test]
    fn test_memory_state_file_is_not_expanded() {
        let config = r#"
            global {
                state-file "-"
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.global.state_file, PathBuf::from("-"));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let config = r#"
            global {
                state-file "~/state.json"
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert!(!result.global.state_file.to_string_lossy().starts_with('~'));
        assert!(result.global.state_file.ends_with("state.json"));
    }

    #[test]
    fn test_zero_request_timeout_disables_deadline() {
        let config = r#"
            global {
                request-timeout 0
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.global.request_timeout, None);
    }

    #[test]
    fn test_invalid_log_level() {
        let config = r#"
            global {
                log-level "chatty"
            }
        "#;

        match parse_config_str(config) {
            Err(ConfigError::Invalid { message }) => {
                assert!(message.contains("chatty"));
            }
            other => panic!("Expected Invalid error, got: {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_flush_interval_rejected() {
        let config = r#"
            global {
                flush-interval 0
            }
        "#;

        assert!(matches!(
            parse_config_str(config),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_wrong_argument_type_rejected() {
        let config = r#"
            global {
                flush-interval "soon"
            }
        "#;

        match parse_config_str(config) {
            Err(ConfigError::Invalid { message }) => {
                assert!(message.contains("flush-interval"));
            }
            other => panic!("Expected Invalid error, got: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        let config = r#"
            device "Test Keyboard" {}
            global {
                colour "blue"
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.global.log_level, LogLevel::Info);
    }

    #[test]
    fn test_malformed_kdl_reports_parse_error() {
        let result = parse_config_str("global {");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let result = load_config(Path::new("/nonexistent/hyprboard/config.kdl")).unwrap();
        assert_eq!(result, Config::default());
    }
}
