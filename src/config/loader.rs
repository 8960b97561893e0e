//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ReplicaConfig;
use crate::domain::errors::ReplicaError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static placeholder pattern is valid")
    })
}

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ReplicaConfig
/// 4. Applies environment variable overrides (REPLICA_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use replica::config::loader::load_config;
///
/// let config = load_config("replica.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ReplicaConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ReplicaError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ReplicaError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<ReplicaConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ReplicaConfig = toml::from_str(&contents)
        .map_err(|e| ReplicaError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ReplicaError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder_pattern();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ReplicaError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| ReplicaError::Configuration(format!("Invalid {name} value '{value}'")))
}

/// Applies environment variable overrides using REPLICA_* prefix
///
/// Environment variables follow the pattern: REPLICA_<SECTION>_<KEY>
/// For example: REPLICA_APPLICATION_LOG_LEVEL, REPLICA_CLONE_ANONYMIZE
fn apply_env_overrides(config: &mut ReplicaConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("REPLICA_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("REPLICA_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_flag("REPLICA_APPLICATION_DRY_RUN", &val)?;
    }

    // Anonymization overrides
    config
        .anonymization
        .apply_env_overrides()
        .map_err(|e| ReplicaError::Configuration(format!("{e:#}")))?;

    // Clone overrides
    if let Ok(val) = std::env::var("REPLICA_CLONE_ANONYMIZE") {
        config.clone.anonymize = parse_flag("REPLICA_CLONE_ANONYMIZE", &val)?;
    }
    if let Ok(val) = std::env::var("REPLICA_CLONE_CHECKPOINT_ENABLED") {
        config.clone.checkpoint.enabled = parse_flag("REPLICA_CLONE_CHECKPOINT_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("REPLICA_CLONE_CHECKPOINT_DIRECTORY") {
        config.clone.checkpoint.directory = PathBuf::from(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("REPLICA_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_flag("REPLICA_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("REPLICA_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("REPLICA_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("REPLICA_LOADER_TEST_VAR", "test_value");
        let input = "path = \"${REPLICA_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "path = \"test_value\"\n");
        std::env::remove_var("REPLICA_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("REPLICA_LOADER_MISSING_VAR");
        let input = "path = \"${REPLICA_LOADER_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# path = \"${REPLICA_LOADER_COMMENTED_VAR}\"";
        assert_eq!(substitute_env_vars(input).unwrap(), format!("{input}\n"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[anonymization]
strategy = "deterministic"

[[anonymization.rules]]
table = "users"
column = "phone"
strategy = "redact"

[clone]
anonymize = true

[clone.checkpoint]
directory = "./state/checkpoints"

[[environments]]
id = "prod"
type = "production"

[[environments]]
id = "dev"
type = "development"

[logging]
local_enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.anonymization.rules.len(), 1);
        assert_eq!(
            config.clone.checkpoint.directory,
            PathBuf::from("./state/checkpoints")
        );
        assert_eq!(config.environments.len(), 2);
        assert!(!config.logging.local_enabled);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = parse_config("[application]\nlog_level = \"loud\"\n");
        assert!(matches!(result, Err(ReplicaError::Configuration(_))));
    }
}
