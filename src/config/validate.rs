// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuildError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.build, raw.platform))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_build_section(cfg)?;
    validate_platform_names(cfg)?;
    Ok(())
}

fn validate_build_section(cfg: &RawConfigFile) -> Result<()> {
    // failure_mode and log_level are strongly typed and validated during
    // deserialization.
    if cfg.build.jobs == Some(0) {
        return Err(BuildError::Configuration(
            "[build].jobs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_platform_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.platform.keys() {
        if name.trim().is_empty() {
            return Err(BuildError::Configuration(
                "[platform] table names must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}
