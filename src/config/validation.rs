use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("scheduler.max_threads must be at least 1")]
    NoWorkerSlots,

    #[error("requests.timeout must be positive")]
    ZeroTimeout,

    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },

    #[error("vcs.program must not be empty")]
    EmptyVcsProgram,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_scheduler(config)?;
    validate_requests(config)?;
    validate_snapshots(config)?;
    validate_vcs(config)?;
    Ok(())
}

fn validate_scheduler(config: &Config) -> Result<(), ValidationError> {
    if config.scheduler.max_threads == 0 {
        return Err(ValidationError::NoWorkerSlots);
    }
    Ok(())
}

fn validate_requests(config: &Config) -> Result<(), ValidationError> {
    if config.requests.timeout.is_zero() {
        return Err(ValidationError::ZeroTimeout);
    }
    if config.requests.jobs_file.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath {
            field: "requests.jobs_file",
        });
    }
    Ok(())
}

fn validate_snapshots(config: &Config) -> Result<(), ValidationError> {
    if config.snapshots.dir.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath {
            field: "snapshots.dir",
        });
    }
    Ok(())
}

fn validate_vcs(config: &Config) -> Result<(), ValidationError> {
    if config.vcs.program.trim().is_empty() {
        return Err(ValidationError::EmptyVcsProgram);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::HumanDuration;
    use std::path::PathBuf;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_workers() {
        let mut config = Config::default();
        config.scheduler.max_threads = 0;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::NoWorkerSlots)));
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.requests.timeout = HumanDuration::from_secs(0);

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::ZeroTimeout)));
    }

    #[test]
    fn test_zero_intervals_allowed() {
        let mut config = Config::default();
        config.scheduler.each_interval = HumanDuration::from_secs(0);
        config.scheduler.polling_interval = HumanDuration::from_secs(0);

        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_snapshot_dir() {
        let mut config = Config::default();
        config.snapshots.dir = PathBuf::new();

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::EmptyPath { field: "snapshots.dir" })
        ));
    }

    #[test]
    fn test_empty_vcs_program() {
        let mut config = Config::default();
        config.vcs.program = "  ".to_string();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::EmptyVcsProgram)));
    }
}
