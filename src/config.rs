/// Store-bound migration configuration
///
/// Only governs I/O around the pure migration chain; transformers themselves
/// take no configuration beyond [`crate::migrations::TransformOptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Maximum number of write-backs in flight at once
    pub write_concurrency: usize,

    /// Compute every migration but never write
    pub dry_run: bool,

    /// Abort the batch on the first failed write instead of recording it
    pub stop_on_write_error: bool,
}

impl MigrationConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            write_concurrency: 8,
            dry_run: false,
            stop_on_write_error: false,
        }
    }

    /// Set the write concurrency (clamped to at least 1)
    pub fn write_concurrency(mut self, concurrency: usize) -> Self {
        self.write_concurrency = concurrency.max(1);
        self
    }

    /// Enable or disable dry-run mode
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable fail-fast on write errors
    pub fn stop_on_write_error(mut self, stop: bool) -> Self {
        self.stop_on_write_error = stop;
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MigrationConfig::default();
        assert_eq!(config.write_concurrency, 8);
        assert!(!config.dry_run);
        assert!(!config.stop_on_write_error);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MigrationConfig::new()
            .write_concurrency(0)
            .dry_run(true)
            .stop_on_write_error(true);

        assert_eq!(config.write_concurrency, 1);
        assert!(config.dry_run);
        assert!(config.stop_on_write_error);
    }
}
