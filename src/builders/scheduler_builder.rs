//! Builder that turns a [`SchedulerConfig`] into a running [`Scheduler`].

use crate::config::SchedulerConfig;
use crate::core::{BuildError, Scheduler, Spawn};
use crate::runtime::TokioSpawner;

/// Builder for [`Scheduler`].
#[derive(Debug, Clone, Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
}

impl SchedulerBuilder {
    /// Start from default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration.
    pub const fn from_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Start from `.env` and `REQUEST_QUEUE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidConfig`] on unparsable or invalid values.
    pub fn from_env() -> Result<Self, BuildError> {
        SchedulerConfig::from_env()
            .map(Self::from_config)
            .map_err(BuildError::InvalidConfig)
    }

    /// Start from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidConfig`] on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, BuildError> {
        SchedulerConfig::from_json_str(input)
            .map(Self::from_config)
            .map_err(BuildError::InvalidConfig)
    }

    /// Adjust the configuration with its fluent setters.
    #[must_use]
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(SchedulerConfig) -> SchedulerConfig,
    {
        self.config = f(self.config);
        self
    }

    /// Configuration the scheduler will be built with.
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Build on the tokio runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// [`BuildError::NoRuntime`] outside a tokio runtime, or
    /// [`BuildError::InvalidConfig`].
    pub fn build(self) -> Result<Scheduler<TokioSpawner>, BuildError> {
        let spawner = TokioSpawner::current()?;
        self.build_with_spawner(spawner)
    }

    /// Build with a custom spawner.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidConfig`] if validation fails.
    pub fn build_with_spawner<S>(self, spawner: S) -> Result<Scheduler<S>, BuildError>
    where
        S: Spawn + Clone + Send + Sync + 'static,
    {
        Scheduler::new(self.config, spawner)
    }
}
