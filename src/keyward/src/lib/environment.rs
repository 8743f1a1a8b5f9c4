use crate::lib::progress_bar::ProgressBar;
use keyward_core::config::Config;
use slog::Logger;
use std::borrow::Cow;

pub trait Environment {
    fn get_config(&self) -> &Config;
    fn get_logger(&self) -> &Logger;

    /// A spinner, unless output is quieted.
    fn new_spinner(&self, message: Cow<'static, str>) -> ProgressBar;
}

pub struct EnvironmentImpl {
    config: Config,
    logger: Logger,
    verbose_level: i64,
    progress: bool,
}

impl EnvironmentImpl {
    pub fn new(config: Config) -> Self {
        EnvironmentImpl {
            config,
            logger: Logger::root(slog::Discard, slog::o!()),
            verbose_level: 0,
            progress: true,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_verbose_level(mut self, verbose_level: i64) -> Self {
        self.verbose_level = verbose_level;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

impl Environment for EnvironmentImpl {
    fn get_config(&self) -> &Config {
        &self.config
    }

    fn get_logger(&self) -> &Logger {
        &self.logger
    }

    fn new_spinner(&self, message: Cow<'static, str>) -> ProgressBar {
        if self.progress && self.verbose_level >= 0 {
            ProgressBar::new_spinner(message)
        } else {
            ProgressBar::discard()
        }
    }
}
