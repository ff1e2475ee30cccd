//! Configuration types, loaded from environment variables.

use std::path::PathBuf;

use crate::dispatch::ProcessDispatcher;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::session::{RoutingMode, SessionSettings};
use crate::task::TaskVariant;

/// How to launch the worker executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Program to run, e.g. `python3`.
    pub program: String,
    /// Arguments placed before the job's positional arguments.
    pub args: Vec<String>,
    /// Working directory for the worker (inherits ours if unset).
    pub working_dir: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-u".to_string(), "app/browser_controller.py".to_string()],
            working_dir: None,
        }
    }
}

impl WorkerConfig {
    pub fn dispatcher(&self) -> ProcessDispatcher {
        let dispatcher =
            ProcessDispatcher::new(self.program.clone()).with_leading_args(self.args.clone());
        match self.working_dir {
            Some(ref dir) => dispatcher.with_working_dir(dir.clone()),
            None => dispatcher,
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Port the HTTP/WebSocket server binds on.
    pub port: u16,
    pub session: SessionSettings,
    pub worker: WorkerConfig,
    pub llm: LlmConfig,
}

impl AgentConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("BROWSER_AGENT_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(8000);

        let variant =
            parse_or_default(&lookup, "BROWSER_AGENT_VARIANT", TaskVariant::Credentialed)?;
        let routing =
            parse_or_default(&lookup, "BROWSER_AGENT_ROUTING", RoutingMode::IntentGated)?;

        let defaults = WorkerConfig::default();
        let worker = WorkerConfig {
            program: lookup("BROWSER_AGENT_WORKER").unwrap_or(defaults.program),
            args: lookup("BROWSER_AGENT_WORKER_ARGS")
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or(defaults.args),
            working_dir: lookup("BROWSER_AGENT_WORKER_DIR").map(PathBuf::from),
        };

        let backend = parse_or_default(&lookup, "BROWSER_AGENT_LLM", LlmBackend::Anthropic)?;
        let api_key = lookup(backend.api_key_var())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(backend.api_key_var().to_string()))?;
        let model = lookup("BROWSER_AGENT_MODEL")
            .unwrap_or_else(|| backend.default_model().to_string());

        Ok(Self {
            port,
            session: SessionSettings { variant, routing },
            worker,
            llm: LlmConfig {
                backend,
                api_key: secrecy::SecretString::from(api_key),
                model,
            },
        })
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr<Err = String>,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        }),
        None => Ok(default),
    }
}
