use crate::app::Command;
use crate::config::toml_config::DispatchConfig;
use crate::domain::model::{GuardId, GuardStatus, RequestId, RequestState};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "guard-dispatch")]
#[command(about = "Assign guards to service requests")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override storage.path from the config file
    #[arg(long)]
    pub state: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Action {
    /// Add a free guard to the pool
    Provision {
        #[arg(long)]
        label: String,
    },
    /// Submit a service request (starts pending)
    Request {
        #[arg(long)]
        client: String,
        /// RFC 3339 timestamp, e.g. 2026-11-01T08:00:00Z
        #[arg(long)]
        at: DateTime<Utc>,
        #[arg(long, default_value = "1")]
        hours: u32,
    },
    /// Bind a free guard to a pending request
    Assign {
        #[arg(long)]
        request: u64,
    },
    /// Mark an assigned request completed
    Complete {
        #[arg(long)]
        request: u64,
    },
    /// Return a committed guard to the pool
    Release {
        #[arg(long)]
        guard: u64,
    },
    /// List guards, requests or bindings
    List {
        #[command(subcommand)]
        target: ListTarget,
    },
    /// Show pool counts
    Status,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ListTarget {
    Guards {
        #[arg(long, value_enum)]
        status: Option<GuardStatusArg>,
    },
    Requests {
        #[arg(long, value_enum)]
        state: Option<RequestStateArg>,
    },
    Bindings,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GuardStatusArg {
    Free,
    Committed,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RequestStateArg {
    Pending,
    Assigned,
    Completed,
}

impl From<GuardStatusArg> for GuardStatus {
    fn from(arg: GuardStatusArg) -> Self {
        match arg {
            GuardStatusArg::Free => GuardStatus::Free,
            GuardStatusArg::Committed => GuardStatus::Committed,
        }
    }
}

impl From<RequestStateArg> for RequestState {
    fn from(arg: RequestStateArg) -> Self {
        match arg {
            RequestStateArg::Pending => RequestState::Pending,
            RequestStateArg::Assigned => RequestState::Assigned,
            RequestStateArg::Completed => RequestState::Completed,
        }
    }
}

impl Action {
    pub fn into_command(self) -> Command {
        match self {
            Action::Provision { label } => Command::ProvisionGuard { label },
            Action::Request { client, at, hours } => Command::CreateRequest {
                client_id: client,
                service_time: at,
                duration_hours: hours,
            },
            Action::Assign { request } => Command::AssignResource {
                request_id: RequestId(request),
            },
            Action::Complete { request } => Command::CompleteRequest {
                request_id: RequestId(request),
            },
            Action::Release { guard } => Command::ReleaseGuard {
                guard_id: GuardId(guard),
            },
            Action::List { target } => match target {
                ListTarget::Guards { status } => Command::ListGuards {
                    status: status.map(Into::into),
                },
                ListTarget::Requests { state } => Command::ListRequests {
                    state: state.map(Into::into),
                },
                ListTarget::Bindings => Command::ListBindings,
            },
            Action::Status => Command::PoolStatus,
        }
    }
}

impl CliConfig {
    /// Loads the config file (or defaults) and applies command line overrides.
    pub fn resolve(&self) -> Result<DispatchConfig> {
        let mut config = match &self.config {
            Some(path) => DispatchConfig::from_file(path)?,
            None => DispatchConfig::default(),
        };

        if let Some(state) = &self.state {
            config.storage.backend = "json".to_string();
            config.storage.path = state.clone();
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }

        Ok(config)
    }
}
