use clap::Parser;
use guard_dispatch::core::DispatchStore;
use guard_dispatch::utils::error::ErrorSeverity;
use guard_dispatch::utils::{logger, validation::Validate};
use guard_dispatch::{
    CliConfig, Command, CommandOutput, DispatchConfig, DispatchError, Dispatcher, InMemoryStore,
    JsonFileStore,
};
use std::sync::Arc;

async fn execute<S: DispatchStore>(
    store: Arc<S>,
    config: &DispatchConfig,
    command: Command,
) -> guard_dispatch::Result<CommandOutput> {
    let dispatcher = Dispatcher::new(store, config.engine_settings());
    dispatcher.seed_guards(&config.pool.guards).await?;
    dispatcher.handle(command).await
}

async fn run(config: &DispatchConfig, command: Command) -> guard_dispatch::Result<CommandOutput> {
    if config.uses_memory_backend() {
        tracing::warn!("Memory backend selected, state is discarded on exit");
        execute(Arc::new(InMemoryStore::new()), config, command).await
    } else {
        let store = JsonFileStore::open(&config.storage.path).await?;
        tracing::debug!("Using state file {}", store.path().display());
        execute(Arc::new(store), config, command).await
    }
}

fn exit_code(e: &DispatchError) -> i32 {
    // 依錯誤嚴重程度決定退出碼
    match e.severity() {
        ErrorSeverity::Medium => 2, // 可重試
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    };

    logger::init_cli_logger(cli.verbose, &config.logging.level, config.log_format());
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(exit_code(&e));
    }

    let command = cli.action.into_command();
    match run(&config, command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Err(e) => {
            tracing::error!(
                "Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    }

    Ok(())
}
