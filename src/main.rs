use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use papers_chat::commands::dispatcher::DEFAULT_RESOURCE_SCHEME;
use papers_chat::mcp_client::NamespaceMode;
use papers_chat::RunOptions;

#[derive(Parser)]
#[command(
    name = "papers-chat",
    about = "Chat with a language model that can use tools from several MCP servers",
    version
)]
struct Cli {
    /// MCP servers configuration file
    #[arg(short, long, default_value = "server_config.json")]
    servers: PathBuf,

    /// Model configuration file (YAML)
    #[arg(long)]
    model_config: Option<PathBuf>,

    /// Override the model name
    #[arg(short, long)]
    model: Option<String>,

    /// Override the API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Put tools and prompts in one namespace
    #[arg(long)]
    shared_namespace: bool,

    /// Scheme used by @ resource shortcuts
    #[arg(long, default_value = DEFAULT_RESOURCE_SCHEME)]
    resource_scheme: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let namespace = if cli.shared_namespace {
        NamespaceMode::Shared
    } else {
        NamespaceMode::Partitioned
    };

    papers_chat::run(RunOptions {
        servers_config: cli.servers,
        model_config: cli.model_config,
        model: cli.model,
        api_base: cli.api_base,
        namespace,
        resource_scheme: cli.resource_scheme,
        verbose: cli.verbose,
    })
    .await
}
