pub mod agent_core;
pub mod commands;
pub mod inference;
pub mod mcp_client;
pub mod repl;

#[cfg(test)]
pub(crate) mod test_support;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use anyhow::Context;

use agent_core::ConversationEngine;
use commands::Dispatcher;
use inference::{ChatModel, InferenceClient};
use mcp_client::{McpClient, NamespaceMode};

/// Options for one interactive run, normally built from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// JSON file listing the MCP servers to start.
    pub servers_config: PathBuf,
    /// Optional YAML model configuration.
    pub model_config: Option<PathBuf>,
    /// Overrides `model_name` from the model configuration.
    pub model: Option<String>,
    /// Overrides `base_url` from the model configuration.
    pub api_base: Option<String>,
    pub namespace: NamespaceMode,
    /// Scheme used by `@` shortcuts.
    pub resource_scheme: String,
    pub verbose: bool,
}

/// Return the platform-standard data directory for papers-chat.
///
/// - macOS: `~/Library/Application Support/papers-chat/`
/// - Linux: `$XDG_DATA_HOME/papers-chat/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.papers-chat/` only if none of the above can be resolved.
pub(crate) fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("papers-chat");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".papers-chat")
}

/// Initialize the tracing subscriber.
///
/// Logs go to a file in the data directory rather than the terminal so they
/// never interleave with the REPL. On each startup existing logs are rotated
/// (keeps the last 3). If the data directory is not writable, warnings and
/// errors go to stderr instead and `None` is returned.
fn init_tracing(verbose: bool) -> Option<PathBuf> {
    let log_dir = data_dir();
    match open_log_file(&log_dir) {
        Ok((log_path, log_file)) => {
            install_subscriber(
                log_filter(verbose, "papers_chat=info,warn"),
                FlushingWriter::new(log_file),
            );
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                data_dir = %log_dir.display(),
                log_file = %log_path.display(),
                pid = std::process::id(),
                "=== papers-chat starting ==="
            );
            Some(log_path)
        }
        Err(e) => {
            install_subscriber(log_filter(verbose, "warn"), std::io::stderr);
            tracing::warn!(error = ?e, "file logging unavailable, logging to stderr");
            None
        }
    }
}

fn log_filter(verbose: bool, default: &str) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    if verbose {
        EnvFilter::new("papers_chat=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    }
}

fn install_subscriber<W>(filter: tracing_subscriber::EnvFilter, writer: W)
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init();
    if let Err(e) = installed {
        eprintln!("warning: failed to install tracing subscriber: {e}");
    }
}

/// Create the log directory, rotate old logs and open a fresh `chat.log`.
fn open_log_file(log_dir: &std::path::Path) -> anyhow::Result<(PathBuf, std::fs::File)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    let log_path = log_dir.join("chat.log");

    // Rotate: chat.log.2 → .3, .1 → .2, chat.log → .1
    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    Ok((log_path, log_file))
}

/// Rotate log files: `chat.log` → `chat.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &std::path::Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write.
///
/// Each log line is on disk immediately, so the log survives a crash or a
/// hard kill of the terminal.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// A front end that borrows the dispatcher until the user is done.
type FrontEnd<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + 'a>>;

fn terminal_front_end(dispatcher: &mut Dispatcher) -> FrontEnd<'_> {
    Box::pin(repl::run(dispatcher))
}

/// Run the interactive client until the user quits.
///
/// Configuration errors abort before any server is started. Once servers
/// are connected, every session is shut down on the way out, whether the
/// REPL ended normally, with an error, or by an interrupt.
pub async fn run(options: RunOptions) -> anyhow::Result<()> {
    let log_path = init_tracing(options.verbose);

    let servers = mcp_client::load_servers_config(&options.servers_config)
        .context("invalid MCP server configuration")?;

    let mut model_config = inference::load_model_config(options.model_config.as_deref())
        .context("invalid model configuration")?;
    if let Some(model) = &options.model {
        model_config.model_name = model.clone();
    }
    if let Some(api_base) = &options.api_base {
        model_config.base_url = api_base.clone();
    }
    let system_prompt = model_config.system_prompt.clone();
    let model = InferenceClient::from_config(model_config)?;

    let mut mcp_client = McpClient::new(options.namespace);
    let started = tokio::select! {
        failures = mcp_client.start_all(&servers) => Some(failures),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(failures) = started else {
        println!("\nInterrupted during startup.");
        tracing::info!("startup interrupted");
        mcp_client.shutdown_all().await;
        return Ok(());
    };

    println!("\nMCP Client Started!");
    println!(
        "Model: {}  |  Endpoint: {}",
        model.model_name(),
        model.base_url()
    );
    for name in mcp_client.running_servers() {
        println!("Connected to server: {name}");
    }
    for (name, err) in &failures {
        println!("Failed to connect to server '{name}': {err}");
    }
    println!("{}", mcp_client.registry.capability_summary());
    match &log_path {
        Some(path) => println!("Logs: {}", path.display()),
        None => println!("Logs: stderr ({} is not writable)", data_dir().display()),
    }

    tracing::info!(
        running_servers = mcp_client.running_server_count(),
        failed_servers = failures.len(),
        total_tools = mcp_client.tool_count(),
        namespace = ?options.namespace,
        "MCP client initialized"
    );

    let engine = ConversationEngine::new(Box::new(model), system_prompt.as_deref());
    let dispatcher = Dispatcher::new(mcp_client, engine, &options.resource_scheme);

    serve(dispatcher, terminal_front_end).await
}

/// Drive `front_end` to completion, then release every MCP session.
async fn serve<F>(mut dispatcher: Dispatcher, front_end: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(&'a mut Dispatcher) -> FrontEnd<'a>,
{
    let result = front_end(&mut dispatcher).await;
    dispatcher.shutdown().await;
    tracing::info!("=== papers-chat stopped ===");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use crate::mcp_client::ProviderSession;
    use crate::test_support::{FakeSession, ScriptedModel};

    #[test]
    fn test_rotate_log_file_shifts_and_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("chat.log");
        for (suffix, body) in [("", "current"), (".1", "one"), (".2", "two"), (".3", "three")] {
            std::fs::write(format!("{}{suffix}", base.display()), body).unwrap();
        }

        rotate_log_file(&base, 3);

        assert!(!base.exists());
        let read = |suffix: &str| std::fs::read_to_string(format!("{}{suffix}", base.display())).unwrap();
        assert_eq!(read(".1"), "current");
        assert_eq!(read(".2"), "one");
        assert_eq!(read(".3"), "two");
    }

    #[test]
    fn test_flushing_writer_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = FlushingWriter::new(file);
        writer.write_all(b"line one\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line one\n");
    }

    #[test]
    fn test_open_log_file_rotates_previous_log() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chat.log"), "previous run").unwrap();

        let (path, _file) = open_log_file(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("chat.log"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("chat.log.1")).unwrap(),
            "previous run"
        );
    }

    #[test]
    fn test_open_log_file_fails_on_unusable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let err = open_log_file(&blocker.join("papers-chat")).unwrap_err();
        assert!(err.to_string().contains("failed to create"));
    }

    async fn dispatcher_with(sessions: Vec<FakeSession>) -> Dispatcher {
        let boxed = sessions
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn ProviderSession>)
            .collect();
        let (mcp, _) = McpClient::from_sessions(boxed, NamespaceMode::Partitioned).await;
        let engine = ConversationEngine::new(Box::new(ScriptedModel::new(Vec::new())), None);
        Dispatcher::new(mcp, engine, "papers")
    }

    fn read_then_fail(dispatcher: &mut Dispatcher) -> FrontEnd<'_> {
        Box::pin(async move {
            dispatcher.handle("@folders").await?;
            anyhow::bail!("terminal went away")
        })
    }

    fn quit_immediately(dispatcher: &mut Dispatcher) -> FrontEnd<'_> {
        Box::pin(async move {
            dispatcher.handle("quit").await?;
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_serve_releases_sessions_when_front_end_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = dispatcher_with(vec![
            FakeSession::new("a").with_shutdown_log(log.clone()),
            FakeSession::new("b")
                .with_resource("papers://folders", "- physics")
                .with_shutdown_log(log.clone()),
        ])
        .await;

        let err = serve(dispatcher, read_then_fail).await.unwrap_err();
        assert_eq!(err.to_string(), "terminal went away");
        assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_serve_releases_sessions_on_quit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher =
            dispatcher_with(vec![FakeSession::new("a").with_shutdown_log(log.clone())]).await;

        serve(dispatcher, quit_immediately).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_data_dir_is_app_specific() {
        let dir = data_dir();
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name == "papers-chat" || name == ".papers-chat");
    }
}
