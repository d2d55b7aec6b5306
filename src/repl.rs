use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};

use crate::commands::{format_turn, Dispatcher, Reply};

const BANNER: &str = "Type your queries or 'quit' to exit. /help lists commands.";

const PROMPT: &str = "Query: ";

/// Run the interactive loop until `quit`, end-of-input, or Ctrl-C.
///
/// Errors from a single line are printed and the loop continues.
pub async fn run(dispatcher: &mut Dispatcher) -> Result<()> {
    println!("{BANNER}");

    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let history_path = crate::data_dir().join("repl_history.txt");
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                // Ctrl-C while a query is running ends the session like it
                // does at the prompt.
                let handled = tokio::select! {
                    reply = dispatcher.handle(&line) => Some(reply),
                    _ = tokio::signal::ctrl_c() => None,
                };
                let Some(reply) = handled else {
                    println!("^C");
                    tracing::info!("query interrupted");
                    break;
                };
                match reply {
                    Ok(Reply::Quit) => break,
                    Ok(Reply::Nothing) => {}
                    Ok(Reply::Text(text)) => println!("\n{text}\n"),
                    Ok(Reply::Turn(outcome)) => {
                        println!("\nResponse: {}\n", format_turn(&outcome));
                    }
                    Ok(Reply::Invalid(message)) => println!("\nError: {message}\n"),
                    Err(e) => {
                        tracing::warn!(error = %e, "query failed");
                        println!("\nError: {e}");
                        if let Some(hint) = e.hint() {
                            println!("Hint: {hint}");
                        }
                        println!();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_path);
    println!("Goodbye!");

    Ok(())
}
