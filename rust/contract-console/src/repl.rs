//! Line-editing loop around a [`Console`]

use anyhow::Context;
use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{console::Console, session::Session};

const HISTORY_FILE: &str = ".contract_console_history";
const PROMPT: &str = ">>> ";

/// Read and execute console commands until `exit` or end of input.
pub async fn run<S: Session>(console: &mut Console<S>) -> anyhow::Result<()> {
    let history_path = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(HISTORY_FILE);

    let mut editor = DefaultEditor::new().context("failed to initialize console editor")?;
    // no history yet on first start
    let _ = editor.load_history(&history_path);

    println!("Type 'help' for available commands");
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());

                match console.execute_line(&line).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(err) => eprintln!("Error: {err:#}"),
                }
            }
            Err(ReadlineError::Interrupted) => println!("Use 'exit' or Ctrl+D to quit"),
            Err(ReadlineError::Eof) => break,
            Err(err) => anyhow::bail!("failed to read console input: {err}"),
        }
    }

    if let Err(err) = editor.save_history(&history_path) {
        tracing::warn!(%err, path = %history_path.display(), "failed to save console history");
    }
    Ok(())
}
