//! Interactive REPL
//!
//! Provides the terminal chat loop over one session at a time.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::agent::Cofounder;
use crate::cli::commands::{handle_command, render_outcome, CommandResult};
use crate::core::Result;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    cofounder: Arc<Cofounder>,
    session_id: String,
}

impl Repl {
    /// Attach to `session_id`, or a fresh session
    pub async fn new(cofounder: Arc<Cofounder>, session_id: Option<String>) -> Result<Self> {
        let session_id = match session_id {
            Some(id) => cofounder.sessions().get_or_create(&id).await?.id().to_string(),
            None => cofounder.sessions().create().await.id().to_string(),
        };
        Ok(Self {
            cofounder,
            session_id,
        })
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &self.cofounder, &self.session_id).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::NewSession) => {
                    self.session_id = self.cofounder.sessions().create().await.id().to_string();
                    println!("Started session {}\n", self.session_id);
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                }
                Ok(CommandResult::Continue(turn)) => {
                    match self.cofounder.handle_turn(&self.session_id, &turn).await {
                        Ok(outcome) => println!("\n{}", render_outcome(&outcome)),
                        Err(e) => eprintln!("\nError: {}\n", e),
                    }
                }
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!("\nAI Cofounder - brainstorm, validate and research startup ideas");
        println!("Model:   {}", self.cofounder.model());
        println!(
            "History: {}",
            self.cofounder.history_backend().unwrap_or("not configured")
        );
        println!("Session: {}", self.session_id);
        println!();
        println!("Commands: help, new, agents, status, history, exit");
        println!("─────────────────────────────────────────────");
    }
}
