//! Cofounder - an AI cofounder agent team
//!
//! Main entry point for the CLI application.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use cofounder::core::config::ProviderType;
use cofounder::server::run_server;
use cofounder::{render_outcome, Cofounder, Config, Repl};

/// Cofounder - brainstorm, validate and research startup ideas
#[derive(Parser, Debug)]
#[command(name = "cofounder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model provider (gemini or ollama)
    #[arg(long, global = true)]
    provider: Option<ProviderType>,

    /// Model name
    #[arg(long, short = 'm', global = true)]
    model: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listening port
        #[arg(long, short = 'p')]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,

        /// Do not serve the web UI
        #[arg(long)]
        no_web: bool,

        /// Open the web UI in a browser
        #[arg(long)]
        open: bool,
    },

    /// Interactive chat in the terminal
    Chat {
        /// Resume or name a session
        #[arg(long, short = 's')]
        session: Option<String>,
    },

    /// Send a single message and print the answer
    Ask {
        /// The message
        prompt: String,

        /// Session to use
        #[arg(long, short = 's')]
        session: Option<String>,

        /// Print the full turn outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file if none exists
    Init,
}

fn init_logging(debug: bool, default_level: &str) {
    let level = if debug { "debug" } else { default_level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(provider) = args.provider {
        config.llm.provider = provider;
    }

    if let Some(ref model) = args.model {
        config.llm.model = model.clone();
    }

    if args.debug {
        config.agent.debug = true;
    }

    let command = args.command.unwrap_or(Command::Serve {
        port: None,
        bind: None,
        no_web: false,
        open: false,
    });

    let default_level = match command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    init_logging(config.agent.debug, default_level);

    match command {
        Command::Serve {
            port,
            bind,
            no_web,
            open,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if no_web {
                config.server.web_ui = false;
            }

            let cofounder = Arc::new(Cofounder::from_config(&config)?);
            if open && config.server.web_ui {
                let url = format!("http://localhost:{}/", config.server.port);
                if let Err(e) = webbrowser::open(&url) {
                    log::warn!("Could not open browser: {}", e);
                }
            }
            run_server(config, cofounder).await?;
        }

        Command::Chat { session } => {
            let cofounder = Arc::new(Cofounder::from_config(&config)?);
            let mut repl = Repl::new(cofounder, session).await?;
            repl.run().await?;
        }

        Command::Ask {
            prompt,
            session,
            json,
        } => {
            let cofounder = Cofounder::from_config(&config)?;
            let session_id = match session {
                Some(id) => id,
                None => cofounder.sessions().create().await.id().to_string(),
            };
            let outcome = cofounder.handle_turn(&session_id, &prompt).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", render_outcome(&outcome));
            }
        }

        Command::Config { action } => match action {
            ConfigAction::Show => println!("{}", toml::to_string_pretty(&config)?),
            ConfigAction::Path => println!("{}", Config::config_file().display()),
            ConfigAction::Init => {
                let path = Config::config_file();
                if path.exists() {
                    println!("Config already exists at {}", path.display());
                } else {
                    Config::init_file(&path)?;
                    println!("Wrote default config to {}", path.display());
                }
            }
        },
    }

    Ok(())
}
