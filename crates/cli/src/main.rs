use clap::{Parser, Subcommand};
use lib::context::World;
use lib::remote::{HttpRemote, RemoteService};
use lib::session::{ChatSession, SendOutcome};
use lib::settings::SettingsState;
use lib::turn::Role;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fable")]
#[command(about = "Fable CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Chat interactively, in the default context or inside a world.
    Chat {
        /// Config file path (default: FABLE_CONFIG_PATH or ~/.fable/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// World to chat in (id or name). Omit for the default context.
        #[arg(long, value_name = "WORLD")]
        world: Option<String>,
    },

    /// List the worlds known to the remote service.
    Worlds {
        /// Config file path (default: FABLE_CONFIG_PATH or ~/.fable/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Show the current user settings.
    Settings {
        /// Config file path (default: FABLE_CONFIG_PATH or ~/.fable/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("fable {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Chat { config, world }) => {
            if let Err(e) = run_chat(config, world).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Worlds { config }) => {
            if let Err(e) = run_worlds(config).await {
                log::error!("worlds failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Settings { config }) => {
            if let Err(e) = run_settings(config).await {
                log::error!("settings failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn build_remote(config_path: Option<std::path::PathBuf>) -> anyhow::Result<(Arc<HttpRemote>, lib::config::Config)> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let token = lib::config::resolve_api_token(&config);
    let remote = Arc::new(HttpRemote::new(config.remote.base_url.clone(), token));
    Ok((remote, config))
}

async fn run_worlds(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (remote, _config) = build_remote(config_path)?;
    let worlds = remote.list_worlds().await?;
    if worlds.is_empty() {
        println!("no worlds");
        return Ok(());
    }
    for w in worlds {
        let model = w.settings.model.as_deref().unwrap_or("-");
        println!("{}\t{}\t{}", w.id, w.name, model);
    }
    Ok(())
}

async fn run_settings(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (remote, _config) = build_remote(config_path)?;
    let mut settings = SettingsState::new(remote);
    let current = settings.load().await;
    println!("{}", serde_json::to_string_pretty(current)?);
    Ok(())
}

async fn resolve_world(
    remote: &Arc<HttpRemote>,
    wanted: &str,
) -> anyhow::Result<World> {
    let worlds = remote.list_worlds().await?;
    worlds
        .into_iter()
        .find(|w| w.id == wanted || w.name == wanted)
        .ok_or_else(|| anyhow::anyhow!("no world with id or name {:?}", wanted))
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    world: Option<String>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (remote, config) = build_remote(config_path)?;
    let session = ChatSession::new(remote.clone(), config.chat.options());
    let pager = session.pager();

    let world = match world {
        Some(wanted) => Some(resolve_world(&remote, &wanted).await?),
        None => None,
    };
    session
        .switch_context(world.as_ref())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    if let Err(e) = pager.load_initial().await {
        log::warn!("could not load history: {}", e);
    }

    for turn in session.turns().await {
        print_turn(&turn.role, &turn.content);
    }
    if let Some(w) = &world {
        println!("[world: {}]", w.name);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        match session.send(input).await {
            SendOutcome::Ignored => continue,
            SendOutcome::Replied | SendOutcome::Failed => {
                if let Some(turn) = session.turns().await.last() {
                    print_turn(&turn.role, &turn.content);
                }
            }
        }
    }

    Ok(())
}

fn print_turn(role: &Role, content: &str) {
    match role {
        Role::User => println!("> {}", content.trim()),
        Role::Assistant => println!("< {}", content.trim()),
    }
}
