//! Command-line front end for the story wall.
//!
//! # Responsibility
//! - Drive the `/notes` handlers against a local note store.
//! - Print response bodies as JSON on stdout.
//!
//! # Invariants
//! - Exit status is non-zero on configuration errors and non-2xx responses.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use storywall_api::{ApiResponse, StoryWallApp};
use storywall_core::config::ENV_DATABASE_URL;
use storywall_core::{init_logging, init_stderr_logging, RandomTilt, StoryWallConfig};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "storywall")]
#[command(about = "Sticky notes pinned to the walls of a shared room")]
#[command(version)]
struct Cli {
    /// Note database file (overrides STORYWALL_DATABASE_URL)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every note on the wall
    List,
    /// Post a note on behalf of an origin
    Post {
        /// Origin token, as a proxy would forward it
        #[arg(long, default_value = "unknown")]
        origin: String,
        /// Note text
        #[arg(long)]
        content: String,
        /// Wall label: front, back, left, right or floor
        #[arg(long)]
        wall: Option<String>,
        /// Palette token or hex color; random sticky-note color when omitted
        #[arg(long)]
        color: Option<String>,
        /// Client-chosen note id
        #[arg(long)]
        id: Option<String>,
    },
    /// Show where every note is placed
    Layout {
        /// Seed for reproducible tilt
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.database.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("storywall: {err}");
            return ExitCode::from(2);
        }
    };

    let logging = match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy()),
        None => init_stderr_logging(&config.log_level),
    };
    if let Err(err) = logging {
        eprintln!("storywall: logging disabled: {err}");
    }

    let app = StoryWallApp::new(config);
    let response = run(&app, cli.command);
    print_response(&response)
}

fn load_config(
    database: Option<&std::path::Path>,
) -> Result<StoryWallConfig, storywall_core::ConfigError> {
    match database {
        Some(path) => {
            let path = path.to_string_lossy().into_owned();
            StoryWallConfig::from_lookup(|key| {
                if key == ENV_DATABASE_URL {
                    Some(path.clone())
                } else {
                    std::env::var(key).ok()
                }
            })
        }
        None => StoryWallConfig::from_env(),
    }
}

fn run(app: &StoryWallApp, command: Command) -> ApiResponse {
    match command {
        Command::List => app.get_notes(),
        Command::Post {
            origin,
            content,
            wall,
            color,
            id,
        } => {
            let body = serde_json::json!({
                "id": id,
                "content": content,
                "wall": wall,
                "color": color.unwrap_or_default(),
            });
            app.post_notes(&body.to_string(), Some(&origin))
        }
        Command::Layout { seed: Some(seed) } => {
            app.get_layout_with(&mut RandomTilt::seeded(seed))
        }
        Command::Layout { seed: None } => app.get_layout(),
    }
}

fn print_response(response: &ApiResponse) -> ExitCode {
    let rendered = serde_json::to_string_pretty(&response.body)
        .unwrap_or_else(|_| response.body.to_string());
    if response.is_success() {
        println!("{rendered}");
        ExitCode::SUCCESS
    } else {
        log::debug!(
            "event=cli_exit module=cli status=error http_status={}",
            response.status
        );
        eprintln!("{rendered}");
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn post_defaults_origin_and_color() {
        let cli = Cli::try_parse_from(["storywall", "post", "--content", "hi"]).unwrap();
        match cli.command {
            Command::Post {
                origin,
                color,
                wall,
                id,
                ..
            } => {
                assert_eq!(origin, "unknown");
                assert!(color.is_none());
                assert!(wall.is_none());
                assert!(id.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn database_flag_is_global() {
        let cli =
            Cli::try_parse_from(["storywall", "layout", "--seed", "7", "--database", "/tmp/w.db"])
                .unwrap();
        assert_eq!(cli.database.as_deref(), Some(std::path::Path::new("/tmp/w.db")));
        assert!(matches!(cli.command, Command::Layout { seed: Some(7) }));
    }

    #[test]
    fn post_requires_content() {
        assert!(Cli::try_parse_from(["storywall", "post"]).is_err());
    }
}
