use anyhow::{Context, Result};
use std::path::PathBuf;

use gallery::{logging, Config};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Serve { config: Option<PathBuf> },
    PrintConfig { config: Option<PathBuf> },
    Version,
    Help,
}

/// Parse arguments after the program name. Errors carry the message to print.
fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut print_config = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--print-config" => print_config = true,
            "--config" | "-c" => {
                let path = args
                    .next()
                    .filter(|p| !p.is_empty() && !p.starts_with('-'))
                    .ok_or("--config requires a path argument")?;
                config = Some(PathBuf::from(path));
            }
            other => match other.strip_prefix("--config=") {
                Some("") => return Err("--config requires a path argument".to_string()),
                Some(path) => config = Some(PathBuf::from(path)),
                None => return Err(format!("Unknown argument: {other}")),
            },
        }
    }

    Ok(if print_config {
        Command::PrintConfig { config }
    } else {
        Command::Serve { config }
    })
}

fn print_help() {
    println!(
        r#"gallery - photo gallery web server

USAGE:
    gallery [OPTIONS]

OPTIONS:
    --config, -c PATH   Config file to use (must exist)
    --print-config      Print the effective configuration as TOML and exit
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    GALLERY_CONFIG      Path to config file (overrides default location)
    GALLERY_LOG         Log filter (trace, debug, info, warn, error)
    GALLERY_DB_PATH     SQLite database file
    GALLERY_UPLOAD_DIR  Directory holding uploaded images
    GALLERY_SECRET_KEY  Key used to sign session cookies
    GALLERY_HOST        Listen address
    GALLERY_PORT        Listen port
    GALLERY_DEBUG       Verbose logging (1/true/yes/on)

Config file location: $XDG_CONFIG_HOME/gallery/config.toml"#
    );
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_explicit(&path),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("Error: {message}");
            print_help();
            std::process::exit(1);
        }
    };

    let config = match command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("gallery {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::PrintConfig { config } => {
            let mut shown = load_config(config)?;
            if !shown.uses_default_secret() {
                shown.secret_key = "<redacted>".to_string();
            }
            print!("{}", toml::to_string(&shown).context("Failed to render config")?);
            return Ok(());
        }
        Command::Serve { config } => load_config(config)?,
    };

    logging::init(config.log_dir.as_deref(), config.debug)?;

    gallery::run(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_defaults_to_serve() {
        assert_eq!(parse(&[]), Ok(Command::Serve { config: None }));
    }

    #[test]
    fn test_config_path_forms() {
        let expected = Ok(Command::Serve {
            config: Some(PathBuf::from("/etc/gallery.toml")),
        });
        assert_eq!(parse(&["--config", "/etc/gallery.toml"]), expected);
        assert_eq!(parse(&["-c", "/etc/gallery.toml"]), expected);
        assert_eq!(parse(&["--config=/etc/gallery.toml"]), expected);
    }

    #[test]
    fn test_config_path_required() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--config="]).is_err());
        assert!(parse(&["--config", "--print-config"]).is_err());
    }

    #[test]
    fn test_print_config_keeps_path() {
        assert_eq!(
            parse(&["--print-config", "-c", "g.toml"]),
            Ok(Command::PrintConfig {
                config: Some(PathBuf::from("g.toml"))
            })
        );
    }

    #[test]
    fn test_help_version_and_unknown() {
        assert_eq!(parse(&["--port", "1", "-h"]).unwrap_err(), "Unknown argument: --port");
        assert_eq!(parse(&["-V"]), Ok(Command::Version));
        assert_eq!(parse(&["--help"]), Ok(Command::Help));
    }
}
