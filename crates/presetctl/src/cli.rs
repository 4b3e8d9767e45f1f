use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "presetctl",
    author,
    version,
    about = "Inspect and edit stored shader presets"
)]
pub struct Cli {
    /// Store configuration file (defaults to `presetctl.toml` in the config directory).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored presets, optionally only those for one shader.
    List {
        #[arg(long, value_name = "SHADER")]
        shader: Option<String>,
    },
    /// Print a stored preset.
    Show {
        id: String,
        /// Print the preset as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Create or update a preset. Parameters given here replace stored ones
    /// with the same name; others are kept.
    Save {
        id: String,
        #[arg(long, value_name = "SHADER")]
        shader: String,
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
        /// Parameter value as `name=value`; may be repeated.
        #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
        params: Vec<(String, f64)>,
    },
    /// Delete a stored preset.
    Remove { id: String },
    /// Print the default preset for a shader from a catalog manifest.
    Default {
        shader: String,
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Parse preset text and print the record it describes.
    Decode {
        text: String,
        #[arg(long)]
        json: bool,
    },
    /// Append an integrity signature to preset text.
    Sign { text: String },
    /// Check the integrity signature of preset text.
    Verify { text: String },
    /// Assign a stored preset to a system.
    Assign { system: String, id: String },
    /// Clear the preset assigned to a system.
    Unassign { system: String },
    /// Show the preset assigned to a system.
    System { system: String },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_param(value: &str) -> Result<(String, f64), String> {
    let (name, number) = value
        .split_once('=')
        .ok_or_else(|| format!("parameter '{value}' must look like name=value"))?;
    let name = name.trim();
    if !presettext::is_valid_parameter_name(name) {
        return Err(format!("'{name}' is not a valid parameter name"));
    }
    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("parameter '{name}' has non-numeric value '{number}'"))?;
    if !number.is_finite() {
        return Err(format!("parameter '{name}' must be finite"));
    }
    Ok((name.to_string(), number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_params() {
        assert_eq!(parse_param("gamma=2.2").unwrap(), ("gamma".to_string(), 2.2));
        assert_eq!(parse_param(" mask = -0.5 ").unwrap(), ("mask".to_string(), -0.5));
    }

    #[test]
    fn rejects_bad_params() {
        assert!(parse_param("gamma").is_err());
        assert!(parse_param("1gamma=2").is_err());
        assert!(parse_param("gamma=bright").is_err());
        assert!(parse_param("gamma=inf").is_err());
    }

    #[test]
    fn parses_save_command() {
        let cli = Cli::try_parse_from([
            "presetctl", "save", "p1", "--shader", "CRT", "--param", "a=1", "--param", "b=2",
        ])
        .unwrap();
        match cli.command {
            Command::Save { id, shader, name, params } => {
                assert_eq!(id, "p1");
                assert_eq!(shader, "CRT");
                assert!(name.is_none());
                assert_eq!(params.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
