use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "docmap",
    about = "docmap: map digital objects between a content repository and a search index",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration with `[[model]]` tables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON list of objects to create before running the command
    #[arg(short, long, global = true)]
    pub seed: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered models and their resolved datastreams
    Models,
    /// Load one object from the repository
    Materialize(MaterializeArgs),
    /// Find objects of a model by field conditions
    Find(FindArgs),
    /// Count objects of a model
    Count(CountArgs),
}

#[derive(Args)]
pub struct MaterializeArgs {
    pub model: String,
    pub pid: String,
    /// Cast to the most specific asserted model
    #[arg(long)]
    pub cast: bool,
}

#[derive(Args)]
pub struct FindArgs {
    pub model: String,
    /// `field=value` condition; repeat a field to require several values
    #[arg(short = 'w', long = "where", value_parser = parse_condition)]
    pub conditions: Vec<(String, String)>,
}

#[derive(Args)]
pub struct CountArgs {
    pub model: String,
    /// Raw query in the index clause grammar
    pub query: Option<String>,
}

fn parse_condition(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got {s:?}"))?;
    if field.is_empty() {
        return Err(format!("empty field name in {s:?}"));
    }
    Ok((field.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_models() {
        let cli = Cli::try_parse_from(["docmap", "models"]).unwrap();
        assert!(matches!(cli.command, Command::Models));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_materialize_cast() {
        let cli = Cli::try_parse_from(["docmap", "materialize", "Book", "changeme:1", "--cast"]).unwrap();
        if let Command::Materialize(args) = cli.command {
            assert_eq!(args.model, "Book");
            assert_eq!(args.pid, "changeme:1");
            assert!(args.cast);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_find_conditions() {
        let cli = Cli::try_parse_from([
            "docmap", "find", "Book", "-w", "tags=quix", "--where", "tags=quack",
        ])
        .unwrap();
        if let Command::Find(args) = cli.command {
            assert_eq!(
                args.conditions,
                [("tags".to_string(), "quix".to_string()), ("tags".to_string(), "quack".to_string())]
            );
        } else { panic!("wrong command"); }
    }

    #[test]
    fn short_config_and_where_flags_coexist() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from([
            "docmap", "-c", "docmap.toml", "find", "Book", "-w", "title=Dummies", "-s", "seed.json",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("docmap.toml")));
        assert_eq!(cli.seed.as_deref(), Some(std::path::Path::new("seed.json")));
        if let Command::Find(args) = cli.command {
            assert_eq!(args.conditions, [("title".to_string(), "Dummies".to_string())]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn condition_value_may_contain_equals() {
        assert_eq!(parse_condition("q=a=b").unwrap(), ("q".into(), "a=b".into()));
        assert!(parse_condition("novalue").is_err());
        assert!(parse_condition("=x").is_err());
    }

    #[test]
    fn parse_count_with_globals() {
        let cli = Cli::try_parse_from([
            "docmap", "count", "Book", "foo:bar", "--config", "docmap.toml", "--seed", "seed.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("docmap.toml")));
        assert_eq!(cli.seed, Some(PathBuf::from("seed.json")));
        if let Command::Count(args) = cli.command {
            assert_eq!(args.query.as_deref(), Some("foo:bar"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["docmap", "--format", "json", "models"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
