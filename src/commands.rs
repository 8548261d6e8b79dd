//! Command line commands

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Cache the static manifest under the configured generation, then
  /// activate it unless skip_waiting is off
  #[command(alias = "i")]
  Install,

  /// Activate the waiting generation: purge stale caches and take control
  Activate,

  /// Send requests through the offline cache
  #[command(alias = "f")]
  Fetch {
    /// Paths (joined onto the origin) or absolute URLs
    #[arg(required = true)]
    targets: Vec<String>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Write the body to a file instead of stdout (single target only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print status, source and headers before the body
    #[arg(short, long)]
    include: bool,
  },

  /// List cache namespaces
  Caches,

  /// Show the worker registration
  Status,

  /// Manage the product catalog
  #[command(subcommand)]
  Catalog(CatalogCommand),

  /// Show the theme, or toggle it
  Theme {
    #[arg(long)]
    toggle: bool,
  },
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
  /// Add a product
  Add {
    #[arg(long)]
    name: String,
    #[arg(long)]
    price: f64,
    #[arg(long, default_value = "")]
    category: String,
  },

  /// Delete a product by id
  #[command(alias = "rm")]
  Delete { id: i64 },

  /// List products, optionally only one category
  #[command(alias = "ls")]
  List {
    #[arg(long)]
    category: Option<String>,
  },

  /// Search product names and categories
  Search { term: String },

  /// Export the catalog as JSON
  Export {
    /// Output file (default: mesproduits-export-<date>.json, "-" for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Replace the catalog with a JSON export
  Import { file: PathBuf },
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct Cli {
    #[command(subcommand)]
    command: Command,
  }

  fn parse(args: &[&str]) -> Command {
    Cli::try_parse_from(std::iter::once("catalog-shell").chain(args.iter().copied()))
      .unwrap()
      .command
  }

  #[test]
  fn test_fetch_multiple_targets() {
    match parse(&["fetch", "/", "/api/data", "-X", "post"]) {
      Command::Fetch {
        targets, method, ..
      } => {
        assert_eq!(targets, vec!["/", "/api/data"]);
        assert_eq!(method, "post");
      }
      other => panic!("unexpected command: {:?}", other),
    }
  }

  #[test]
  fn test_fetch_requires_target() {
    assert!(Cli::try_parse_from(["catalog-shell", "fetch"]).is_err());
  }

  #[test]
  fn test_aliases() {
    assert!(matches!(parse(&["i"]), Command::Install));
    assert!(matches!(
      parse(&["catalog", "rm", "42"]),
      Command::Catalog(CatalogCommand::Delete { id: 42 })
    ));
    assert!(matches!(
      parse(&["catalog", "ls", "--category", "Mobilier"]),
      Command::Catalog(CatalogCommand::List { category: Some(_) })
    ));
  }

  #[test]
  fn test_add_defaults_to_no_category() {
    match parse(&["catalog", "add", "--name", "Lampe", "--price", "25.5"]) {
      Command::Catalog(CatalogCommand::Add {
        name,
        price,
        category,
      }) => {
        assert_eq!(name, "Lampe");
        assert_eq!(price, 25.5);
        assert!(category.is_empty());
      }
      other => panic!("unexpected command: {:?}", other),
    }
  }
}
