//! fluxgrid CLI
//!
//! Command-line front end:
//! - Run a query and print, filter, sort or export the result
//! - Test a connection
//! - Explore results interactively
//! - Generate a config file

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use fluxgrid::config::{generate_default_config, Config, TOKEN_ENV};
use fluxgrid::export;
use fluxgrid::render::render_grid;
use fluxgrid::{
    ClientSettings, ColumnPredicate, ConnectionParams, FilterKind, QueryClient, QueryOutcome,
    QuerySession, ResultGrid, Scheme, SortDirection,
};

/// Rows printed by the shell after each change
const SHELL_ROW_LIMIT: usize = 50;

#[derive(Parser)]
#[command(name = "fluxgrid")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run ad-hoc InfluxDB queries and explore the results as a table")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./fluxgrid.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// URL scheme (http or https)
    #[arg(long, global = true)]
    pub scheme: Option<Scheme>,

    /// Host with optional port, e.g. localhost:8086
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Database name
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// API token (default: $FLUXGRID_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Skip certificate and hostname validation for https
    #[arg(long, global = true)]
    pub insecure: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a query and print the result
    Query {
        /// Query text, passed through unchanged
        query: String,
        /// Keep rows where any cell contains this text
        #[arg(short, long)]
        filter: Option<String>,
        /// Column filter COLUMN:KIND:VALUE (contains, starts-with, ends-with, equals, not-equals)
        #[arg(short = 'w', long = "where")]
        column_filters: Vec<String>,
        /// Sort by COLUMN[:asc|desc]
        #[arg(short, long)]
        sort: Option<String>,
        /// Output format (table, csv, raw)
        #[arg(long, default_value = "table")]
        format: String,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Maximum rows to print in table format
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Check the connection with SHOW MEASUREMENTS
    Test {
        /// Remember the connection details (never the token) on success
        #[arg(long)]
        save: bool,
    },

    /// Interactive query shell
    Shell,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    fluxgrid::logging::init(&config.logging).context("Failed to initialize logging")?;

    tracing::debug!("fluxgrid v{}", env!("CARGO_PKG_VERSION"));

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &content)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let connection = resolve_connection(&cli, &config)?;
    let client = QueryClient::new(ClientSettings::from(&config.client));
    let mut session = QuerySession::new(Arc::new(client), connection);

    match cli.command {
        Commands::Query {
            query,
            filter,
            column_filters,
            sort,
            format,
            output,
            limit,
        } => {
            let outcome = session.execute(query).await;

            if format == "raw" {
                let raw = session.raw_text().unwrap_or_default().to_string();
                emit(&raw, output.as_deref())?;
                if let QueryOutcome::Failed(_) = outcome {
                    std::process::exit(1);
                }
                return Ok(());
            }

            let grid = match (outcome, session.grid_mut()) {
                (QueryOutcome::Table(_), Some(grid)) => grid,
                (QueryOutcome::Failed(e), _) => {
                    eprintln!("Query failed: {}", e);
                    std::process::exit(1);
                }
                _ => {
                    println!("Query executed successfully but returned no data.");
                    return Ok(());
                }
            };

            if let Some(text) = filter {
                grid.set_global_filter(text);
            }
            for spec in &column_filters {
                let (column, predicate) = parse_column_filter(grid, spec)?;
                grid.set_column_filter(column, predicate);
            }
            if let Some(spec) = sort {
                let (column, direction) = parse_sort(grid, &spec)?;
                grid.sort_by(column, direction.is_ascending());
            }

            match format.as_str() {
                "csv" => match output {
                    Some(path) => {
                        let csv = export::export_grid(grid)?;
                        export::write_file(&path, &csv)?;
                        println!("Exported {} to {:?}", grid.record_count(), path);
                    }
                    None => print!("{}", export::export(grid.columns(), grid.visible_rows())),
                },
                "table" => emit(&render_grid(grid, limit), output.as_deref())?,
                other => bail!("Unknown format: {} (use table, csv or raw)", other),
            }
        }

        Commands::Test { save } => {
            let connection = session.connection().clone();
            println!(
                "Testing {} with database {}...",
                connection.endpoint(),
                connection.database
            );

            match session.test_connection().await {
                Ok(()) => {
                    println!("Connection successful");
                    if save {
                        save_connection(&cli.config, config, &connection)?;
                    }
                }
                Err(e) => {
                    eprintln!("Connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Shell => {
            let export_dir = PathBuf::from(&config.export.directory);
            run_shell(&mut session, &export_dir).await?;
        }

        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Merge config, environment and flags into connection parameters
fn resolve_connection(cli: &Cli, config: &Config) -> anyhow::Result<ConnectionParams> {
    let mut connection = config.connection.clone();
    if let Some(scheme) = cli.scheme {
        connection.scheme = scheme;
    }
    if let Some(host) = &cli.host {
        connection.host = host.trim().to_string();
    }
    if let Some(database) = &cli.database {
        connection.database = database.trim().to_string();
    }
    if cli.insecure {
        connection.insecure_skip_verify = true;
    }

    if !connection.is_complete() {
        bail!("Host and database are required (use --host/--database or a config file)");
    }

    let token = cli
        .token
        .clone()
        .or_else(Config::token_from_env)
        .ok_or_else(|| anyhow!("API token required: set {} or pass --token", TOKEN_ENV))?;

    Ok(connection.with_token(token.trim()))
}

fn save_connection(
    path: &Option<PathBuf>,
    mut config: Config,
    connection: &ConnectionParams,
) -> anyhow::Result<()> {
    let path = path
        .clone()
        .or_else(Config::default_path)
        .ok_or_else(|| anyhow!("No config directory available"))?;

    config.connection.scheme = connection.scheme;
    config.connection.host = connection.host.clone();
    config.connection.database = connection.database.clone();
    config.connection.insecure_skip_verify = connection.insecure_skip_verify;
    config.save(&path)?;

    println!("Connection details saved to {:?} (token not stored)", path);
    Ok(())
}

fn emit(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("Written to {:?}", path);
        }
        None => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

/// Column index or name
fn resolve_column(grid: &ResultGrid, reference: &str) -> anyhow::Result<usize> {
    let reference = reference.trim();
    let index = match reference.parse::<usize>() {
        Ok(index) => index,
        Err(_) => grid
            .dataset()
            .column_index(reference)
            .ok_or_else(|| anyhow!("Unknown column: {}", reference))?,
    };

    if index >= grid.columns().len() {
        bail!(
            "Column {} out of range (result has {} columns)",
            index,
            grid.columns().len()
        );
    }
    Ok(index)
}

/// `COLUMN:KIND:VALUE`
fn parse_column_filter(
    grid: &ResultGrid,
    spec: &str,
) -> anyhow::Result<(usize, ColumnPredicate)> {
    let (column, predicate) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid filter '{}', expected COLUMN:KIND:VALUE", spec))?;
    let predicate: ColumnPredicate = predicate.parse().map_err(|e: String| anyhow!(e))?;
    Ok((resolve_column(grid, column)?, predicate))
}

/// `COLUMN[:asc|desc]`
fn parse_sort(grid: &ResultGrid, spec: &str) -> anyhow::Result<(usize, SortDirection)> {
    let (column, direction) = spec.split_once(':').unwrap_or((spec, "asc"));
    let direction: SortDirection = direction.parse().map_err(|e: String| anyhow!(e))?;
    Ok((resolve_column(grid, column)?, direction))
}

const SHELL_HELP: &str = "\
Type a query and press enter to run it. Commands:
  :filter TEXT              keep rows where any cell contains TEXT (no TEXT clears)
  :where COL KIND VALUE     column filter (contains, starts-with, ends-with, equals, not-equals)
  :unwhere COL              remove a column filter
  :sort COL [asc|desc]      sort by a column
  :unsort                   remove the sort
  :clear                    remove all filters and the sort
  :show [N]                 print up to N rows (default 50)
  :count                    print record counts
  :raw                      print the raw response of the last query
  :export [PATH]            write the visible rows as CSV
  :reset                    discard the current result
  :help                     this help
  :quit                     exit";

async fn run_shell(
    session: &mut QuerySession<QueryClient>,
    export_dir: &Path,
) -> anyhow::Result<()> {
    let connection = session.connection();
    println!(
        "Connected to {} (database: {}){}",
        connection.endpoint(),
        connection.database,
        if connection.skips_verification() {
            " - certificate validation disabled"
        } else {
            ""
        }
    );
    println!("Type :help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                match handle_shell_line(session, line.trim(), export_dir).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Some(completion) = session.next_completion() => {
                let outcome = session.apply(completion);
                match &outcome {
                    QueryOutcome::Table(_) => {
                        if let Some(grid) = session.grid() {
                            print!("{}", render_grid(grid, Some(SHELL_ROW_LIMIT)));
                        }
                    }
                    QueryOutcome::NoData => println!("{}", outcome),
                    QueryOutcome::Failed(_) => eprintln!("{}", outcome),
                }
            }
        }
    }

    Ok(())
}

/// Returns `false` when the shell should exit
async fn handle_shell_line(
    session: &mut QuerySession<QueryClient>,
    line: &str,
    export_dir: &Path,
) -> anyhow::Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }

    let command = match line.strip_prefix(':') {
        Some(command) => command,
        None => {
            if session.in_flight() > 0 {
                println!(
                    "Note: {} query still running; the last to finish is shown",
                    session.in_flight()
                );
            }
            session.submit(line);
            println!("Executing query...");
            return Ok(true);
        }
    };

    let (name, args) = command.split_once(' ').unwrap_or((command, ""));
    let args = args.trim();

    match name {
        "q" | "quit" | "exit" => return Ok(false),
        "help" | "h" => println!("{}", SHELL_HELP),
        "raw" => println!("{}", session.raw_text().unwrap_or("No query has run yet.")),
        "reset" => {
            session.clear();
            println!("Results cleared");
        }
        _ => {
            let grid = session
                .grid_mut()
                .ok_or_else(|| anyhow!("No results. Run a query first."))?;
            handle_grid_command(grid, name, args, export_dir).await?;
        }
    }

    Ok(true)
}

async fn handle_grid_command(
    grid: &mut ResultGrid,
    name: &str,
    args: &str,
    export_dir: &Path,
) -> anyhow::Result<()> {
    match name {
        "filter" => grid.set_global_filter(args),
        "where" => {
            let mut parts = args.splitn(3, ' ');
            let column = parts.next().unwrap_or_default();
            let kind = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            let kind: FilterKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            let column = resolve_column(grid, column)?;
            grid.set_column_filter(column, ColumnPredicate::new(kind, value));
        }
        "unwhere" => {
            let column = resolve_column(grid, args)?;
            grid.clear_column_filter(column);
        }
        "sort" => {
            let (column, direction) = args.split_once(' ').unwrap_or((args, "asc"));
            let direction: SortDirection = direction.parse().map_err(|e: String| anyhow!(e))?;
            let column = resolve_column(grid, column)?;
            grid.sort_by(column, direction.is_ascending());
        }
        "unsort" => grid.clear_sort(),
        "clear" => grid.clear_filters(),
        "show" => {
            let limit = if args.is_empty() {
                SHELL_ROW_LIMIT
            } else {
                args.parse().context("Row limit must be a number")?
            };
            print!("{}", render_grid(grid, Some(limit)));
            return Ok(());
        }
        "count" => {
            println!("{}", grid.record_count().status_label());
            return Ok(());
        }
        "export" => {
            let snapshot = grid.snapshot();
            let path = if args.is_empty() {
                export_dir.join(export::default_filename(snapshot.rows.len()))
            } else {
                PathBuf::from(args)
            };
            let count = snapshot.rows.len();
            let total = snapshot.total;

            let target = path.clone();
            tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                let csv = export::export_snapshot(&snapshot)?;
                export::write_file(&target, &csv)?;
                Ok(())
            })
            .await??;

            if count != total {
                println!("Exported {} of {} records to {:?}", count, total, path);
            } else {
                println!("Exported {} records to {:?}", count, path);
            }
            return Ok(());
        }
        other => bail!("Unknown command :{} (try :help)", other),
    }

    print!("{}", render_grid(grid, Some(SHELL_ROW_LIMIT)));
    Ok(())
}
