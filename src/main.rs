//! gridcalc - evaluate a grid of cells with `[Column]Row` formulas

mod config;
mod error;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, bail};
use gridcalc_core::Grid;
use gridcalc_engine::engine::{FUNCTIONS, format_error, format_value};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage: gridcalc [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --rows <N>                Number of rows (default: 10)");
    eprintln!("  --cols <N>                Number of columns (default: 10)");
    eprintln!("  --set <[Col]Row>=<TEXT>   Set a cell's content (can be repeated)");
    eprintln!("  --rename <COL>=<NAME>     Rename a column (can be repeated)");
    eprintln!("  --decimals <N>            Decimal places for numbers (default: 2)");
    eprintln!("  --seed <N>                Seed for rand() and randint()");
    eprintln!("  -c, --command <FORMULA>   Print the value of one formula and exit");
    eprintln!("  --config <FILE>           Load settings from FILE");
    eprintln!("  --no-config               Ignore the user config file");
    eprintln!("  --functions               List the formula functions and exit");
    eprintln!("  -h, --help                Print help");
}

/// Edits applied to the grid in command-line order.
enum Edit {
    Set { target: String, content: String },
    Rename { column: String, name: String },
}

#[derive(Default)]
struct Args {
    rows: Option<usize>,
    cols: Option<usize>,
    decimals: Option<usize>,
    seed: Option<u64>,
    command: Option<String>,
    config_file: Option<PathBuf>,
    no_config: bool,
    list_functions: bool,
    edits: Vec<Edit>,
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<Args>> {
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || next_value(args, &mut i, flag);
        match flag {
            "-h" | "--help" => return Ok(None),
            "--rows" => parsed.rows = Some(parse_count(flag, value()?)?),
            "--cols" => parsed.cols = Some(parse_count(flag, value()?)?),
            "--decimals" => parsed.decimals = Some(parse_count(flag, value()?)?),
            "--seed" => {
                let raw = value()?;
                parsed.seed = Some(
                    raw.parse()
                        .with_context(|| format!("--seed expects an integer, got '{}'", raw))?,
                );
            }
            "-c" | "--command" => parsed.command = Some(value()?.to_string()),
            "--config" => parsed.config_file = Some(PathBuf::from(value()?)),
            "--no-config" => parsed.no_config = true,
            "--functions" => parsed.list_functions = true,
            "--set" => {
                let raw = value()?;
                let Some((target, content)) = raw.split_once('=') else {
                    bail!("--set expects <[Col]Row>=<content>, got '{}'", raw);
                };
                parsed.edits.push(Edit::Set {
                    target: target.to_string(),
                    content: content.to_string(),
                });
            }
            "--rename" => {
                let raw = value()?;
                let Some((column, name)) = raw.split_once('=') else {
                    bail!("--rename expects <column>=<name>, got '{}'", raw);
                };
                parsed.edits.push(Edit::Rename {
                    column: column.to_string(),
                    name: name.to_string(),
                });
            }
            arg => bail!("Unknown option: {}", arg),
        }
        i += 1;
    }

    Ok(Some(parsed))
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", flag))
}

fn parse_count(flag: &str, raw: &str) -> anyhow::Result<usize> {
    raw.parse()
        .with_context(|| format!("{} expects a non-negative integer, got '{}'", flag, raw))
}

fn build_grid(args: &Args) -> anyhow::Result<Grid> {
    let mut settings = if args.no_config {
        config::Settings::default()
    } else {
        config::load_settings(args.config_file.as_deref())?
    };

    if let Some(rows) = args.rows {
        settings.rows = rows;
    }
    if let Some(cols) = args.cols {
        settings.columns = cols;
    }
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }
    settings.validate()?;

    let mut grid = Grid::with_options(settings.grid_options());
    if let Some(decimals) = args.decimals {
        grid.set_decimal_places(decimals);
    }

    for edit in &args.edits {
        match edit {
            Edit::Set { target, content } => {
                let cell = grid.resolve_reference(target)?;
                grid.set_cell_content(cell.row, cell.col, content)?;
            }
            Edit::Rename { column, name } => {
                let col = grid
                    .resolve_column(column)
                    .with_context(|| format!("unknown column '{}'", column))?;
                grid.rename_column(col, name)?;
            }
        }
    }
    Ok(grid)
}

/// Tab-separated display values, headed by the column names.
fn render_grid(grid: &Grid) -> anyhow::Result<String> {
    let mut out = String::new();
    out.push_str(&grid.column_names().iter().collect::<Vec<_>>().join("\t"));
    out.push('\n');
    for row in 0..grid.row_count() {
        let cells = (0..grid.column_count())
            .map(|col| grid.display_value(row, col))
            .collect::<Result<Vec<_>, _>>()?;
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    Ok(out)
}

fn render_functions() -> String {
    let width = FUNCTIONS.iter().map(|info| info.name.len()).max().unwrap_or(0);
    FUNCTIONS
        .iter()
        .map(|info| format!("{:width$}  {}\n", info.name, info.description))
        .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if args.list_functions {
        print!("{}", render_functions());
        return Ok(());
    }

    let grid = build_grid(&args)?;

    if let Some(command) = args.command {
        let formula = if command.starts_with('=') {
            command
        } else {
            format!("={}", command)
        };
        match grid.evaluate_formula(&formula) {
            Ok(value) => println!("{}", format_value(&value, grid.decimal_places())),
            Err(e) => {
                println!("{}", format_error(&e));
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    print!("{}", render_grid(&grid)?);
    Ok(())
}
