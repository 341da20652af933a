mod output;
mod theme;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{
    CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, Style},
    },
};
use colored::{Color as ThemeColor, control::ShouldColorize};

use output::{CompileReport, GlobalOptions, OutputFormat, OutputManager};
use rowmap::{Compile, Expr, PlaceholderFormat, RowmapConfig};
use theme::{ICONS, THEME};

#[derive(Parser)]
#[command(name = "rowmap")]
#[command(version)]
#[command(
    about = "Preview compiled rowmap conditions",
    long_about = r#"Developer tool for rowmap that provides:

• Compilation of JSON-encoded condition trees into SQL fragments
• Placeholder rewriting (? or $n)
• Inspection of the effective configuration

Commands:
  compile   Compile a condition tree
  config    Print the effective configuration
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "ROWMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON-encoded condition into SQL and arguments
    Compile(CompileArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args)]
struct CompileArgs {
    /// File holding the condition; reads stdin when omitted or `-`
    file: Option<PathBuf>,

    /// Placeholder style, overriding the configuration
    #[arg(long, value_enum)]
    placeholder: Option<PlaceholderArg>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlaceholderArg {
    Question,
    Dollar,
}

impl From<PlaceholderArg> for PlaceholderFormat {
    fn from(arg: PlaceholderArg) -> Self {
        match arg {
            PlaceholderArg::Question => PlaceholderFormat::Question,
            PlaceholderArg::Dollar => PlaceholderFormat::Dollar,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = parse_with_styles();
    let no_color = cli.no_color || !ShouldColorize::from_env().should_colorize();
    if no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = execute(cli, no_color) {
        let output = OutputManager::new(GlobalOptions {
            no_color,
            ..GlobalOptions::default()
        });
        output.error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn parse_with_styles() -> Cli {
    let matches = Cli::command().styles(help_styles()).get_matches();
    match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    }
}

fn execute(cli: Cli, no_color: bool) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile(args) => {
            let output = OutputManager::new(GlobalOptions {
                output_format: args.format,
                no_color,
            });
            handle_compile(args, &config, &output)
        }
        Commands::Config => {
            let output = OutputManager::new(GlobalOptions {
                no_color,
                ..GlobalOptions::default()
            });
            let rendered = config.to_toml_string().context("Failed to render configuration")?;
            output.plain(rendered.trim_end());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RowmapConfig> {
    match path {
        Some(path) => {
            log::debug!("loading configuration from {}", path.display());
            RowmapConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => Ok(RowmapConfig::default()),
    }
}

fn handle_compile(args: CompileArgs, config: &RowmapConfig, output: &OutputManager) -> Result<()> {
    let raw = match args.file.as_deref() {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read condition from stdin")?;
            buffer
        }
    };

    let expr: Expr = serde_json::from_str(&raw).context("Failed to parse condition JSON")?;
    let fragment = expr.compile().context("Failed to compile condition")?;

    let placeholder = args
        .placeholder
        .map(PlaceholderFormat::from)
        .unwrap_or(config.statement.placeholder);
    let report = CompileReport {
        sql: fragment.to_sql_with(placeholder),
        args: fragment.args,
    };

    if output.options.output_format == OutputFormat::Table {
        output.heading("SQL");
        output.plain(&format!("  {} {}", ICONS.arrow, report.sql));
        output.heading("Arguments");
    }
    output.display(&report)?;
    if output.options.output_format == OutputFormat::Table {
        output.success(&format!("compiled with {} argument(s)", report.args.len()));
    }
    Ok(())
}

fn help_styles() -> Styles {
    Styles::styled()
        .usage(style_from_color(THEME.primary).bold())
        .header(style_from_color(THEME.highlight).bold())
        .literal(style_from_color(THEME.secondary))
        .placeholder(style_from_color(THEME.muted))
        .valid(style_from_color(THEME.key))
        .invalid(style_from_color(THEME.value))
        .error(style_from_color(THEME.error).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        _ => ClapColor::Ansi(AnsiColor::White),
    }
}
