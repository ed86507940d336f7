use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgAction, ArgGroup, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::{Backend, Overrides};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "stockgrid")]
#[command(bin_name = "stockgrid")]
#[command(version)]
#[command(about = "Timber stock matrix: 13 bays x 10 levels, synced bay by bay")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'C',
        long,
        env = "STOCKGRID_ROOT",
        default_value = ".",
        global = true,
        help = "Directory that contains .stockgrid/."
    )]
    pub root: PathBuf,

    #[arg(
        long,
        env = "STOCKGRID_CONFIG",
        global = true,
        help = "Config file (default: <root>/.stockgrid/config.toml)."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "STOCKGRID_BACKEND",
        value_enum,
        global = true,
        help = "Where the matrix lives: a JSON document, SQLite tables, or a remote server."
    )]
    pub backend: Option<Backend>,

    #[arg(
        long,
        env = "STOCKGRID_API_URL",
        global = true,
        help = "Base URL of the matrix server for the http backend."
    )]
    pub api_url: Option<String>,

    #[arg(
        long,
        env = "STOCKGRID_ACTOR",
        global = true,
        help = "Name stamped into updated_by."
    )]
    pub actor: Option<String>,

    #[arg(
        long,
        env = "STOCKGRID_ACTOR_TITLE",
        global = true,
        help = "Job title shown after the actor name."
    )]
    pub actor_title: Option<String>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Increase log detail (-v info, -vv debug, -vvv trace)."
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            backend: self.backend,
            api_url: self.api_url.clone(),
            actor: self.actor.clone(),
            actor_title: self.actor_title.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Render the whole grid or one bay.")]
    Show(ShowArgs),
    #[command(about = "Show one cell.")]
    Cell(CellArgs),
    #[command(about = "Replace the contents of one cell.")]
    Save(SaveArgs),
    #[command(about = "Empty one cell.")]
    Clear(CoordinateArgs),
    #[command(about = "Restack the occupied cells of a bay bottom to top.")]
    Reorder(ReorderArgs),
    #[command(about = "Replace the whole matrix from a JSON file.")]
    Import(ImportArgs),
    #[command(about = "Piece, linear metre and cubic metre totals.")]
    Summary(JsonArgs),
    #[command(about = "List size, length, grade and treatment presets.")]
    Presets(JsonArgs),
    #[command(about = "Answer one matrix API request against the local store.")]
    Wire(WireArgs),
    #[command(about = "Print shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long, help = "Show one bay with cell identities.")]
    pub bay: Option<String>,

    #[arg(long, help = "Print JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CoordinateArgs {
    #[arg(help = "Bay code, B01..B13.")]
    pub bay: String,

    #[arg(help = "Level code, L01..L10.")]
    pub level: String,
}

#[derive(Debug, Args)]
pub struct CellArgs {
    #[command(flatten)]
    pub at: CoordinateArgs,

    #[arg(long, help = "Print JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("contents")
        .required(true)
        .args(["items", "size"])
))]
pub struct SaveArgs {
    #[command(flatten)]
    pub at: CoordinateArgs,

    #[arg(long, help = "JSON array of item objects.")]
    pub items: Option<String>,

    #[arg(long, requires_all = ["length", "pieces"], help = "Size id, <thickness>x<width>.")]
    pub size: Option<String>,

    #[arg(long, help = "Length in millimetres.")]
    pub length: Option<u32>,

    #[arg(long, help = "Piece count.")]
    pub pieces: Option<u32>,

    #[arg(long)]
    pub grade: Option<String>,

    #[arg(long)]
    pub treatment: Option<String>,

    #[arg(long, help = "Bundle identifier.")]
    pub bundle: Option<String>,

    #[arg(long)]
    pub note: Option<String>,

    #[arg(long, help = "Restack the bay so this cell ends up on top.")]
    pub move_to_top: bool,
}

#[derive(Debug, Args)]
pub struct ReorderArgs {
    #[arg(help = "Bay code, B01..B13.")]
    pub bay: String,

    #[arg(
        required = true,
        help = "Cell identities or level codes, bottom first."
    )]
    pub order: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(help = "JSON file mapping bay -> level -> cell.")]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct JsonArgs {
    #[arg(long, help = "Print JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct WireArgs {
    #[arg(help = "HTTP method, e.g. GET, PUT, PATCH.")]
    pub method: String,

    #[arg(help = "Request path, e.g. /matrix.")]
    pub path: String,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Shell to generate completions for.")]
    pub shell: Shell,
}
