use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "aqualog",
    about = "Aquarium photo log: containers, dated images, temperature readings",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory (overrides config and AQUALOG_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

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
    /// Manage tracked containers
    Container(ContainerArgs),
    /// Upload, list, and edit images
    Image(ImageArgs),
    /// Record and list temperature readings
    Temperature(TemperatureArgs),
    /// Record and list water chemistry and habitat measurements
    Stats(StatsArgs),
    /// Show or change global settings
    Settings(SettingsArgs),
    /// Write every image and container to one JSON document
    Export(ExportArgs),
    /// Replace all images and containers with a JSON document
    Import(ImportArgs),
}

#[derive(Args)]
pub struct ContainerArgs {
    #[command(subcommand)]
    pub action: ContainerAction,
}

#[derive(Subcommand)]
pub enum ContainerAction {
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    List,
    Show { id: String },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// An empty value clears the description
        #[arg(short, long)]
        description: Option<String>,
    },
    ToggleTemperature { id: String },
    /// Delete a container with its images and readings
    Remove { id: String },
    /// Delete images whose container no longer exists
    Prune,
}

#[derive(Args)]
pub struct ImageArgs {
    #[command(subcommand)]
    pub action: ImageAction,
}

#[derive(Subcommand)]
pub enum ImageAction {
    /// Store an image file inline as a data URL
    Add {
        container: String,
        file: PathBuf,
        /// YYYY-MM-DD; defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Media type; guessed from the file extension when absent
        #[arg(long)]
        mime: Option<String>,
    },
    /// Images of one container, newest first
    List { container: String },
    Show {
        id: String,
        /// Include the full data URL
        #[arg(long)]
        url: bool,
    },
    Edit {
        id: String,
        /// An empty value clears the title
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, conflicts_with = "unflag")]
        flag: bool,
        #[arg(long)]
        unflag: bool,
    },
    Remove { id: String },
}

#[derive(Args)]
pub struct TemperatureArgs {
    #[command(subcommand)]
    pub action: TemperatureAction,
}

#[derive(Subcommand)]
pub enum TemperatureAction {
    Add {
        container: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    List { container: String },
}

#[derive(Args)]
pub struct StatsArgs {
    #[command(subcommand)]
    pub action: StatsAction,
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Append one dated set of measurements
    Add {
        container: String,
        #[command(flatten)]
        values: StatsValues,
    },
    /// History, oldest first
    List {
        container: String,
        /// Only the most recent entry
        #[arg(long)]
        latest: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct StatsValues {
    #[arg(long)]
    pub ph: Option<f64>,
    #[arg(long)]
    pub ammonia: Option<f64>,
    #[arg(long)]
    pub nitrite: Option<f64>,
    #[arg(long)]
    pub nitrate: Option<f64>,
    #[arg(long)]
    pub hardness: Option<f64>,
    #[arg(long)]
    pub co2: Option<f64>,
    #[arg(long)]
    pub humidity: Option<f64>,
    #[arg(long)]
    pub light: Option<f64>,
    #[arg(long)]
    pub soil_moisture: Option<f64>,
}

#[derive(Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    Show,
    /// Set the webhook URL, or clear it with --clear
    Webhook {
        #[arg(required_unless_present = "clear")]
        url: Option<String>,
        #[arg(long, conflicts_with = "url")]
        clear: bool,
    },
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file; stdout when absent
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    pub file: PathBuf,
}
