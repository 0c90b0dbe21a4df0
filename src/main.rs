use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use jukebox::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP trigger endpoints
    Serve,

    /// Sign this device in and authorize it with Spotify
    Login,

    /// Fetch a playlist and store its tracks
    Ingest(IngestOptions),

    /// Show the tracks for the current weekday and hour
    Now,

    /// Play a shuffled selection of the current tracks
    Play,

    /// Pause playback
    Pause,

    /// Resume whatever the device had queued
    Resume,

    /// Interactive play/pause button with fades
    Toggle,

    /// Save the playback device id for this device
    Device(DeviceOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct IngestOptions {
    /// Spotify playlist id
    pub playlist_id: String,

    /// First playlist position to keep (needs --end)
    #[clap(long)]
    pub start: Option<usize>,

    /// Playlist position to stop before (needs --start)
    #[clap(long)]
    pub end: Option<usize>,

    /// Tag copied onto every stored track
    #[clap(long)]
    pub channel: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeviceOptions {
    /// Device id reported by the Web Playback SDK
    pub device_id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let settings = match config::Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };

    match cli.command {
        Command::Serve => cli::serve(settings).await,
        Command::Login => cli::login(settings).await,
        Command::Ingest(opt) => {
            cli::ingest(settings, opt.playlist_id, opt.start, opt.end, opt.channel).await
        }
        Command::Now => cli::now(settings).await,
        Command::Play => cli::play(settings).await,
        Command::Pause => cli::pause(settings).await,
        Command::Resume => cli::resume(settings).await,
        Command::Toggle => cli::toggle(settings).await,
        Command::Device(opt) => cli::device(settings, opt.device_id).await,
        Command::Completions(_) => {}
    }
}
