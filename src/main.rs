use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use merdi::ai::GenerationService;
use merdi::app::App;
use merdi::config::Settings;
use merdi::diagram::{export_svg, run_attempt, KrokiEngine, RenderPipeline, RenderState, Theme};
use merdi::provider::Provider;
use merdi::{handler, tui, ui};

#[derive(Parser)]
#[command(name = "merdi", version)]
#[command(about = "Turn plain-text scenarios into Mermaid diagrams with AI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a diagram from a scenario and save it as diagram.svg
    Generate {
        /// The scenario to diagram
        text: String,
        /// Theme baked into the rendered output
        #[arg(short, long, value_enum, default_value = "default")]
        theme: Theme,
        /// Directory the SVG is written into (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the generated Mermaid source instead of rendering it
        #[arg(long)]
        source_only: bool,
    },
    /// Show or update the stored model name and API key
    Settings {
        /// Model name to store (e.g. gpt-4o or openai/gpt-4o)
        #[arg(long)]
        model: Option<String>,
        /// API key to store
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_tui().await,
        Some(Commands::Generate {
            text,
            theme,
            output,
            source_only,
        }) => {
            init_stderr_logging();
            run_generate(&text, theme, output, source_only).await
        }
        Some(Commands::Settings { model, api_key }) => {
            init_stderr_logging();
            run_settings(model, api_key)
        }
    }
}

async fn run_tui() -> Result<()> {
    init_file_logging();
    tui::install_panic_hook();

    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event).await?;
        } else {
            break;
        }
    }

    tui::restore()?;
    Ok(())
}

async fn run_generate(
    text: &str,
    theme: Theme,
    output: Option<PathBuf>,
    source_only: bool,
) -> Result<()> {
    let settings = Settings::load();
    let service = GenerationService::new();

    let source = service
        .generate(settings.as_ref(), text)
        .await
        .map_err(|err| anyhow!("{err}"))?;

    if source_only {
        println!("{source}");
        return Ok(());
    }

    let mut pipeline = RenderPipeline::new();
    pipeline.set_theme(theme);
    let attempt = pipeline
        .set_source(Some(source))
        .ok_or_else(|| anyhow!("generated source was empty after sanitization"))?;

    eprintln!("Rendering with the {} theme...", theme.as_str());
    let engine = KrokiEngine::new();
    let outcome = run_attempt(&engine, &attempt).await;
    pipeline.complete(attempt.token, outcome);

    match pipeline.state() {
        RenderState::Rendered(svg) => {
            let dir = match output {
                Some(dir) => dir,
                None => std::env::current_dir().context("could not resolve current directory")?,
            };
            let path = export_svg(svg, &dir)?;
            println!("Saved {}", path.display());
            Ok(())
        }
        RenderState::Errored(message) => {
            eprintln!("Generated source:\n{}", pipeline.raw_source().unwrap_or_default());
            bail!("{message}");
        }
        state => bail!("render ended in unexpected state {state:?}"),
    }
}

fn run_settings(model: Option<String>, api_key: Option<String>) -> Result<()> {
    let current = Settings::load();

    if model.is_none() && api_key.is_none() {
        match &current {
            Some(settings) => {
                println!("model:   {}", settings.model_name);
                println!("api key: {}", mask(&settings.api_key));
                let provider = Provider::select(&settings.api_key, &settings.model_name);
                println!("routes:  {}", provider.display_name());
            }
            None => println!("No settings stored. Set them with --model and --api-key."),
        }
        return Ok(());
    }

    let mut settings = current.unwrap_or_default();
    if let Some(model) = model {
        settings.model_name = model;
    }
    if let Some(api_key) = api_key {
        settings.api_key = api_key;
    }

    if !settings.is_complete() {
        bail!("both a model name and an API key are required before generating");
    }

    settings.save()?;
    println!("Settings saved.");
    Ok(())
}

fn mask(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "•".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{}", "•".repeat(count - 4), tail)
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// The TUI owns the terminal, so logs go to a file under the cache dir.
fn init_file_logging() {
    let dir = dirs::cache_dir()
        .map(|d| d.join("merdi"))
        .unwrap_or_else(|| PathBuf::from("."));
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }

    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("merdi.log"))
    else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .init();
}
