use std::path::PathBuf;

use eyre::{Result, WrapErr, bail};
use log::{debug, info};

mod cli;

use cli::{Cli, Command, OutputFormat, PromptsAction, SourceArgs};
use ytgen::config::{Config, Settings};
use ytgen::generate::GenerationRequest;
use ytgen::llm::ApiKeys;
use ytgen::models::Provider;
use ytgen::saved::{FilePromptStore, PromptStore};
use ytgen::server::AppState;
use ytgen::templates::Persona;
use ytgen::{CaptionTrack, output};

/// Server logs go to stderr
fn setup_server_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// CLI logs go to a file so stdout stays clean
fn setup_file_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytgen.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytgen")
        .join("logs")
}

fn build_after_help() -> String {
    let keys = ApiKeys::from_env();

    let lines: Vec<String> = Provider::ALL
        .iter()
        .map(|p| match keys.get(*p) {
            Some(_) => format!("  \x1b[32m✅\x1b[0m {:<10} configured", p.name()),
            None => format!(
                "  \x1b[31m❌\x1b[0m {:<10} (set {} to enable)",
                p.name(),
                p.env_vars().join(" or ")
            ),
        })
        .collect();

    format!(
        "\nPROVIDERS:\n{}\n\nConfig: {}\nLogs are written to: {}",
        lines.join("\n"),
        ytgen::config::config_path().display(),
        log_dir().join("ytgen.log").display()
    )
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path.clone())?,
        None => Config::load()?,
    };
    config.settings()
}

fn write_output(rendered: &str, path: Option<&PathBuf>, verbose: bool) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered).wrap_err_with(|| format!("writing {}", path.display()))?;
            if verbose {
                eprintln!("Output written to: {}", path.display());
            }
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn fetch_track(state: &AppState, source: &SourceArgs, verbose: bool) -> Result<CaptionTrack> {
    let video_id = ytgen::extract_video_id(&source.url)
        .ok_or_else(|| eyre::eyre!("could not extract video ID from: {}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  <11-character video ID>", source.url))?;

    let translate_with = source.translate.then_some(source.translate_model.as_str());
    let track = state
        .load_transcript(&video_id, source.lang.as_deref(), translate_with)
        .await
        .wrap_err_with(|| format!("fetching transcript for {video_id}"))?;

    if verbose {
        eprintln!(
            "Video: {}\nLanguage: {}\nLines: {}\nTranslated: {}",
            track.video_id,
            track.language.as_deref().unwrap_or("default"),
            track.lines.len(),
            track.translated,
        );
    }
    Ok(track)
}

fn run_prompts(action: PromptsAction) -> Result<()> {
    let store = FilePromptStore::new(ytgen::saved::default_path());

    match action {
        PromptsAction::List => {
            let prompts = store.list()?;
            if prompts.is_empty() {
                eprintln!("No saved prompts in {}", store.path().display());
            }
            for p in prompts {
                let preview: String = p.content.chars().take(40).collect();
                println!("{}  {}  {}", p.id, p.name, preview.replace('\n', " "));
            }
        }
        PromptsAction::Add { name, content, file } => {
            let content = match (content, file) {
                (Some(c), _) => c,
                (None, Some(path)) => {
                    std::fs::read_to_string(&path).wrap_err_with(|| format!("reading {}", path.display()))?
                }
                (None, None) => bail!("provide prompt content or --file"),
            };
            let saved = store.add(&name, &content)?;
            println!("{}", saved.id);
        }
        PromptsAction::Remove { id } => {
            if !store.remove(&id)? {
                bail!("no saved prompt with id {id}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // a missing .env is the normal case
        if !e.not_found() {
            return Err(e).wrap_err("reading .env");
        }
    }

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    if matches!(cli.command, Command::Serve { .. }) {
        setup_server_logging();
    } else {
        setup_file_logging()?;
    }

    let mut settings = load_settings(&cli)?;
    debug!("Settings: {settings:?}");

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                settings.bind = bind;
            }
            let addr = settings.bind;
            let state = AppState::from_settings(settings, &ApiKeys::from_env())?;
            ytgen::server::serve(state, addr).await?;
        }
        Command::Transcript { source, format, output } => {
            let state = AppState::from_settings(settings, &ApiKeys::from_env())?;
            let track = fetch_track(&state, &source, cli.verbose).await?;
            let rendered = match format {
                OutputFormat::Text => output::render_text(&track),
                OutputFormat::Json => output::render_json(&track),
            };
            write_output(&rendered, output.as_ref(), cli.verbose)?;
        }
        Command::Generate {
            source,
            mode,
            model,
            prompt,
            prompt_name,
            persona,
            audience,
            format,
            output,
        } => {
            let prompt = match prompt_name {
                Some(name) => {
                    let store = FilePromptStore::new(ytgen::saved::default_path());
                    let saved = store
                        .find(&name)?
                        .ok_or_else(|| eyre::eyre!("no saved prompt named '{name}'"))?;
                    Some(saved.content)
                }
                None => prompt,
            };

            let state = AppState::from_settings(settings, &ApiKeys::from_env())?;
            let track = fetch_track(&state, &source, cli.verbose).await?;

            let model = model.unwrap_or_else(|| mode.default_model().to_string());
            let req = GenerationRequest {
                text: track.text(),
                prompt,
                model: Some(model.clone()),
                persona: Persona { persona, audience },
            };
            let content = ytgen::generate::generate(&state.dispatcher, mode, &req, state.settings.max_input_chars)
                .await
                .wrap_err_with(|| format!("generating {mode} with {model}"))?;

            let rendered = match format {
                OutputFormat::Text => content,
                OutputFormat::Json => output::render_generated_json(&track, mode, &model, &content),
            };
            write_output(&rendered, output.as_ref(), cli.verbose)?;
        }
        Command::Prompts { action } => run_prompts(action)?,
    }

    Ok(())
}
