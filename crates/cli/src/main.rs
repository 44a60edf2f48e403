use anyhow::{Context, Result, bail};
use arboard::Clipboard;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use restyle_core::capture::{CaptureOutcome, CaptureSource, DesktopCapture};
use restyle_core::{Config, Phase, Restyle, SessionState, Settings, StyleId, init};
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Apply an AI style to a photo", long_about = None)]
struct Args {
    /// Photo to edit: a file path, an http(s) URL, or a data: URI
    #[arg(short, long, conflicts_with = "camera")]
    photo: Option<String>,

    /// Grab a monitor instead of picking a photo
    #[arg(long, default_value_t = false)]
    camera: bool,

    /// Monitor used by --camera
    #[arg(long, default_value_t = 0)]
    monitor: usize,

    /// Style to apply; repeat to supersede, only the last one counts
    #[arg(short, long = "style", value_parser = parse_style)]
    styles: Vec<StyleId>,

    /// Override the endpoint defined in the environment
    #[arg(long)]
    endpoint: Option<String>,

    /// Re-encode the upload as JPEG at this quality (1-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Remember the chosen style as the default
    #[arg(long, default_value_t = false)]
    save_default_style: bool,

    /// Copy the result URL to clipboard automatically
    #[arg(short, long, default_value_t = false)]
    copy: bool,

    /// List available styles and exit
    #[arg(long)]
    list_styles: bool,

    /// List available monitors and exit
    #[arg(long)]
    list_monitors: bool,
}

fn parse_style(raw: &str) -> std::result::Result<StyleId, String> {
    raw.parse().map_err(|e: restyle_core::AppError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    if args.list_styles {
        println!("Available styles:");
        for style in StyleId::ALL {
            println!("  {:<16} {}", style.slug(), style);
        }
        return Ok(());
    }

    if args.list_monitors {
        println!("Available monitors:");
        for info in DesktopCapture::list_monitors()? {
            println!("{}", info);
        }
        return Ok(());
    }

    // Load config, then saved settings, then CLI overrides
    let mut settings = Settings::load();
    let config = settings
        .apply_to(&Config::load().context("Failed to load configuration")?)
        .context("Invalid saved settings")?;
    let config = apply_overrides(config, &args)?;

    let mut styles = args.styles.clone();
    if styles.is_empty() {
        styles.extend(settings.default_style);
    }
    let Some(&final_style) = styles.last() else {
        bail!("No style given. Use --style, or --list-styles to see the catalog");
    };

    let mut app = Restyle::with_config(config)?;

    // Acquire the photo
    let (capture, source) = match (&args.photo, args.camera) {
        (Some(choice), _) => (
            DesktopCapture::new().with_library_choice(choice.clone()),
            CaptureSource::Library,
        ),
        (None, true) => (
            DesktopCapture::new().with_monitor(args.monitor),
            CaptureSource::Camera,
        ),
        (None, false) => bail!("No photo given. Use --photo <path|url> or --camera"),
    };

    match app.orchestrator_mut().acquire(&capture, source).await {
        CaptureOutcome::Selected(photo) => println!("Photo: {}", photo),
        CaptureOutcome::Cancelled => {
            println!("Selection cancelled");
            return Ok(());
        }
        CaptureOutcome::Failed(err) => bail!("Could not get a photo: {}", err),
    }

    // Submit every requested style; later ones supersede earlier ones
    for style in &styles {
        app.orchestrator_mut().request_edit(*style)?;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!("Applying {}...", final_style));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress = tokio::spawn(follow_progress(
        app.orchestrator().subscribe(),
        spinner.clone(),
    ));
    let state = app.orchestrator_mut().settle().await.clone();
    progress.abort();

    spinner.finish_and_clear();

    report(&state, args.copy);

    if args.save_default_style {
        settings.default_style = Some(final_style);
        if let Err(e) = settings.save() {
            eprintln!("Warning: Failed to save settings: {}", e);
        }
    }

    if state.phase() == Phase::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn apply_overrides(config: Config, args: &Args) -> Result<Config> {
    if args.endpoint.is_none() && args.quality.is_none() {
        return Ok(config);
    }
    let overrides = Settings {
        default_style: None,
        endpoint_url: args.endpoint.clone(),
        upload_quality: args.quality,
    };
    overrides
        .apply_to(&config)
        .context("Invalid command line override")
}

/// Mirrors state changes onto the spinner until the session settles.
async fn follow_progress(mut snapshots: watch::Receiver<SessionState>, spinner: ProgressBar) {
    while snapshots.changed().await.is_ok() {
        let state = snapshots.borrow_and_update().clone();
        if let Some(request) = state.current_request {
            spinner.set_message(format!("Waiting for the transformation service ({})...", request));
        }
    }
}

fn report(state: &SessionState, copy: bool) {
    match (state.phase(), &state.result, &state.error) {
        (Phase::Completed, Some(result), _) => {
            println!("Result: {}", result);

            // Copy to clipboard if requested
            if copy {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(result.to_string()) {
                            eprintln!("Warning: Failed to copy to clipboard: {}", e);
                        } else {
                            println!("(Copied to clipboard)");
                        }
                    }
                    Err(e) => eprintln!("Warning: Could not access clipboard: {}", e),
                }
            }
        }
        (Phase::Failed, _, Some(err)) => {
            eprintln!("{}", err.user_message());
            tracing::debug!(kind = err.kind(), error = %err, "edit failed");
        }
        (phase, ..) => eprintln!("Edit did not finish (state: {:?})", phase),
    }
}
