use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facelab::overlay::{self, ImageSurface, OverlayMode};
use facelab::roi::RoiMap;
use facelab::session::StopFlag;
use facelab::{config, insight, metrics, remote, server};
use facelab_vision::{Camera, Landmarker};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "facelab")]
#[command(
    version,
    about = "Landmark-driven face analysis - skin scores, overlays, insights"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a photo: scores, insights, optional overlay image
    Analyze {
        /// Input image path
        image: PathBuf,
        /// Write the rendered overlay to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Render heatmap blobs instead of mesh dots
        #[arg(long)]
        heatmap: bool,
        /// Also ask the remote classifier for a verdict
        #[arg(long)]
        classify: bool,
    },
    /// Analyze live camera frames
    Live {
        /// Camera device (defaults to the configured device)
        #[arg(short, long)]
        device: Option<String>,
        /// Number of frames to analyze before stopping
        #[arg(short, long, default_value_t = 60)]
        frames: u32,
    },
    /// Run the photo assessment relay server
    Serve {
        /// Listen address (defaults to the configured address)
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Analyze {
            image,
            output,
            heatmap,
            classify,
        } => analyze(&cfg, &image, output.as_deref(), heatmap, classify),
        Commands::Live { device, frames } => live(&cfg, device, frames),
        Commands::Serve { listen } => serve(&cfg, listen),
        Commands::Config => open_config(),
    }
}

fn analyze(
    cfg: &config::Config,
    image_path: &Path,
    output: Option<&Path>,
    heatmap: bool,
    classify: bool,
) -> Result<()> {
    let img = image::open(image_path)
        .with_context(|| format!("opening {}", image_path.display()))?
        .into_rgb8();

    let mut landmarker = Landmarker::new(&cfg.model)
        .context("Failed to load landmark model")?
        .with_min_confidence(cfg.min_confidence);

    let landmarks = landmarker.detect(&img).context("Landmark detection failed")?;
    if landmarks.is_empty() {
        return Err(facelab::Error::NoFace)
            .context("Ensure the face is visible and well-lit, then retry");
    }

    let map = RoiMap::default();
    let scores = metrics::analyze(&img, &landmarks, &map);

    info!("{}", insight::score_bar("symmetry", scores.symmetry));
    info!("{}", insight::score_bar("texture", scores.texture));
    info!("{}", insight::score_bar("oiliness", scores.oiliness));
    info!("{}", insight::score_bar("beard", scores.beard));

    let verdict = if classify {
        match classify_photo(cfg, image_path) {
            Ok(v) => {
                info!(
                    "remote notes: skin {:.1}/10, symmetry {:.1}/10, grooming {:.1}/10",
                    v.skin.note, v.symmetry.note, v.grooming.note
                );
                Some(v)
            }
            Err(e) => {
                warn!("Remote classification failed: {e}");
                None
            }
        }
    } else {
        None
    };

    for line in insight::insights(&scores, verdict.as_ref()) {
        info!("- {line}");
    }

    if let Some(path) = output {
        let mode = if heatmap {
            OverlayMode::Heatmap
        } else {
            OverlayMode::Mesh
        };
        let mut surface = ImageSurface::new(img);
        overlay::render(&mut surface, mode, &landmarks, &map, &scores);
        surface
            .frame()
            .save(path)
            .with_context(|| format!("writing overlay to {}", path.display()))?;
        info!("Overlay written to {}", path.display());
    }

    Ok(())
}

fn classify_photo(cfg: &config::Config, image_path: &Path) -> Result<remote::Verdict> {
    let bytes = std::fs::read(image_path)?;
    let media_type = media_type_for(image_path);
    let client = reqwest::Client::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(rt.block_on(remote::classify(&client, &cfg.remote, &bytes, media_type))?)
}

fn media_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

fn live(cfg: &config::Config, device: Option<String>, frames: u32) -> Result<()> {
    let device = device.unwrap_or_else(|| cfg.camera.clone());
    info!("Opening camera: {device}");

    let mut camera = Camera::open(&device).context("Failed to open camera")?;
    let mut landmarker = Landmarker::new(&cfg.model)
        .context("Failed to load landmark model")?
        .with_min_confidence(cfg.min_confidence);
    let map = RoiMap::default();
    let stop = StopFlag::new();
    watch_for_ctrl_c(stop.clone());
    info!("Press Ctrl+C to stop.");

    // One pass at a time: capture, detect, score, report, then loop.
    for i in 0..frames {
        if stop.is_cancelled() {
            info!("Live loop cancelled after {i} frames");
            break;
        }

        let frame = camera.frame().context("Failed to capture frame")?;
        let landmarks = match landmarker.detect(&frame) {
            Ok(l) => l,
            Err(e) => {
                warn!("Frame {}: {e:#}", i + 1);
                continue;
            }
        };
        if landmarks.is_empty() {
            warn!("Frame {}: no face detected", i + 1);
            continue;
        }

        let scores = metrics::analyze(&frame, &landmarks, &map);
        info!(
            "Frame {}: symmetry {} texture {} oiliness {} beard {}",
            i + 1,
            scores.symmetry,
            scores.texture,
            scores.oiliness,
            scores.beard
        );
    }

    Ok(())
}

// Flip the stop flag on Ctrl+C so the live loop finishes its current pass
// instead of dying mid-frame.
fn watch_for_ctrl_c(stop: StopFlag) {
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();
        if let Ok(rt) = rt {
            if rt.block_on(tokio::signal::ctrl_c()).is_ok() {
                stop.cancel();
            }
        }
    });
}

fn serve(cfg: &config::Config, listen: Option<String>) -> Result<()> {
    let listen = listen.unwrap_or_else(|| cfg.listen.clone());
    if cfg.remote.api_key.is_empty() {
        warn!("remote.api_key is empty; upstream calls will be rejected");
    }
    let state = server::AppState {
        remote: cfg.remote.clone(),
        client: reqwest::Client::new(),
    };
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(server::serve(&listen, state))
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
