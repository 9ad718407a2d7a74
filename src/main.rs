use anyhow::{anyhow, Context, Result};
use braillecue::decode::is_frame_image;
use braillecue::{AppConfig, ConversionSummary, Progress, ProgressPhase, SubtitleConverter, VideoOptions};
use clap::Parser;
use dialoguer::{FuzzySelect, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

const CONFIG_NAMES: &[&str] = &["braillecue.json", "braillecue.toml"];

fn load_config() -> Result<AppConfig> {
    // Look for braillecue.{json,toml} in app support, current dir fallback, then built-in default
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(d) = dirs::data_dir() {
        for name in CONFIG_NAMES {
            tried.push(d.join("braillecue").join(name));
        }
    }
    for name in CONFIG_NAMES {
        tried.push(PathBuf::from(name));
    }

    for p in &tried {
        if p.exists() {
            log::info!("using config {}", p.display());
            return AppConfig::from_file(p);
        }
    }

    Ok(AppConfig::default())
}

#[derive(Parser, Debug)]
#[command(version, about = "Interactive video to braille-art subtitle generator.")]
struct Args {
    /// Input video file, image, or directory of images
    input: Option<PathBuf>,

    /// Output directory for the generated document
    out: Option<PathBuf>,

    /// Character rows of the braille grid
    #[arg(long)]
    rows: Option<u32>,

    /// Brightness layers per frame (1-8)
    #[arg(long)]
    layers: Option<usize>,

    /// Target output size in MiB
    #[arg(long)]
    target_size: Option<f64>,

    /// Source frame rate (overrides the probed rate; used for image directories)
    #[arg(long)]
    fps: Option<f64>,

    /// Milliseconds to skip at the start of the video
    #[arg(long, default_value_t = 0)]
    start_ms: u64,

    /// Milliseconds added to every cue start
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    sub_ms_offset: i64,

    /// SRT subtitles to show under the braille frames
    #[arg(long)]
    subtitles: Option<PathBuf>,

    /// Use default quality preset
    #[arg(long, default_value_t = false, conflicts_with_all = &["small", "large"])]
    default: bool,

    /// Use smaller default values for quality settings
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["default", "large"])]
    small: bool,

    /// Use larger default values for quality settings
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["default", "small"])]
    large: bool,

    /// Log details to standard output
    #[arg(long, default_value_t = false)]
    log_details: bool,

    /// Keep intermediate image files
    #[arg(long, default_value_t = false)]
    keep_images: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = Args::parse();
    let is_interactive = !(args.default || args.small || args.large);

    // --- Interactive Prompts ---
    if args.input.is_none() {
        if !is_interactive {
            return Err(anyhow!("Input file must be provided when using a preset."));
        }
        let files = find_media_files()?;
        if files.is_empty() {
            return Err(anyhow!("No media files found in current directory."));
        }
        let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt("Choose an input file")
            .default(0)
            .items(&files)
            .interact()?;
        args.input = Some(PathBuf::from(&files[selection]));
    }

    let input_path = args
        .input
        .clone()
        .ok_or_else(|| anyhow!("Input path must be provided"))?;
    if !input_path.exists() {
        return Err(anyhow!("Input path does not exist: {}", input_path.display()));
    }
    let is_image_input = input_path.is_dir() || is_frame_image(&input_path);

    let output_path = args.out.clone().unwrap_or_else(|| PathBuf::from("."));

    // Load config and decide preset
    let cfg = load_config()?;
    let converter = SubtitleConverter::with_config(cfg.clone())?;

    let active_preset_name = if args.small {
        "small"
    } else if args.large {
        "large"
    } else {
        cfg.default_preset.as_str()
    };
    let mut conv_opts = converter.options_from_preset(active_preset_name)?;
    let active = converter
        .get_preset(active_preset_name)
        .ok_or_else(|| anyhow!("Missing preset '{}' in config", active_preset_name))?;

    if is_interactive {
        if args.rows.is_none() {
            args.rows = Some(
                Input::new()
                    .with_prompt("Rows (height)")
                    .default(active.rows)
                    .interact()?,
            );
        }

        if args.layers.is_none() {
            args.layers = Some(
                Input::new()
                    .with_prompt("Brightness layers")
                    .default(active.layers)
                    .interact()?,
            );
        }

        if args.target_size.is_none() {
            args.target_size = Some(
                Input::new()
                    .with_prompt("Target size (MiB)")
                    .default(active.target_size_mib)
                    .interact()?,
            );
        }
    }

    if let Some(rows) = args.rows {
        conv_opts = conv_opts.with_rows(rows);
    }
    if let Some(layers) = args.layers {
        conv_opts = conv_opts.with_layers(layers);
    }
    if let Some(mib) = args.target_size {
        conv_opts = conv_opts.with_target_size(mib);
    }
    conv_opts = conv_opts.with_sub_ms_offset(args.sub_ms_offset);

    let video_opts = VideoOptions {
        start_ms: args.start_ms,
        fps: args.fps,
        subtitles: args.subtitles.clone(),
    };

    // --- Execution ---
    fs::create_dir_all(&output_path).context("creating output dir")?;

    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")?
        .progress_chars("#>-");
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(style);
    let report = |progress: Progress| match progress.phase {
        ProgressPhase::DecodingFrames => progress_bar.set_message(progress.message),
        ProgressPhase::EncodingFrames => {
            progress_bar.set_length(progress.total as u64);
            progress_bar.set_position(progress.completed as u64);
        }
        ProgressPhase::Complete => progress_bar.finish_with_message("Done"),
    };

    let summary = if is_image_input {
        println!("Converting images to braille subtitles...");
        converter.convert_images(&input_path, &output_path, &video_opts, &conv_opts, report)?
    } else {
        println!("Extracting video frames...");
        converter.convert_video_with_detailed_progress(
            &input_path,
            &output_path,
            &video_opts,
            &conv_opts,
            args.keep_images,
            report,
        )?
    };

    println!("\nSubtitles written to {}", summary.output_path.display());
    if summary.truncated {
        println!("Output hit the size ceiling; the last frames were dropped.");
    }

    // --- Create details.md ---
    let details = render_details(&summary)?;
    let details_path = output_path.join("details.md");
    fs::write(details_path, &details).context("writing details file")?;

    if args.log_details {
        println!("\n--- Generation Details ---");
        println!("{}", details);
    }

    Ok(())
}

fn render_details(summary: &ConversionSummary) -> Result<String> {
    let mut details = format!(
        "Version: {}\nRows: {}\nColumns: {}\nDisplay Mode: {}\nFont Size: {}\nLayers: {}\nStride: {}\nFPS: {:.3}\nPalette Colors: {}\nCues: {}\nSize: {} bytes",
        env!("CARGO_PKG_VERSION"),
        summary.geometry.rows,
        summary.geometry.cols,
        summary.geometry.display_mode.name(),
        summary.geometry.font_tier.name(),
        summary.layers,
        summary.plan.stride,
        summary.plan.output_fps,
        summary.palette_size,
        summary.cue_count,
        summary.output_bytes,
    );
    if summary.meta_cue_count > 0 {
        details.push_str(&format!("\nSubtitle Cues: {}", summary.meta_cue_count));
    }
    details.push_str(&format!("\nTruncated: {}", summary.truncated));

    let json = serde_json::to_string_pretty(summary).context("serializing summary")?;
    details.push_str(&format!("\n\n```json\n{}\n```\n", json));
    Ok(details)
}

fn find_media_files() -> Result<Vec<String>> {
    Ok(WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().is_some_and(|ext| {
                    matches!(
                        ext.to_str(),
                        Some("mp4" | "mkv" | "mov" | "avi" | "webm" | "png" | "jpg" | "jpeg")
                    )
                })
        })
        .map(|e| e.path().to_str().unwrap_or("").to_string())
        .collect())
}
