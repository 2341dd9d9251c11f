use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use spectrograph::{
    AspectRatio, ColorFormat, ConfirmationRequest, FfmpegLogLevel, FrameInspector, FrameLimit,
    ProgressCallback, ProgressInfo, SamplingController, SamplingOptions, SpectrographError,
    open_source,
};

const CLI_AFTER_HELP: &str = "Examples:\n  spectrograph analyze movie.mp4 --aspect-ratio 2.39:1 --step 24\n  spectrograph analyze movie.mp4 --frames 500 --color-format rgb --out colors.txt\n  spectrograph analyze poster.png --palette-size 8 --json\n  spectrograph completions zsh > _spectrograph";

#[derive(Debug, Parser)]
#[command(
    name = "spectrograph",
    version,
    about = "Extract the dominant color of every sampled frame of a video or image",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Report saved files and run totals on stderr.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the dominant color of each sampled frame.
    #[command(
        about = "Extract dominant colors",
        after_help = "Examples:\n  spectrograph analyze movie.mp4 --step 24\n  spectrograph analyze movie.mp4 --aspect-ratio 16:9 --frames 1000 --out colors.txt\n  spectrograph analyze movie.mp4 --frames 50 --show-frames debug --show-last-frame last.png"
    )]
    Analyze {
        /// Input video or image path.
        input: PathBuf,
        /// Crop letterbox bars down to this content ratio (W:H, 0 disables).
        #[arg(long)]
        aspect_ratio: Option<String>,
        /// Palette entries each frame is quantized to.
        #[arg(long, default_value_t = 32, allow_negative_numbers = true)]
        palette_size: i64,
        /// Maximum number of frames to read, -1 for all.
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        frames: i64,
        /// Analyze every Nth frame.
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        step: i64,
        /// Color output format: hex | rgb.
        #[arg(long, default_value = "hex")]
        color_format: String,
        /// Print the colors as a JSON array.
        #[arg(long)]
        json: bool,
        /// Write the color list to this file.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Save each quantized frame as a PNG in this directory.
        #[arg(long)]
        show_frames: Option<PathBuf>,
        /// Save the last analyzed frame (after cropping) to this file.
        #[arg(long)]
        show_last_frame: Option<PathBuf>,
        /// Do not ask before saving every frame of an unbounded run.
        #[arg(long)]
        yes: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_palette_size(value: i64) -> Result<usize, SpectrographError> {
    if value < 1 {
        return Err(SpectrographError::InvalidPaletteSize(value));
    }
    usize::try_from(value).map_err(|_| SpectrographError::InvalidPaletteSize(value))
}

fn parse_step(value: i64) -> Result<u64, SpectrographError> {
    if value < 1 {
        return Err(SpectrographError::InvalidStep(value));
    }
    Ok(value as u64)
}

fn parse_aspect_ratio(value: Option<&str>) -> Result<AspectRatio, SpectrographError> {
    match value {
        Some(text) => text.parse(),
        None => Ok(AspectRatio::DISABLED),
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level
            .parse()
            .map_err(|_| format!("unsupported --log-level: {level}"))?;
        spectrograph::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if info.current_frame.is_none() {
            self.bar.finish_with_message("done");
        }
    }
}

/// Saves each quantized frame as `frame_NNNNNN.png`.
struct PngFrameWriter {
    directory: PathBuf,
    overwrite: bool,
    verbose: bool,
}

impl PngFrameWriter {
    fn frame_path(&self, frame_number: u64) -> PathBuf {
        self.directory.join(format!("frame_{frame_number:06}.png"))
    }
}

impl FrameInspector for PngFrameWriter {
    fn inspect(&self, frame_number: u64, quantized: &image::RgbImage) {
        let path = self.frame_path(frame_number);
        if path.exists() && !self.overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("skipping {}: file exists", path.display()).yellow()
            );
            return;
        }
        match quantized.save(&path) {
            Ok(()) if self.verbose => {
                eprintln!("saved frame {frame_number} -> {}", path.display());
            }
            Ok(()) => {}
            Err(error) => eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("failed to save {}: {error}", path.display()).yellow()
            ),
        }
    }
}

fn prompt_confirmation(directory: &Path, request: &ConfirmationRequest) -> bool {
    let source = request
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "the input".to_string());
    let count = request
        .selected_frames_hint
        .map(|count| format!("~{count}"))
        .unwrap_or_else(|| "every".to_string());

    eprint!(
        "{} save {count} quantized frames of {source} to {}? [y/N] ",
        "confirm:".cyan().bold(),
        directory.display()
    );
    if io::stderr().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[allow(clippy::too_many_arguments)]
fn analyze(
    global: &GlobalOptions,
    input: &Path,
    aspect_ratio: Option<&str>,
    palette_size: i64,
    frames: i64,
    step: i64,
    color_format: &str,
    json: bool,
    out: Option<&Path>,
    show_frames: Option<&Path>,
    show_last_frame: Option<&Path>,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let format: ColorFormat = color_format.parse()?;
    let mut options = SamplingOptions::new()
        .with_palette_size(parse_palette_size(palette_size)?)
        .with_crop_ratio(parse_aspect_ratio(aspect_ratio)?)
        .with_frame_limit(FrameLimit::from_signed(frames)?)
        .with_step(parse_step(step)?)
        .with_color_format(format)
        .with_keep_last_frame(show_last_frame.is_some());

    if let Some(path) = out {
        ensure_writable_path(path, global.overwrite)?;
    }
    if let Some(path) = show_last_frame {
        ensure_writable_path(path, global.overwrite)?;
    }

    if let Some(directory) = show_frames {
        fs::create_dir_all(directory)?;
        options = options.with_frame_inspector(Arc::new(PngFrameWriter {
            directory: directory.to_path_buf(),
            overwrite: global.overwrite,
            verbose: global.verbose,
        }));
        if !yes {
            let directory = directory.to_path_buf();
            options = options.with_confirmation(Arc::new(move |request: &ConfirmationRequest| {
                prompt_confirmation(&directory, request)
            }));
        }
    }

    if global.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new()?));
    }

    let controller = SamplingController::new(options)?;
    let mut source = open_source(input)?;

    let last_frame = if json || out.is_some() {
        let spectrograph = controller.run(&mut source)?;
        if global.verbose {
            eprintln!(
                "analyzed {} of {} frame(s)",
                spectrograph.len(),
                spectrograph.frames_read()
            );
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&spectrograph.formatted())?);
        } else {
            for line in spectrograph.formatted() {
                println!("{line}");
            }
        }

        if let Some(path) = out {
            let header = format!(
                "spectrograph of {}\n{} frame(s) analyzed",
                input.display(),
                spectrograph.len()
            );
            let mut file = io::BufWriter::new(fs::File::create(path)?);
            spectrograph.write_lines(&mut file, Some(&header))?;
            file.flush()?;
            eprintln!("{} {}", "saved".green().bold(), path.display());
        }

        spectrograph.last_frame().cloned()
    } else {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        let report = controller.run_with(&mut source, |_, color| {
            writeln!(stdout, "{}", color.format(format))?;
            Ok(())
        })?;
        if global.verbose {
            eprintln!(
                "analyzed {} of {} frame(s)",
                report.frames_selected, report.frames_read
            );
        }
        report.last_frame
    };

    if let Some(path) = show_last_frame {
        match last_frame {
            Some(frame) => {
                frame.save(path)?;
                eprintln!("{} {}", "saved".green().bold(), path.display());
            }
            None => eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                "no frame was analyzed, nothing to save".yellow()
            ),
        }
    }

    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match &cli.command {
        Commands::Analyze {
            input,
            aspect_ratio,
            palette_size,
            frames,
            step,
            color_format,
            json,
            out,
            show_frames,
            show_last_frame,
            yes,
        } => analyze(
            &cli.global,
            input,
            aspect_ratio.as_deref(),
            *palette_size,
            *frames,
            *step,
            color_format,
            *json,
            out.as_deref(),
            show_frames.as_deref(),
            show_last_frame.as_deref(),
            *yes,
        )?,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "spectrograph", &mut io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
