use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use dictyviz::logger;
use dictyviz::ortho_pipeline::{
    ArrayStore, FfmpegEncoder, MovieMaker, PipelineConfig, ProjectionEngine, ProjectionOutcome,
    TiffCompression, TiffSequenceEncoder, VideoEncoder, ZarrStore, config::DEFAULT_SLICE_DEPTH,
    load_dataset_channels_with, projected_channel_max,
};

#[derive(Parser)]
#[command(version, about = "Orthogonal max projections and movies of 5D microscopy datasets")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Hide progress bars
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute and store max projections of a zarr dataset
    Project {
        dataset: PathBuf,

        /// Also compute projections over bands along x and y
        #[arg(long)]
        sliced: bool,

        #[arg(long, default_value_t = 0)]
        resolution_level: usize,

        /// Band width of the sliced projections, in voxels
        #[arg(long, default_value_t = DEFAULT_SLICE_DEPTH)]
        slice_depth: usize,
    },
    /// Render the movies of a dataset whose projections are computed
    Movies {
        dataset: PathBuf,

        /// Defaults to the dataset's `movies` group directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = EncoderKind::Ffmpeg)]
        encoder: EncoderKind,

        /// Seconds between time points, used for the timestamp overlay
        #[arg(long, default_value_t = 10)]
        interval: u32,

        #[arg(long, default_value_t = 10)]
        fps: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EncoderKind {
    /// MJPEG AVI through the ffmpeg binary
    Ffmpeg,
    /// One LZW-compressed TIFF per frame
    Tiff,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init_with_filter(match cli.verbose {
        0 => logger::DEFAULT_FILTER,
        1 => "debug",
        _ => "trace",
    });

    match cli.command {
        Command::Project {
            dataset,
            sliced,
            resolution_level,
            slice_depth,
        } => {
            let config = PipelineConfig::builder()
                .resolution_level(resolution_level)
                .slice_depth(slice_depth)
                .show_progress(!cli.quiet)
                .build();
            project(&dataset, sliced, config)
        }
        Command::Movies {
            dataset,
            output_dir,
            encoder,
            interval,
            fps,
        } => {
            let config = PipelineConfig::builder()
                .imaging_interval_secs(interval)
                .frame_rate(fps)
                .show_progress(!cli.quiet)
                .build();
            let output_dir = output_dir.unwrap_or_else(|| dataset.join("movies"));
            match encoder {
                EncoderKind::Ffmpeg => {
                    let encoder = FfmpegEncoder::new(config.video_extension.clone());
                    movies(&dataset, encoder, config, output_dir)
                }
                EncoderKind::Tiff => movies(
                    &dataset,
                    TiffSequenceEncoder::new(TiffCompression::Lzw),
                    config,
                    output_dir,
                ),
            }
        }
    }
}

fn open_store(dataset: &Path) -> anyhow::Result<ZarrStore> {
    ZarrStore::open(dataset).with_context(|| format!("opening zarr store {}", dataset.display()))
}

fn project(dataset: &Path, sliced: bool, config: PipelineConfig) -> anyhow::Result<()> {
    let store = open_store(dataset)?;
    let engine = ProjectionEngine::new(&store, config);
    info!(
        dataset = %store.location(),
        resolution_level = engine.config().resolution_level,
        slice_depth = engine.config().slice_depth,
        "Starting projections"
    );

    let outcome = engine
        .compute_dense_projections()
        .context("computing max projections")?;
    if outcome == ProjectionOutcome::AlreadyComputed {
        warn!("Max projections were already present");
    }
    if sliced {
        engine
            .compute_sliced_projections()
            .context("computing sliced max projections")?;
    }
    info!("Projections done");
    Ok(())
}

fn movies<E: VideoEncoder>(
    dataset: &Path,
    encoder: E,
    config: PipelineConfig,
    output_dir: PathBuf,
) -> anyhow::Result<()> {
    let store = open_store(dataset)?;
    let channels = load_dataset_channels_with(dataset, |name, index| {
        let max = projected_channel_max(&store, index)?;
        info!(channel = name, max, "No scaleMax given, using brightest projected value");
        Ok(f64::from(max))
    })
    .context("reading channel metadata")?;

    let maker = MovieMaker::with_custom(&store, encoder, config, output_dir);
    let written = maker
        .make_all_movies(&channels)
        .context("rendering movies")?;
    for path in &written {
        info!(path = %path.display(), "Movie");
    }
    info!(count = written.len(), output_dir = %maker.output_dir().display(), "Movies done");
    Ok(())
}
