//! otolith CLI — command-line front end for the age-estimation engine.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use otolith::{AgeEstimator, AnalysisOptions, EstimatorConfig, Method, MethodSelection};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "otolith")]
#[command(about = "Estimate fish age from otolith images (multi-method growth-ring detection)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an otolith image and write the JSON report.
    Estimate(EstimateArgs),

    /// Print the default pipeline configuration (JSON).
    ConfigInfo,
}

#[derive(Debug, Clone, Args)]
struct EstimateArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the analysis report (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Path to write the annotated overlay (PNG).
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Detection method.
    #[arg(long, value_enum, default_value_t = CliMethod::Ensemble)]
    method: CliMethod,

    /// Image calibration in millimetres per pixel.
    #[arg(long)]
    mm_per_pixel: Option<f32>,

    /// Scientific name used for growth-model parameter lookup.
    #[arg(long)]
    species: Option<String>,

    /// Number of radial profiling rays.
    #[arg(long)]
    rays: Option<usize>,

    /// Detector deadline in milliseconds (late detectors score zero).
    #[arg(long)]
    detector_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliMethod {
    Ensemble,
    ProfilePeaks,
    EdgeDensity,
    Laplacian,
    MultiScaleBlob,
    GaborTexture,
    GradientMagnitude,
}

impl From<CliMethod> for MethodSelection {
    fn from(m: CliMethod) -> Self {
        match m {
            CliMethod::Ensemble => MethodSelection::Ensemble,
            CliMethod::ProfilePeaks => MethodSelection::Single(Method::ProfilePeaks),
            CliMethod::EdgeDensity => MethodSelection::Single(Method::EdgeDensity),
            CliMethod::Laplacian => MethodSelection::Single(Method::Laplacian),
            CliMethod::MultiScaleBlob => MethodSelection::Single(Method::MultiScaleBlob),
            CliMethod::GaborTexture => MethodSelection::Single(Method::GaborTexture),
            CliMethod::GradientMagnitude => MethodSelection::Single(Method::GradientMagnitude),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate(args) => run_estimate(args),
        Commands::ConfigInfo => {
            let json = serde_json::to_string_pretty(&EstimatorConfig::default())?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn run_estimate(args: EstimateArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());

    let img = image::open(&args.image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", args.image.display(), e).into()
    })?;
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let mut config = EstimatorConfig::default();
    if let Some(rays) = args.rays {
        config.profile.n_rays = rays;
    }
    config.detector_timeout = args
        .detector_timeout_ms
        .map(std::time::Duration::from_millis);

    let estimator = AgeEstimator::with_config(config);
    let options = AnalysisOptions {
        method: args.method.into(),
        mm_per_pixel: args.mm_per_pixel,
        species: args.species.clone(),
        render_overlay: args.annotate.is_some(),
    };

    let report = estimator.analyze_with(&gray, &options)?;
    tracing::info!(
        "Estimated age {} with confidence {:.2} ({})",
        report.age.estimated_age,
        report.age.confidence,
        report.age.confidence_level.as_str()
    );

    if let Some(annotate_path) = &args.annotate {
        match &report.visualization_png {
            Some(bytes) => {
                std::fs::write(annotate_path, bytes)?;
                tracing::info!("Overlay written to {}", annotate_path.display());
            }
            None => tracing::warn!("overlay rendering failed, no annotation written"),
        }
    }

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Report written to {}", args.out.display());

    Ok(())
}
