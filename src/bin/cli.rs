//! CLI application for skin-irregularity analysis.
//!
//! Usage:
//!   skin-analysis <image> --landmarks face.json                    # Human-readable output
//!   skin-analysis <image> --landmarks face.json --json             # JSON output
//!   skin-analysis <image> --landmarks face.json -o report.json     # Save to file
//!   skin-analysis <image> --landmarks face.json --overlay out.png  # Save composite
//!
//! Landmarks come from an external detector as JSON:
//! `{"points": [{"x": 0.41, "y": 0.22}, ...]}` with normalized coordinates.

use clap::Parser;
use serde::Serialize;
use skin_analysis::{
    count_by_kind, overlay, AnalysisConfig, LandmarkSet, MetricsReport, SkinAnalyzer, Spot,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "skin-analysis")]
#[command(author, version, about = "Skin irregularity detection and skin-health scores", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    image: PathBuf,

    /// Landmark JSON for the face in the image (omit for "no face")
    #[arg(short, long)]
    landmarks: Option<PathBuf>,

    /// Analysis configuration JSON (defaults for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the annotated composite image here
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Also mark landmark positions on the composite
    #[arg(long)]
    draw_landmarks: bool,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output<'a> {
    image: String,
    width: u32,
    height: u32,
    face_detected: bool,
    counts: Counts,
    spots: &'a [Spot],
    metrics: Option<&'a MetricsReport>,
}

#[derive(Serialize)]
struct Counts {
    total: usize,
    moles: usize,
    freckles: usize,
    acne: usize,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AnalysisConfig::from_json_file(path)?
        }
        None => AnalysisConfig::default(),
    };
    let analyzer = SkinAnalyzer::new(config)?;

    let landmarks = match &args.landmarks {
        Some(path) => {
            tracing::info!(?path, "loading landmarks");
            Some(LandmarkSet::from_json_file(path)?)
        }
        None => None,
    };

    tracing::info!(path = ?args.image, "loading image");
    let image = image::open(&args.image)?.to_rgb8();
    let (width, height) = image.dimensions();

    let result = analyzer.analyze_with_landmarks(&image, landmarks.as_ref())?;

    if let Some(path) = &args.overlay {
        let mut composite = result.composite_image.clone();
        if args.draw_landmarks {
            if let Some(set) = &landmarks {
                overlay::draw_landmarks(&mut composite, set);
            }
        }
        composite.save(path)?;
        tracing::info!(?path, "composite written");
    }

    let [(_, moles), (_, freckles), (_, acne)] = count_by_kind(&result.spots);
    let output = Output {
        image: args.image.display().to_string(),
        width,
        height,
        face_detected: result.face_detected(),
        counts: Counts {
            total: result.spots.len(),
            moles,
            freckles,
            acne,
        },
        spots: &result.spots,
        metrics: result.metrics.as_ref(),
    };

    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        tracing::info!(?path, "report written");
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!("Image: {} ({}x{})\n", output.image, output.width, output.height));

    let Some(metrics) = output.metrics else {
        s.push_str("\nNo face found.\n");
        return s;
    };

    s.push_str(&format!(
        "Spots: {} (moles: {}, freckles: {}, acne: {})\n",
        output.counts.total, output.counts.moles, output.counts.freckles, output.counts.acne
    ));

    if !output.spots.is_empty() {
        s.push_str("\n  id  type     center      radius  darkness  redness  circularity\n");
        for spot in output.spots {
            s.push_str(&format!(
                "  {:<3} {:<8} ({:>4},{:>4})  {:>6}  {:>8}  {:>7}  {:>11.2}\n",
                spot.id,
                spot.kind.name(),
                spot.center.0,
                spot.center.1,
                spot.radius,
                spot.darkness,
                spot.redness,
                spot.circularity
            ));
        }
    }

    s.push_str("\nMetrics:\n");
    for (metric, value) in metrics.iter() {
        let note = if metric.is_placeholder() { " (est.)" } else { "" };
        s.push_str(&format!("  {:<13} {:>3}{}\n", format!("{}:", metric), value, note));
    }

    s
}
