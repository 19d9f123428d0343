use plastic_id::{BuiltinModel, ClassificationResult, ModelManager, PlasticClassifier};
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Images to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Force a fresh download of the model files
    #[arg(short, long)]
    fresh: bool,

    /// Minimum score before a category is reported
    #[arg(short, long, default_value_t = 0.5)]
    threshold: f32,

    /// Print results as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    image: &'a str,
    #[serde(flatten)]
    result: ClassificationResult,
    recyclable: bool,
    resin_code: Option<u8>,
    suggestions: &'static [&'static str],
}

fn remove_cached_model() -> Result<()> {
    let manager = ModelManager::new_default().context("Failed to open model cache")?;
    let info = BuiltinModel::MobileNetV2.get_model_info();
    info!("Fresh download requested - removing any existing model files...");
    manager.remove_download(&info.name)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.fresh {
        remove_cached_model()?;
    }

    let start_time = Instant::now();
    let classifier = PlasticClassifier::builder()
        .with_model(BuiltinModel::MobileNetV2)?
        .with_confidence_threshold(args.threshold)
        .build()?;

    if !classifier.load_model().await {
        bail!(
            "Could not load the recognition model: {}",
            classifier.last_load_error().unwrap_or_default()
        );
    }
    info!("Model ready (took {:.2?})", start_time.elapsed());

    for path in &args.images {
        let classify_start = Instant::now();
        let result = classifier.classify_file(path).await;
        info!("Classified {:?} in {:.2?}", path, classify_start.elapsed());
        print_result(&path.to_string_lossy(), result, args.json)?;
    }

    Ok(())
}

fn print_result(image: &str, result: ClassificationResult, json: bool) -> Result<()> {
    let guidance = result.guidance();
    if json {
        let report = Report {
            image,
            result,
            recyclable: guidance.recyclable,
            resin_code: guidance.resin_code,
            suggestions: guidance.suggestions,
        };
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    println!("\n{}", image);
    println!("  Identified as: {} ({})", result.category, result.category.display_name());
    println!("  Confidence:    {:.1}%", result.confidence * 100.0);
    println!(
        "  Verdict:       {}",
        if guidance.recyclable { "Recyclable" } else { "Not commonly recyclable" }
    );
    println!("  Suggestions:");
    for suggestion in guidance.suggestions {
        println!("    - {}", suggestion);
    }
    Ok(())
}
