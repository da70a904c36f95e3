use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::info;

use dermascan::server::{self, AppState, ServiceInfo};
use dermascan::{BuiltinBackbone, Classifier, ModelManager, ReferenceTable};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Fine-tuned classification head checkpoint
    #[arg(long, default_value = "data/classifier_head.safetensors")]
    checkpoint: PathBuf,

    /// Diagnosis reference table (CSV, one row per class index)
    #[arg(long, default_value = "data/skin_conditions.csv")]
    table: PathBuf,

    /// Force a fresh download of the backbone files
    #[arg(short, long)]
    fresh: bool,
}

/// Relative paths resolve against the executable's directory, so the service
/// finds its data files regardless of the working directory it was launched
/// from. Falls back to the path as given when nothing exists there.
fn resolve_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(path)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let backbone = BuiltinBackbone::Dinov2Base;

    let manager = ModelManager::new_default()?;
    if args.fresh {
        info!("Fresh download requested - removing any existing backbone files...");
        manager.remove_download(backbone)?;
    }
    manager.ensure_backbone_downloaded(backbone).await?;

    let checkpoint = resolve_path(&args.checkpoint);
    let table_path = resolve_path(&args.table);

    info!("Building classifier...");
    let classifier = Classifier::builder()
        .with_backbone(backbone)?
        .with_checkpoint(&checkpoint.to_string_lossy())?
        .build()?;

    let table = ReferenceTable::load(&table_path)?;
    if table.len() != classifier.num_classes() {
        anyhow::bail!(
            "Reference table at {:?} has {} rows but the classifier outputs {} classes; \
             row order must match the model's label space exactly",
            table_path,
            table.len(),
            classifier.num_classes()
        );
    }

    let classifier_info = classifier.info();
    let state = web::Data::new(AppState {
        info: ServiceInfo {
            backbone: classifier_info.backbone,
            num_classes: classifier_info.num_classes,
            embedding_size: classifier_info.embedding_size,
            table_rows: table.len(),
        },
        predictor: Arc::new(classifier),
        table: Arc::new(table),
    });

    let bind_address = format!("{}:{}", args.host, args.port);
    info!("Serving {} classes on http://{}", state.info.num_classes, bind_address);
    info!("   POST /predict - multipart image classification");
    info!("   GET  /health  - liveness check");
    info!("   GET  /info    - model and table metadata");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(server::cors())
            .app_data(state.clone())
            .configure(server::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
