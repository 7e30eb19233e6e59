use env_logger::Env;
use log::{error, info};
use menu_media_tools::api_client::ApiClient;
use menu_media_tools::config::AppConfig;
use menu_media_tools::image_source::StockPhotoSource;
use menu_media_tools::promotions::load_drafts;
use menu_media_tools::seeder::Seeder;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let (config, _) = AppConfig::load()?;
    info!("🚀 Seeding media against {}", config.api.endpoint);

    let store = Arc::new(ApiClient::new(&config.api)?);
    let source = Arc::new(StockPhotoSource::new(config.image_source.clone()));
    let seeder = Seeder::new(store, source, config.seeding.clone());

    let drafts = match &config.seeding.promotion_seed_path {
        Some(path) => load_drafts(path)?,
        None => Vec::new(),
    };
    let report = seeder.run(&drafts).await;

    if !drafts.is_empty() {
        info!(
            "📊 Promotions: {} created, {} skipped, {} failed",
            report.promotions.created, report.promotions.skipped, report.promotions.failed
        );
    }
    for (kind, outcome) in &report.images {
        match outcome {
            Ok(seeded) => info!(
                "📊 {}s: {} total, {} updated, {} skipped, {} failed",
                kind, seeded.total, seeded.updated, seeded.skipped, seeded.failed
            ),
            Err(e) => error!("❌ Could not seed {} images: {}", kind, e),
        }
    }

    info!("🎉 Done!");
    Ok(())
}
