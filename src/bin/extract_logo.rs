use env_logger::Env;
use log::info;
use menu_media_tools::config::AppConfig;
use menu_media_tools::logo_pipeline;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let (config, _) = AppConfig::load()?;
    let report = logo_pipeline::run(&config.logo)?;

    info!(
        "Logo region {}{}, {}x{}",
        report.region,
        if report.region_estimated { " (estimated)" } else { "" },
        report.logo_size.0,
        report.logo_size.1
    );
    for path in &report.written {
        info!("Created {}", path.display());
    }
    Ok(())
}
