use env_logger::Env;
use log::info;
use menu_media_tools::config::AppConfig;
use menu_media_tools::logo_pipeline;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let (config, _) = AppConfig::load()?;
    let (width, height) = logo_pipeline::run_pad(&config.pad)?;
    info!(
        "Created padded logo at: {} ({}x{})",
        config.pad.output_path.display(),
        width,
        height
    );
    Ok(())
}
