use anyhow::Context;
use chicago_houses::utils::error::ErrorSeverity;
use chicago_houses::utils::logger::{self, LogFormat};
use chicago_houses::utils::validation::Validate;
use chicago_houses::{CliConfig, EtlEngine, HousesPipeline};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(LogFormat::from_json_flag(cli.json_logs), cli.verbose);

    tracing::info!("Starting chicago-houses CLI");
    tracing::debug!("CLI args: {:?}", cli);

    let config = cli.into_config().context("failed to load configuration")?;

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.images.enabled {
        tracing::info!(
            "📷 Image retrieval enabled ({}s-{}s between requests)",
            config.images.min_delay_seconds,
            config.images.max_delay_seconds
        );
    }

    let pipeline = HousesPipeline::from_config(config).context("failed to build HTTP clients")?;
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ House lookup completed successfully!");
            println!("✅ House lookup completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!("❌ House lookup failed: {} (Severity: {:?})", e, e.severity());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
