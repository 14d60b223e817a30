use anyhow::Result;
use cat_emotion::{
    config::{Config, FeatureConfig},
    emotion::LabelSetKind,
    web::{serve, ui::ThemePreset},
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cat-emotion")]
#[command(about = "Cat emotion recognition from photos and sounds")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:5005")]
    bind: String,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Model directory path
    #[arg(long, default_value = "models")]
    models_dir: String,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Upload page color preset
    #[arg(long, value_enum, default_value_t = ThemePreset::Midnight)]
    theme: ThemePreset,

    /// Edge length images are resized to
    #[arg(long, default_value_t = 224)]
    image_size: u32,

    /// Audio is resampled to this rate before MFCC extraction
    #[arg(long, default_value_t = 16000)]
    sample_rate: u32,

    /// Number of MFCC coefficients fed to the audio model
    #[arg(long, default_value_t = 40)]
    n_mfcc: usize,

    /// Only analyse the first N seconds of each clip
    #[arg(long)]
    max_audio_seconds: Option<f32>,

    /// Label set the image model was trained on
    #[arg(long, value_enum, default_value_t = LabelSetKind::Image7)]
    image_labels: LabelSetKind,

    /// Label set the audio model was trained on
    #[arg(long, value_enum, default_value_t = LabelSetKind::Audio10)]
    audio_labels: LabelSetKind,

    /// Per-request analysis timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting cat emotion service...");
    tracing::info!("Bind address: {}", args.bind);
    tracing::info!("Models directory: {}", args.models_dir);

    // 创建配置
    let features = FeatureConfig {
        image_size: args.image_size,
        sample_rate: args.sample_rate,
        n_mfcc: args.n_mfcc,
        max_audio_seconds: args.max_audio_seconds,
        image_labels: args.image_labels,
        audio_labels: args.audio_labels,
    };

    let mut config = Config::new(args.bind, args.models_dir, args.workers, args.dev)?
        .with_features(features)?
        .with_theme(args.theme);
    if let Some(seconds) = args.timeout {
        config = config.with_inference_timeout(seconds)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()?;

    // 启动服务器
    runtime.block_on(serve(config))?;

    Ok(())
}
