use std::net::SocketAddr;
use std::sync::Arc;

pub mod catalog;
pub mod config;
pub mod handlers;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod pages;
pub mod pipeline;
pub mod utils;

use catalog::ClassOrder;
use config::Config;
use model::TensorflowModel;
use notify::LineNotifier;
use pipeline::{AppContext, Variant};
use utils::{ensure_class_list_exists, ensure_model_exists};

/// Loads configuration and the model, then serves until the process exits.
pub async fn run(variant: Variant) -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;
    let token = config.github_token.as_deref();

    ensure_model_exists(&config.model_path, config.model_url.as_deref(), token).await?;
    let classes = if ensure_class_list_exists(
        &config.class_list_path,
        config.class_list_url.as_deref(),
        token,
    )
    .await?
    {
        ClassOrder::parse(&tokio::fs::read_to_string(&config.class_list_path).await?)?
    } else {
        log::warn!(
            "{} not found, using the built-in class order",
            config.class_list_path.display()
        );
        ClassOrder::default()
    };

    tokio::fs::create_dir_all(config.upload_dir()).await?;

    if config.base_url.is_empty() {
        log::warn!("BASE_URL is not set, pushed image links will not resolve");
    }
    if config.recipient.is_none() {
        log::warn!("USER_ID is not set, push notifications are disabled");
    }

    let model = TensorflowModel::new(
        &config.model_path,
        classes,
        &config.input_op,
        &config.output_op,
    )?;
    let notifier = LineNotifier::new(
        &config.line_api_base,
        config.access_token.as_deref().unwrap_or_default(),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let ctx = Arc::new(AppContext {
        config,
        variant,
        classifier: Arc::new(model),
        notifier: Arc::new(notifier),
    });
    let app = handlers::router(ctx);

    log::info!("Listening on http://{} ({:?} variant)", addr, variant);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
