use std::sync::Arc;

use conduit_api::app;
use conduit_infra::HttpAdapterConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    conduit_observability::init("conduit-http");

    let cfg = HttpAdapterConfig::from_env()?;
    let svc = Arc::new(app::services::adapter_service(&cfg)?);

    let listener = app::bind(cfg.http_port).await?;
    app::serve(listener, app::adapter_app(svc)).await
}
