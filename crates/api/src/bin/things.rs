use std::sync::Arc;

use conduit_api::app;
use conduit_infra::ThingsConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    conduit_observability::init("conduit-things");

    let cfg = ThingsConfig::from_env()?;
    let svc = Arc::new(app::services::things_service(&cfg)?);

    let public = app::bind(cfg.http_port).await?;
    let internal = app::bind(cfg.rpc_port).await?;

    tokio::try_join!(
        app::serve(public, app::things_app(svc.clone())),
        app::serve(internal, app::things_rpc_app(svc)),
    )?;
    Ok(())
}
