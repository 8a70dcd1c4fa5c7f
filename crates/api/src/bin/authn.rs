use std::sync::Arc;

use conduit_api::app;
use conduit_infra::AuthnConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    conduit_observability::init("conduit-authn");

    let cfg = AuthnConfig::from_env()?;
    if cfg.secret == "authn" {
        tracing::warn!("CONDUIT_AUTHN_SECRET not set; using insecure dev default");
    }

    let svc = Arc::new(app::services::authn_service(&cfg)?);

    let public = app::bind(cfg.http_port).await?;
    let internal = app::bind(cfg.rpc_port).await?;

    tokio::try_join!(
        app::serve(public, app::authn_app(svc.clone())),
        app::serve(internal, app::authn_rpc_app(svc)),
    )?;
    Ok(())
}
