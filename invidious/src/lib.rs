//! Client for the [Invidious](https://invidious.io) API.
//!
//! See [`invidious_api`] for the views and the client itself; [`connect`] is the quickest way
//! to get a working [`InvidiousClient`].

use eyre::Context;

pub mod config;
pub mod error;
pub mod invidious_api;

pub use config::ClientConfig;
pub use error::Error;
pub use invidious_api::{
    Instance, InstanceSelector, InvidiousClient, ReqwestTransport, SelectionCriteria, Transport,
    VideoRef,
};

/// Builds a client as described by `config`.
///
/// With a fixed `instance` the directory is never consulted. Otherwise an instance is
/// chosen from the directory, and onion instances get a transport that goes through the
/// local Tor proxy.
pub async fn connect(config: &ClientConfig) -> eyre::Result<InvidiousClient> {
    let transport =
        ReqwestTransport::with_user_agent(&config.user_agent).context("build HTTP client")?;

    let instance_url = match &config.instance {
        Some(url) => url.clone(),
        None => {
            let instance = discover(transport.clone(), config).await?;
            let Some(uri) = instance.uri() else {
                eyre::bail!("chosen instance {:?} has no uri", instance.host());
            };
            uri.to_string()
        }
    };

    let transport = if is_onion_url(&instance_url) {
        tracing::info!(%instance_url, "routing through Tor");
        ReqwestTransport::onion(&config.user_agent).context("build Tor HTTP client")?
    } else {
        transport
    };

    Ok(InvidiousClient::new(transport, &instance_url)
        .with_additional_parameters(config.additional_parameters.clone()))
}

/// Like [`connect`], but over the given transport (no Tor routing is set up).
pub async fn connect_with<T>(transport: T, config: &ClientConfig) -> eyre::Result<InvidiousClient<T>>
where
    T: Transport + Clone,
{
    let selector = InstanceSelector::new(transport).with_directory_url(&config.directory_url);
    connect_with_selector(&selector, config).await
}

/// Like [`connect_with`], but chooses through a long-lived `selector` so repeated calls
/// reuse its memoized choices. The selector's own directory URL is used.
pub async fn connect_with_selector<T>(
    selector: &InstanceSelector<T>,
    config: &ClientConfig,
) -> eyre::Result<InvidiousClient<T>>
where
    T: Transport + Clone,
{
    let transport = selector.transport().clone();
    let client = match &config.instance {
        Some(url) => InvidiousClient::new(transport, url),
        None => {
            let instance = discover_with(selector, config).await?;
            InvidiousClient::for_instance(transport, &instance)?
        }
    };
    Ok(client.with_additional_parameters(config.additional_parameters.clone()))
}

/// Chooses an instance from the directory, failing if none matches.
///
/// Each call uses a fresh selector; see [`discover_with`] to reuse memoized choices.
pub async fn discover<T: Transport>(transport: T, config: &ClientConfig) -> eyre::Result<Instance> {
    let selector = InstanceSelector::new(transport).with_directory_url(&config.directory_url);
    discover_with(&selector, config).await
}

/// Chooses an instance through `selector`, failing if none matches.
pub async fn discover_with<T: Transport>(
    selector: &InstanceSelector<T>,
    config: &ClientConfig,
) -> eyre::Result<Instance> {
    let criteria = config.criteria();
    match selector
        .choose_instance(&criteria)
        .await
        .context("choose an Invidious instance")?
    {
        Some(instance) => {
            tracing::info!(host = ?instance.host(), uri = ?instance.uri(), "using instance");
            Ok(instance)
        }
        None => eyre::bail!("no Invidious instance matches {criteria:?}"),
    }
}

fn is_onion_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.ends_with(".onion")))
        .unwrap_or(false)
}
