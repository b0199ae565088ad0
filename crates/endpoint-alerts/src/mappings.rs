use crate::{FetchFn, PipelineError};
use anyhow::Context;

/// One discovered HTTP route, as reported by the introspection endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RouteMapping {
    /// Route pattern, such as `/users/{id}`. Some infrastructure routes
    /// report no predicate.
    pub predicate: Option<String>,
    /// Fully-qualified handler reference, such as
    /// `com.example.UserController#getUser`.
    pub handler: String,
}

// The introspection response nests its route list several levels deep.
// Unknown sibling fields at every level are ignored.
#[derive(Debug, serde::Deserialize)]
struct MappingsResponse {
    contexts: Contexts,
}

#[derive(Debug, serde::Deserialize)]
struct Contexts {
    application: ApplicationContext,
}

#[derive(Debug, serde::Deserialize)]
struct ApplicationContext {
    mappings: Mappings,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Mappings {
    dispatcher_servlets: DispatcherServlets,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct DispatcherServlets {
    dispatcher_servlet: Vec<RouteMapping>,
}

/// Fetches the introspection endpoint and extracts its route mappings,
/// preserving server order.
pub async fn fetch_route_mappings(
    fetch: &FetchFn,
    url: url::Url,
) -> Result<Vec<RouteMapping>, PipelineError> {
    let body = (fetch)(url.clone()).await.map_err(PipelineError::Fetch)?;
    let mappings = parse_route_mappings(&body).map_err(PipelineError::Fetch)?;

    tracing::info!(count = mappings.len(), %url, "fetched route mappings");

    Ok(mappings)
}

fn parse_route_mappings(body: &[u8]) -> anyhow::Result<Vec<RouteMapping>> {
    let response: MappingsResponse =
        serde_json::from_slice(body).context("failed to parse route mappings response")?;

    Ok(response
        .contexts
        .application
        .mappings
        .dispatcher_servlets
        .dispatcher_servlet)
}
