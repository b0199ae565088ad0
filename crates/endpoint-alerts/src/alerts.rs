use crate::mappings::RouteMapping;
use crate::PipelineError;
use anyhow::Context;
use std::path::Path;

// Fixed alert contract: every generated definition uses these values.
const ALERT_TYPE: &str = "query alert";
const ALERT_PRIORITY: &str = "normal";
const SERVICE_TAG: &str = "service:my-service";

/// A single alert definition, serialized as one JSON file per route.
/// Field order is the serialized field order.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlertRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub query: String,
    pub message: String,
    pub tags: Vec<String>,
    pub priority: String,
}

impl AlertRecord {
    /// Builds the latency alert definition for a single route mapping.
    /// A mapping without a predicate produces an alert over the empty
    /// endpoint string.
    pub fn for_route(mapping: &RouteMapping) -> Self {
        let endpoint = mapping.predicate.as_deref().unwrap_or_default();

        Self {
            name: format!("Alert for {endpoint}"),
            alert_type: ALERT_TYPE.to_string(),
            query: format!("avg(last_5m):avg:http.endpoint.latency{{endpoint={endpoint}}} > 500"),
            message: format!("High latency detected for {endpoint}"),
            tags: vec![format!("endpoint:{endpoint}"), SERVICE_TAG.to_string()],
            priority: ALERT_PRIORITY.to_string(),
        }
    }
}

/// File stem of a mapping's alert file: the handler up to its `#` method
/// separator, with dots replaced to keep it filesystem-safe.
/// `com.example.Foo#bar` becomes `com_example_Foo`.
pub fn sanitize_handler(handler: &str) -> String {
    let class = handler.split_once('#').map_or(handler, |(class, _)| class);
    class.replace('.', "_")
}

/// Writes one pretty-printed alert file per mapping into `target_dir`,
/// creating the directory as needed. Existing files are overwritten, and
/// mappings whose handlers sanitize to the same stem write to the same
/// file (last write wins).
pub fn generate_alert_files(
    mappings: &[RouteMapping],
    target_dir: &Path,
) -> Result<(), PipelineError> {
    write_alert_files(mappings, target_dir).map_err(PipelineError::Write)
}

fn write_alert_files(mappings: &[RouteMapping], target_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(target_dir)
        .with_context(|| format!("failed to create {}", target_dir.display()))?;

    for mapping in mappings {
        let record = AlertRecord::for_route(mapping);
        let path = target_dir.join(format!("{}.json", sanitize_handler(&mapping.handler)));

        let mut content = serde_json::to_vec_pretty(&record)
            .context("failed to serialize alert definition")?;
        content.push(b'\n');

        std::fs::write(&path, &content)
            .with_context(|| format!("failed to write {}", path.display()))?;

        tracing::info!(path = %path.display(), "wrote alert definition");
    }

    Ok(())
}
