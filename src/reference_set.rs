use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{
    error::ApiError,
    http::{ApiRequest, Transport},
    task::TaskId,
};

#[derive(Debug, Eq, PartialEq)]
pub enum AddOutcome {
    /// The list was empty, so no request was sent.
    NothingToDo,
    /// The console accepted the entries and is adding them in the background.
    Submitted(TaskId),
    /// The request failed. The reason has already been logged.
    Rejected,
}

/// Delete every entry in the reference set. The outcome is logged either way,
/// whether to carry on after a failure is up to the caller.
pub async fn empty_reference_set(
    transport: &impl Transport,
    collection_id: u64,
) -> Result<(), ApiError> {
    let request = ApiRequest::post(format!("/api/reference_data_collections/sets/{collection_id}"))
        .json(json!({ "delete_entries": true }));

    let res = async { transport.send(request).await?.ok() }.await;

    match &res {
        Ok(()) => info!("Emptied the reference set {collection_id}."),
        Err(err) => error!("Failed to empty reference set {collection_id}: {err}"),
    }
    res
}

/// One `{collection_id, value}` entry per IP, in order.
pub fn build_entries(collection_id: u64, ips: &[String]) -> Vec<Value> {
    ips.iter()
        .map(|ip| json!({ "collection_id": collection_id, "value": ip }))
        .collect()
}

/// Add all the IPs in one bulk request.
pub async fn add_ips_to_reference_set(
    transport: &impl Transport,
    collection_id: u64,
    ips: &[String],
) -> AddOutcome {
    if ips.is_empty() {
        info!("No IPs to add.");
        return AddOutcome::NothingToDo;
    }

    let entries = build_entries(collection_id, ips);
    let request =
        ApiRequest::patch("/api/reference_data_collections/set_entries").json(Value::Array(entries));

    let res = async {
        #[derive(Deserialize)]
        struct Submitted {
            id: Option<Value>,
        }

        let submitted: Submitted = transport.send(request).await?.json()?;
        submitted
            .id
            .and_then(TaskId::from_json)
            .ok_or(ApiError::MissingField("id"))
    }
    .await;

    match res {
        Ok(task_id) => {
            info!(
                "Added {} IPs to the reference set {collection_id}.",
                ips.len()
            );
            info!("Task ID for add IPs to reference set: {task_id}");
            AddOutcome::Submitted(task_id)
        }
        Err(err) => {
            error!("Failed to add IPs: {err}");
            AddOutcome::Rejected
        }
    }
}
