use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::{
    error::ApiError,
    http::{ApiRequest, Transport},
    poll::{PollOutcome, PollSchedule, poll_until},
};

pub mod query;

pub use query::{TOP_TALKERS, build_query_expression};

/// The id the console hands back when it accepts a search.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchId(pub String);

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SearchStatus {
    Completed,
    Error,
    Canceled,
    /// `WAIT`, `EXECUTE`, `SORTING` or anything else we don't know about.
    Other(String),
}

impl From<&str> for SearchStatus {
    fn from(status: &str) -> Self {
        match status {
            "COMPLETED" => SearchStatus::Completed,
            "ERROR" => SearchStatus::Error,
            "CANCELED" => SearchStatus::Canceled,
            other => SearchStatus::Other(other.to_string()),
        }
    }
}

impl SearchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchStatus::Other(_))
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum SearchState {
    Completed,
    Failed(SearchStatus),
    TimedOut,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub flows: Vec<FlowRecord>,
}

#[derive(Debug, Deserialize)]
pub struct FlowRecord {
    pub sourceip: Option<String>,
    /// Every other selected column.
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

#[derive(Deserialize)]
struct ResultsBody {
    flows: Option<Vec<FlowRecord>>,
}

#[derive(Deserialize)]
struct StatusBody {
    status: Option<String>,
}

/// Submit the query. Returns `None` (and logs why) if the console didn't
/// accept it.
pub async fn start_search(transport: &impl Transport, query_expression: &str) -> Option<SearchId> {
    let request =
        ApiRequest::post("/api/ariel/searches").query("query_expression", query_expression);

    let res = async {
        #[derive(Deserialize)]
        struct Started {
            search_id: Option<Value>,
        }

        let started: Started = transport.send(request).await?.json()?;
        match started.search_id {
            Some(Value::String(id)) => Ok(SearchId(id)),
            Some(Value::Null) | None => Err(ApiError::MissingField("search_id")),
            Some(other) => Ok(SearchId(other.to_string())),
        }
    }
    .await;

    match res {
        Ok(search_id) => {
            info!("Search started successfully. Search ID: {search_id}");
            Some(search_id)
        }
        Err(err) => {
            error!("Failed to start search. {err}");
            None
        }
    }
}

/// Ask for the status of a search. `None` means we couldn't tell, which the
/// poller treats the same as still running.
pub async fn check_search_status(
    transport: &impl Transport,
    search_id: &SearchId,
) -> Option<SearchStatus> {
    let request = ApiRequest::get(format!("/api/ariel/searches/{search_id}"));

    let res = async {
        let body: StatusBody = transport.send(request).await?.json()?;
        body.status.ok_or(ApiError::MissingField("status"))
    }
    .await;

    match res {
        Ok(status) => {
            info!("Search {search_id} status: {status}");
            Some(SearchStatus::from(status.as_str()))
        }
        Err(err) => {
            error!("Failed to check status of search {search_id}. {err}");
            None
        }
    }
}

/// Poll the search until it's done, failed, or we've run out of attempts.
pub async fn wait_for_search(
    transport: &impl Transport,
    search_id: &SearchId,
    schedule: PollSchedule,
) -> SearchState {
    let outcome = poll_until(schedule, move |_| async move {
        let status = check_search_status(transport, search_id).await?;
        if status.is_terminal() {
            Some(status)
        } else {
            info!("Waiting for search {search_id} to complete...");
            None
        }
    })
    .await;

    match outcome {
        PollOutcome::Done {
            value: SearchStatus::Completed,
            ..
        } => SearchState::Completed,
        PollOutcome::Done { value, .. } => SearchState::Failed(value),
        PollOutcome::TimedOut => SearchState::TimedOut,
    }
}

/// Fetch the results of a finished search. `None` if the request failed or
/// the body has no `flows` at all. An empty `flows` list still counts.
pub async fn get_search_results(
    transport: &impl Transport,
    search_id: &SearchId,
) -> Option<SearchResults> {
    let request = ApiRequest::get(format!("/api/ariel/searches/{search_id}/results"));

    let res = async {
        let body: ResultsBody = transport.send(request).await?.json()?;
        body.flows
            .map(|flows| SearchResults { flows })
            .ok_or(ApiError::MissingField("flows"))
    }
    .await;

    match res {
        Ok(results) => {
            info!("Search results fetched successfully for Search ID: {search_id}");
            Some(results)
        }
        Err(err) => {
            error!("Failed to fetch results for Search ID: {search_id}. {err}");
            None
        }
    }
}

/// The source IPs of the first `n` flows. The query already sorted them, so
/// the order is kept. Flows without a source IP are skipped.
pub fn top_source_ips(results: &SearchResults, n: usize) -> Vec<String> {
    results
        .flows
        .iter()
        .filter_map(|flow| flow.sourceip.clone())
        .take(n)
        .collect()
}
