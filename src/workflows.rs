use tracing::{error, info, warn};

use crate::{
    config::{Config, SearchReadiness},
    http::Transport,
    ips::{load_available_ips, read_ips_from_file},
    output::save_output,
    reference_set::{AddOutcome, add_ips_to_reference_set, empty_reference_set},
    search::{
        SearchState, TOP_TALKERS, build_query_expression, get_search_results, start_search,
        top_source_ips, wait_for_search,
    },
    task::{TaskState, wait_for_task_completion},
};

#[derive(Debug, PartialEq)]
pub enum TopTalkersOutcome {
    /// The IPs were written to both output files.
    Saved(Vec<String>),
    /// The watchlist was empty so no search was started.
    EmptyWatchlist,
    SearchFailed,
    /// The search didn't complete, or the results couldn't be fetched.
    NoResults,
}

/// Find the source IPs sending the most packets to the watchlist and write
/// them out. Only file errors are returned, API failures are logged and end
/// the run early.
pub async fn top_talkers(
    config: &Config,
    transport: &impl Transport,
) -> eyre::Result<TopTalkersOutcome> {
    let search_config = &config.search;

    let ips = load_available_ips(&search_config.input_file)?;
    if ips.is_empty() {
        // `IN ()` is rejected by the query engine anyway
        error!(
            "No IPs in {}, not starting a search.",
            search_config.input_file
        );
        return Ok(TopTalkersOutcome::EmptyWatchlist);
    }
    let query_expression = build_query_expression(&ips);

    info!("Starting search...");
    let Some(search_id) = start_search(transport, &query_expression).await else {
        error!("Search failed. Exiting.");
        return Ok(TopTalkersOutcome::SearchFailed);
    };

    info!("Waiting for results. Search ID: {search_id}");
    tokio::time::sleep(search_config.initial_delay()).await;
    if search_config.readiness == SearchReadiness::Poll {
        match wait_for_search(transport, &search_id, search_config.schedule()).await {
            SearchState::Completed => {}
            SearchState::Failed(status) => {
                error!("Search {search_id} ended with status {status:?}. Exiting.");
                return Ok(TopTalkersOutcome::NoResults);
            }
            SearchState::TimedOut => {
                warn!("Timeout reached. Search {search_id} did not complete within the allowed time.");
                return Ok(TopTalkersOutcome::NoResults);
            }
        }
    }

    let Some(results) = get_search_results(transport, &search_id).await else {
        error!("No results found. Exiting.");
        return Ok(TopTalkersOutcome::NoResults);
    };

    let output = top_source_ips(&results, TOP_TALKERS);
    save_output(
        &output,
        &search_config.json_output,
        &search_config.txt_output,
    )?;

    Ok(TopTalkersOutcome::Saved(output))
}

#[derive(Debug, PartialEq)]
pub enum UpdateOutcome {
    /// The clear failed and `abort_on_clear_failure` is on.
    ClearFailed,
    NothingToAdd,
    AddRejected,
    Task(TaskState),
}

/// Replace the contents of the reference set with the IPs from the input
/// file.
pub async fn update_reference_set(
    config: &Config,
    transport: &impl Transport,
) -> eyre::Result<UpdateOutcome> {
    let set_config = &config.reference_set;
    let collection_id = set_config.collection_id;

    let ips = read_ips_from_file(&set_config.input_file)?;

    if empty_reference_set(transport, collection_id).await.is_err() {
        if set_config.abort_on_clear_failure {
            error!("Not adding IPs to reference set {collection_id} since it couldn't be emptied.");
            return Ok(UpdateOutcome::ClearFailed);
        }
        warn!("Adding IPs to reference set {collection_id} even though it couldn't be emptied.");
    }
    tokio::time::sleep(set_config.clear_settle()).await;

    let task_id = match add_ips_to_reference_set(transport, collection_id, &ips).await {
        AddOutcome::Submitted(task_id) => task_id,
        AddOutcome::NothingToDo => return Ok(UpdateOutcome::NothingToAdd),
        AddOutcome::Rejected => return Ok(UpdateOutcome::AddRejected),
    };

    let state = wait_for_task_completion(transport, &task_id, set_config.schedule()).await;
    Ok(UpdateOutcome::Task(state))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use reqwest::Method;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::testing::ScriptedTransport;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        let path = |name: &str| dir.join(name).to_string_lossy().into_owned();
        config.search.input_file = path("available_ips.json");
        config.search.json_output = path("output.json");
        config.search.txt_output = path("output.txt");
        config.reference_set.input_file = path("available_ips.txt");
        config
    }

    fn search_setup(ips: &str) -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("available_ips.json"), ips).unwrap();
        let config = config_in(dir.path());
        (dir, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_talkers_polls_then_saves() {
        let (dir, config) = search_setup(r#"{"available_ips": ["10.0.0.1","10.0.0.2"]}"#);
        let transport = ScriptedTransport::new()
            .reply(201, json!({ "search_id": "s-1" }))
            .reply(200, json!({ "status": "EXECUTE" }))
            .reply(200, json!({ "status": "COMPLETED" }))
            .reply(
                200,
                json!({ "flows": [{ "sourceip": "192.168.0.7" }, { "sourceip": "192.168.0.9" }] }),
            );

        let outcome = top_talkers(&config, &transport).await.unwrap();
        assert_eq!(
            outcome,
            TopTalkersOutcome::Saved(vec!["192.168.0.7".to_string(), "192.168.0.9".to_string()])
        );

        let requests = transport.requests();
        assert!(
            requests[0].query[0]
                .1
                .contains("IN ('10.0.0.1','10.0.0.2')")
        );
        assert_eq!(requests[1].path, "/api/ariel/searches/s-1");
        assert_eq!(requests[3].path, "/api/ariel/searches/s-1/results");

        assert_eq!(
            fs::read_to_string(dir.path().join("output.txt")).unwrap(),
            "192.168.0.7\n192.168.0.9"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_talkers_fixed_delay_fetches_once() {
        let (_dir, mut config) = search_setup(r#"{"available_ips": ["10.0.0.1"]}"#);
        config.search.readiness = SearchReadiness::FixedDelay;
        let transport = ScriptedTransport::new()
            .reply(201, json!({ "search_id": "s-1" }))
            .reply(200, json!({ "flows": [] }));

        let outcome = top_talkers(&config, &transport).await.unwrap();
        assert_eq!(outcome, TopTalkersOutcome::Saved(vec![]));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::GET);
        assert_eq!(requests[1].path, "/api/ariel/searches/s-1/results");
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_talkers_body_without_flows_keeps_previous_output() {
        let (dir, mut config) = search_setup(r#"{"available_ips": ["10.0.0.1"]}"#);
        config.search.readiness = SearchReadiness::FixedDelay;
        fs::write(dir.path().join("output.txt"), "previous\nrun").unwrap();
        let transport = ScriptedTransport::new()
            .reply(201, json!({ "search_id": "s-1" }))
            .reply(200, json!({}));

        let outcome = top_talkers(&config, &transport).await.unwrap();
        assert_eq!(outcome, TopTalkersOutcome::NoResults);
        assert_eq!(
            fs::read_to_string(dir.path().join("output.txt")).unwrap(),
            "previous\nrun"
        );
        assert!(!dir.path().join("output.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_talkers_stops_without_search_id() {
        let (dir, config) = search_setup(r#"{"available_ips": ["10.0.0.1"]}"#);
        let transport = ScriptedTransport::new().reply(500, json!({ "message": "boom" }));

        let outcome = top_talkers(&config, &transport).await.unwrap();
        assert_eq!(outcome, TopTalkersOutcome::SearchFailed);
        assert_eq!(transport.requests().len(), 1);
        assert!(!dir.path().join("output.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_talkers_stops_on_search_error() {
        let (_dir, config) = search_setup(r#"{"available_ips": ["10.0.0.1"]}"#);
        let transport = ScriptedTransport::new()
            .reply(201, json!({ "search_id": "s-1" }))
            .reply(200, json!({ "status": "CANCELED" }));

        let outcome = top_talkers(&config, &transport).await.unwrap();
        assert_eq!(outcome, TopTalkersOutcome::NoResults);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_talkers_empty_watchlist() {
        let (_dir, config) = search_setup(r#"{"available_ips": []}"#);
        let transport = ScriptedTransport::new();

        let outcome = top_talkers(&config, &transport).await.unwrap();
        assert_eq!(outcome, TopTalkersOutcome::EmptyWatchlist);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_talkers_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let transport = ScriptedTransport::new();

        assert!(top_talkers(&config, &transport).await.is_err());
    }

    fn update_setup(lines: &str) -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("available_ips.txt"), lines).unwrap();
        let config = config_in(dir.path());
        (dir, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_reference_set() {
        let (_dir, config) = update_setup("10.0.0.1\n10.0.0.2\n\n10.0.0.3\n");
        let transport = ScriptedTransport::new()
            .reply(200, json!({ "id": 1000 }))
            .reply(202, json!({ "id": 7 }))
            .reply(200, json!({ "status": "PENDING" }))
            .reply(200, json!({ "status": "COMPLETED" }));

        let outcome = update_reference_set(&config, &transport).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Task(TaskState::Completed));

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[1].body.as_ref().unwrap().as_array().unwrap().len(), 3);
        assert_eq!(
            requests[3].path,
            "/api/reference_data_collections/set_bulk_update_tasks/7"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_continues_after_failed_clear() {
        let (_dir, config) = update_setup("10.0.0.1\n");
        let transport = ScriptedTransport::new()
            .reply(403, json!({ "message": "forbidden" }))
            .reply(202, json!({ "id": 7 }))
            .reply(200, json!({ "status": "FAILED" }));

        let outcome = update_reference_set(&config, &transport).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Task(TaskState::Failed));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_can_abort_after_failed_clear() {
        let (_dir, mut config) = update_setup("10.0.0.1\n");
        config.reference_set.abort_on_clear_failure = true;
        let transport = ScriptedTransport::new().fail("connection refused");

        let outcome = update_reference_set(&config, &transport).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::ClearFailed);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_with_empty_file_only_clears() {
        let (_dir, config) = update_setup("\n   \n");
        let transport = ScriptedTransport::new().reply(200, json!({}));

        let outcome = update_reference_set(&config, &transport).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::NothingToAdd);
        assert_eq!(transport.requests().len(), 1);
    }
}
