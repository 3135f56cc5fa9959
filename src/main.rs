use std::{env, path::Path, process::ExitCode};

use arielops::{
    config::Config,
    http::RestClient,
    tracing::init_tracing,
    workflows::{self, TopTalkersOutcome, UpdateOutcome},
};
use dotenv::dotenv;
use tracing::info;

const USAGE: &str = "usage: arielops <top-talkers|update-reference-set> [config.toml]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<ExitCode> {
    dotenv().ok();

    let args = env::args().collect::<Box<[String]>>();
    let Some(workflow) = args.get(1) else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::FAILURE);
    };

    // second command line argument is the location of the config file
    let config_file = args.get(2).cloned().unwrap_or("config.toml".to_string());
    let config_file_path = Path::new(&config_file);
    if config_file_path.exists() {
        println!("parsing config at {}", config_file_path.display());
    } else {
        println!("no config at {}, using defaults", config_file_path.display());
    }
    let config = Config::load(config_file_path)?;

    init_tracing(&config);
    info!("Logging initialized");

    let client = RestClient::new(&config.api)?;

    match workflow.as_str() {
        "top-talkers" => match workflows::top_talkers(&config, &client).await? {
            TopTalkersOutcome::Saved(ips) => println!(
                "saved {} source ips to {} and {}",
                ips.len(),
                config.search.json_output,
                config.search.txt_output
            ),
            outcome => println!("finished without output: {outcome:?}"),
        },
        "update-reference-set" => {
            let outcome = workflows::update_reference_set(&config, &client).await?;
            match outcome {
                UpdateOutcome::Task(state) => println!(
                    "reference set {} update task ended as {state:?}",
                    config.reference_set.collection_id
                ),
                outcome => println!("reference set not updated: {outcome:?}"),
            }
        }
        other => {
            eprintln!("unknown workflow {other:?}\n{USAGE}");
            return Ok(ExitCode::FAILURE);
        }
    }

    println!("done");
    Ok(ExitCode::SUCCESS)
}
