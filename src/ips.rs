use std::{fs, path::Path};

use serde::Deserialize;

#[derive(Deserialize)]
struct AvailableIps {
    #[serde(default)]
    available_ips: Vec<String>,
}

/// Load the `available_ips` array from a JSON file. A file without that key is
/// an empty list.
pub fn load_available_ips(path: impl AsRef<Path>) -> eyre::Result<Vec<String>> {
    let input = fs::read_to_string(path)?;

    parse_available_ips(&input)
}

fn parse_available_ips(input: &str) -> eyre::Result<Vec<String>> {
    let file: AvailableIps = serde_json::from_str(input)?;
    Ok(file.available_ips)
}

/// Load one IP per line, trimming whitespace and skipping blank lines.
pub fn read_ips_from_file(path: impl AsRef<Path>) -> eyre::Result<Vec<String>> {
    let input = fs::read_to_string(path)?;

    Ok(parse_lines(&input))
}

fn parse_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
