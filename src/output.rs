use std::{fs, path::Path};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::info;

#[derive(Serialize)]
struct Output<'a> {
    output: &'a [String],
}

/// Write the IPs as `{"output": [...]}` and as plain lines. Both files are
/// overwritten, and any write error is returned as-is.
pub fn save_output(
    output: &[String],
    json_path: impl AsRef<Path>,
    txt_path: impl AsRef<Path>,
) -> eyre::Result<()> {
    let (json_path, txt_path) = (json_path.as_ref(), txt_path.as_ref());

    fs::write(json_path, to_json(output)?)?;
    fs::write(txt_path, output.join("\n"))?;

    info!("{}", saved_message(output.len(), json_path, txt_path));
    Ok(())
}

fn saved_message(count: usize, json_path: &Path, txt_path: &Path) -> String {
    format!(
        "Saved {count} source IPs to {} and {}",
        json_path.display(),
        txt_path.display()
    )
}

fn to_json(output: &[String]) -> eyre::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    Output { output }.serialize(&mut ser)?;
    Ok(buf)
}
