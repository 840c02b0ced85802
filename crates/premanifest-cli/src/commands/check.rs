use super::{json_pretty, EXIT_SUCCESS};
use premanifest_schema::{parse_descriptor_file, DirectiveKind};
use std::path::Path;

/// Parse a descriptor without running any collaborator.
pub fn run(conf: &Path, json_output: bool) -> Result<u8, String> {
    let descriptor = parse_descriptor_file(conf).map_err(|e| format!("descriptor error: {e}"))?;
    let counts: Vec<(DirectiveKind, usize)> = DirectiveKind::ALL
        .into_iter()
        .map(|kind| (kind, descriptor.count(kind)))
        .filter(|(_, n)| *n > 0)
        .collect();

    if json_output {
        let payload = serde_json::json!({
            "file": descriptor.file,
            "directives": descriptor.directives.len(),
            "counts": counts
                .iter()
                .map(|(kind, n)| (kind.keyword().to_owned(), serde_json::json!(n)))
                .collect::<serde_json::Map<_, _>>(),
            "status": "ok",
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{}: {} directives OK",
            descriptor.file,
            descriptor.directives.len()
        );
        for (kind, n) in counts {
            println!("  {:<13}{n}", kind.keyword());
        }
    }
    Ok(EXIT_SUCCESS)
}
