//! info and info_json commands.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use handbook::persist::{list_snapshots, load_compressed, PersistedSnapshot};

use super::{CliError, InfoArgs};

fn age_hours(created_at: u64) -> f64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    now.saturating_sub(created_at) as f64 / 3600.0
}

pub fn cmd_info(args: &InfoArgs) -> Result<(), CliError> {
    let dir = args.cache.index_base();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&cmd_info_json(&dir))?);
        return Ok(());
    }

    if !dir.exists() {
        eprintln!("No snapshots found. Use 'handbook index -d <dir>' to create one.");
        return Ok(());
    }
    eprintln!("Snapshot directory: {}", dir.display());
    eprintln!();

    let files = list_snapshots(&dir);
    if files.is_empty() {
        eprintln!("No snapshots found.");
        return Ok(());
    }
    for file in files {
        let filename = Path::new(&file.path).file_name().and_then(|f| f.to_str()).unwrap_or("?");
        match load_compressed::<PersistedSnapshot>(Path::new(&file.path)) {
            Ok(snap) => {
                let orphaned = if Path::new(&snap.root).exists() { "" } else { " [ORPHANED]" };
                println!(
                    "  {} -- {} documents, {} terms, {:.1} MB, {:.1}h ago{} ({})",
                    snap.root,
                    snap.documents.len(),
                    snap.index.term_count(),
                    file.size_bytes as f64 / 1_048_576.0,
                    age_hours(snap.created_at),
                    orphaned,
                    filename
                );
            }
            Err(e) => eprintln!("  Warning: failed to load {}: {}", file.path, e),
        }
    }
    Ok(())
}

/// Cached snapshot listing as JSON (also embedded in `handbook_info`).
pub fn cmd_info_json(dir: &Path) -> Value {
    let snapshots: Vec<Value> = list_snapshots(dir)
        .into_iter()
        .map(|file| match load_compressed::<PersistedSnapshot>(Path::new(&file.path)) {
            Ok(snap) => json!({
                "root": snap.root,
                "file": file.path,
                "documents": snap.documents.len(),
                "terms": snap.index.term_count(),
                "sizeMb": (file.size_bytes as f64 / 1_048_576.0 * 10.0).round() / 10.0,
                "ageHours": (age_hours(snap.created_at) * 10.0).round() / 10.0,
                "orphaned": !Path::new(&snap.root).exists(),
            }),
            Err(e) => json!({ "file": file.path, "error": e.to_string() }),
        })
        .collect();

    json!({
        "directory": dir.display().to_string(),
        "snapshots": snapshots,
    })
}
