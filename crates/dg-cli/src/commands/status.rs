use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use dg_progress::{ProgressStore, check_switch};

pub fn run(runtime: &Path, json: bool) -> Result<(), String> {
    let store = ProgressStore::new(runtime);
    if !store.exists() {
        return Err(format!("no progress at {}", store.path().display()));
    }

    let record = store.load();
    if record.corrupted {
        let backup = record
            .quarantined_to
            .as_ref()
            .map_or_else(|| "not moved".to_string(), |p| p.display().to_string());
        return Err(format!("progress.json corrupted (backup: {backup})"));
    }

    if json {
        let text = serde_json::to_string_pretty(&record).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    let switch = match check_switch(&store) {
        Ok(_) => "allowed".green().to_string(),
        Err(refusal) => refusal.reason().yellow().to_string(),
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Scene".to_string(), record.current_scene_id.to_string()]);
    table.add_row(vec!["Next scene".to_string(), record.next_scene_id.to_string()]);
    table.add_row(vec!["Turns".to_string(), record.turn_count.to_string()]);
    table.add_row(vec!["Engine".to_string(), record.engine_type.to_string()]);
    table.add_row(vec!["Engine switch".to_string(), switch]);
    table.add_row(vec!["Format".to_string(), format!("v{}", record.format_version)]);
    table.add_row(vec![
        "Updated".to_string(),
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ]);

    println!("{table}");
    Ok(())
}
