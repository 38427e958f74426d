use std::path::Path;

use colored::Colorize;
use dg_progress::{EngineType, ProgressStore, check_switch, switch_engine};

pub fn run(runtime: &Path, target: EngineType) -> Result<(), String> {
    let store = ProgressStore::new(runtime);
    let record = check_switch(&store).map_err(|refusal| {
        format!("cannot switch: {}", refusal.reason())
    })?;

    if record.engine_type == target {
        println!("  Already running the {target} engine.");
        return Ok(());
    }

    let updated = switch_engine(&store, target).map_err(|e| e.to_string())?;
    println!(
        "  {} {} -> {} at scene {}",
        "Switched".bold(),
        record.engine_type,
        updated.engine_type.to_string().green(),
        updated.current_scene_id
    );
    Ok(())
}
