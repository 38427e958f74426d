use std::path::Path;

use comfy_table::{ContentArrangement, Table};

pub fn run(file: &Path) -> Result<(), String> {
    let story = super::load_story(file)?;

    let title = if story.title.is_empty() {
        "untitled"
    } else {
        story.title.as_str()
    };
    println!("  All checks passed for '{title}'.");
    println!("  {} acts, {} events", story.acts.len(), story.events.len());
    println!();

    let mut acts = Table::new();
    acts.set_content_arrangement(ContentArrangement::Dynamic);
    acts.set_header(vec!["Act", "Name", "Max turns", "Completion", "Failure"]);
    for act in &story.acts {
        let objective = &act.objective;
        acts.add_row(vec![
            act.number.to_string(),
            act.name.clone(),
            objective.max_turns.to_string(),
            describe(objective.completion_conditions.iter().map(|c| c.kind())),
            describe(objective.failure_conditions.iter().map(|c| c.kind())),
        ]);
    }
    println!("{acts}");

    if !story.events.is_empty() {
        let mut events = Table::new();
        events.set_content_arrangement(ContentArrangement::Dynamic);
        events.set_header(vec!["Event", "Trigger", "Priority", "Effects"]);
        for event in &story.events {
            events.add_row(vec![
                event.id.clone(),
                event.trigger.kind_name().to_string(),
                event.priority.to_string(),
                event.effects.len().to_string(),
            ]);
        }
        println!("{events}");
    }

    Ok(())
}

fn describe<'a>(kinds: impl Iterator<Item = &'a str>) -> String {
    let kinds: Vec<&str> = kinds.collect();
    if kinds.is_empty() {
        "-".to_string()
    } else {
        kinds.join(", ")
    }
}
