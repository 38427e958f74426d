use std::io::{self, BufRead, Write};
use std::path::Path;

use colored::Colorize;
use dg_progress::EngineType;
use dg_session::{Session, SessionConfig, SessionStatus, TemplateGenerators, TurnResult};

pub fn run(
    runtime: &Path,
    story: &Path,
    engine: Option<EngineType>,
    resume: bool,
    seed: u64,
) -> Result<(), String> {
    let story = super::load_story(story)?;
    let mut config = SessionConfig::new(runtime).with_seed(seed);
    if let Some(engine) = engine {
        config = config.with_engine(engine);
    }

    let mut session = Session::new(config, story, TemplateGenerators::bundle())
        .map_err(|e| format!("failed to create session: {e}"))?;

    let opening = if resume {
        session.resume().map_err(|e| format!("cannot resume: {e}"))?
    } else {
        session.start().map_err(|e| e.to_string())?
    };
    println!("{opening}");
    println!(
        "  Engine: {} | Seed: {seed}",
        session.engine().to_string().bold()
    );
    println!("  Try: {}", session.get_action_suggestions().join(" | "));
    println!("  Commands: /status, /save NAME, /checkpoint NAME, /quit\n");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // EOF
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let (verb, name) = match command.split_once(' ') {
                Some((verb, name)) => (verb, name.trim()),
                None => (command, "manual"),
            };
            match verb {
                "quit" | "q" => break,
                "status" => print_status(&session.get_status()),
                "save" | "checkpoint" => match session.save(name, verb == "checkpoint") {
                    Ok(path) => println!("  Saved '{name}' to {}\n", path.display()),
                    Err(e) => println!("{}\n", e.to_string().yellow()),
                },
                other => println!("{}\n", format!("unknown command: /{other}").yellow()),
            }
            continue;
        }

        match rt.block_on(session.process_turn(input)) {
            Ok(result) => print_turn(&result),
            Err(e) => println!("{}\n", e.to_string().yellow()),
        }
    }

    session.close();
    println!("  Goodbye after {} turns.", session.turn_count());
    Ok(())
}

fn print_turn(result: &TurnResult) {
    if !result.text.is_empty() {
        println!("{}", result.text);
    }
    for warning in &result.warnings {
        println!("  {}", warning.dimmed());
    }
    if let Some(error) = &result.error {
        println!("  {}", error.red());
    }
    if result.boundary {
        println!("  {}", format!("-- scene {} --", result.scene_id).cyan());
    }
    println!();
}

fn print_status(status: &SessionStatus) {
    println!(
        "  {} {}: {} ({:.0}%)",
        "Act".bold(),
        status.act_number,
        status.act_name,
        status.progress * 100.0
    );
    println!("  Scene {} | Turn {}", status.scene_id, status.turn_id);
    if let Some(location) = &status.location {
        println!("  Location: {location}");
    }
    if let Some(time) = &status.current_time {
        println!("  Time: {time}");
    }
    if !status.present_npcs.is_empty() {
        println!("  Here: {}", status.present_npcs.join(", "));
    }
    println!("  Engine: {}\n", status.engine);
}
