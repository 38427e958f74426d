pub mod check;
pub mod play;
pub mod status;
pub mod switch;

use std::path::Path;

use dg_conductor::StoryDefinition;

/// Load a story file, mapping failures to a printable message.
fn load_story(path: &Path) -> Result<StoryDefinition, String> {
    StoryDefinition::load(path).map_err(|e| e.to_string())
}
