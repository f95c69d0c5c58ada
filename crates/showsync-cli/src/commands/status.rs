use crate::output::{Output, OutputFormat};
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use showsync_config::{PathManager, StateStore};
use showsync_models::{EntityFamily, Provider};

const CLOUD_FAMILIES: [EntityFamily; 4] = [
    EntityFamily::Episodes,
    EntityFamily::Shows,
    EntityFamily::Movies,
    EntityFamily::Lists,
];

const SOCIAL_FAMILIES: [EntityFamily; 10] = [
    EntityFamily::EpisodesWatched,
    EntityFamily::EpisodesCollected,
    EntityFamily::EpisodeRatings,
    EntityFamily::ShowRatings,
    EntityFamily::Movies,
    EntityFamily::MoviesCollection,
    EntityFamily::MoviesWatchlist,
    EntityFamily::MoviesWatched,
    EntityFamily::MovieRatings,
    EntityFamily::Notes,
];

fn families(provider: Provider) -> &'static [EntityFamily] {
    match provider {
        Provider::Cloud => &CLOUD_FAMILIES,
        Provider::Social => &SOCIAL_FAMILIES,
    }
}

pub fn run_status(output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let mut state = StateStore::new(paths.state_file());
    state
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load state from {}: {}", paths.state_file().display(), e))?;

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(vec![
                Cell::new("Provider").add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Family").add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Last sync").add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Merged").add_attribute(comfy_table::Attribute::Bold),
            ]);
            for provider in [Provider::Cloud, Provider::Social] {
                for &family in families(provider) {
                    let checkpoint = state.checkpoint(provider, family);
                    table.add_row(vec![
                        Cell::new(provider.as_str()),
                        Cell::new(family.as_str()),
                        Cell::new(
                            checkpoint
                                .last_sync
                                .map(|t| t.to_rfc3339())
                                .unwrap_or_else(|| "never".to_string()),
                        ),
                        Cell::new(if checkpoint.merged { "✓".green().to_string() } else { "✗".red().to_string() }),
                    ]);
                }
            }
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", table);

            let mut backoff = Table::new();
            backoff.set_header(vec![
                Cell::new("Back-off").fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold),
            ]);
            backoff.add_row(vec![Cell::new("Failed attempts"), Cell::new(state.failed_attempts())]);
            backoff.add_row(vec![
                Cell::new("Next allowed sync"),
                Cell::new(state.next_allowed_sync().map(|t| t.to_rfc3339()).unwrap_or_else(|| "now".to_string())),
            ]);
            backoff.add_row(vec![
                Cell::new("Last successful sync"),
                Cell::new(state.last_successful_sync().map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())),
            ]);
            backoff.load_preset(comfy_table::presets::UTF8_FULL);
            backoff.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", backoff);
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let mut checkpoints = Vec::new();
            for provider in [Provider::Cloud, Provider::Social] {
                for &family in families(provider) {
                    let checkpoint = state.checkpoint(provider, family);
                    checkpoints.push(json!({
                        "provider": provider.as_str(),
                        "family": family.as_str(),
                        "last_sync": checkpoint.last_sync,
                        "merged": checkpoint.merged,
                    }));
                }
            }
            output.json(&json!({
                "checkpoints": checkpoints,
                "failed_attempts": state.failed_attempts(),
                "next_allowed_sync": state.next_allowed_sync(),
                "last_successful_sync": state.last_successful_sync(),
            }));
        }
    }
    Ok(())
}
