use crate::output::Output;
use color_eyre::Result;
use showsync_config::{PathManager, StateStore};
use std::fs;

pub fn run_clear(all: bool, checkpoints: bool, store: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();

    if !(all || checkpoints || store) {
        output.warn("No clear option specified. Use --checkpoints, --store, or --all");
        output.info("\nExample: showsync clear --checkpoints");
        return Ok(());
    }
    // A fresh store needs a merge sync to get its data back.
    if all || checkpoints || store {
        clear_checkpoints(&paths, output)?;
    }
    if all || store {
        clear_store(&paths, output)?;
    }
    Ok(())
}

fn clear_checkpoints(paths: &PathManager, output: &Output) -> Result<()> {
    let state_file = paths.state_file();
    if !state_file.exists() {
        output.info("No state file found, nothing to clear");
        return Ok(());
    }
    let mut state = StateStore::new(state_file);
    state
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load state: {}", e))?;

    let cleared = state.clear_checkpoints();
    state.set_failed_attempts(0);
    state.remove("sync_next_allowed_at");
    state
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save state: {}", e))?;
    output.success(format!("Cleared {} checkpoint value(s), the next sync merges again", cleared));
    Ok(())
}

fn clear_store(paths: &PathManager, output: &Output) -> Result<()> {
    let store_file = paths.store_file();
    if store_file.exists() {
        fs::remove_file(&store_file).map_err(|e| {
            color_eyre::eyre::eyre!("Failed to remove store at {}: {}", store_file.display(), e)
        })?;
        output.success(format!("Cleared local store: {}", store_file.display()));
    } else {
        output.info("No local store found to clear");
    }
    Ok(())
}
