use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use clap::ValueEnum;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use showsync_config::{Config, PathManager, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenProvider {
    Cloud,
    Social,
}

pub fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show_config(output),
        ConfigCommands::Init { force } => init_config(force, output),
        ConfigCommands::Token { provider, token } => store_token(provider, token, output),
    }
}

/// Load the config file, pointing at `config init` when it is missing.
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        return Err(color_eyre::eyre::eyre!(
            "Configuration file not found at {}. Run 'showsync config init' first.",
            config_file.display()
        ));
    }
    Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))
}

fn init_config(force: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config_file = paths.config_file();
    if config_file.exists() && !force {
        output.warn(format!(
            "Configuration already exists at {}. Use --force to overwrite.",
            config_file.display()
        ));
        return Ok(());
    }
    Config::template()
        .save_to_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to write config to {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote configuration template to {}", config_file.display()));
    output.info("Enable providers and set the social client_id, then store tokens with 'showsync config token'.");
    Ok(())
}

fn store_token(provider: TokenProvider, token: String, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    paths
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create directories: {}", e))?;
    let mut state = StateStore::new(paths.state_file());
    state
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load state: {}", e))?;
    match provider {
        TokenProvider::Cloud => state.set_cloud_token(token),
        TokenProvider::Social => state.set_social_token(token),
    }
    state
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save state: {}", e))?;
    output.success(format!("Stored {:?} access token", provider).to_lowercase());
    Ok(())
}

fn show_config(output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config = load_config(&paths)?;
    let sync = &config.sync;
    let scheduler = &config.scheduler;

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }
            let mut info_table = Table::new();
            info_table.set_header(vec![
                Cell::new("Config File").add_attribute(comfy_table::Attribute::Bold),
                Cell::new(paths.config_file().display().to_string()),
            ]);
            info_table.load_preset(comfy_table::presets::UTF8_FULL);
            info_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", info_table);
            println!();

            let mut providers = Table::new();
            providers.set_header(vec![
                Cell::new("Providers").fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold),
            ]);
            match &config.cloud {
                Some(cloud) => providers.add_row(vec![
                    Cell::new("Cloud"),
                    Cell::new(enabled_mark(cloud.enabled)),
                    Cell::new(&cloud.base_url),
                ]),
                None => providers.add_row(vec![Cell::new("Cloud"), Cell::new("not configured".bright_black().to_string())]),
            };
            match &config.social {
                Some(social) => providers.add_row(vec![
                    Cell::new("Social"),
                    Cell::new(enabled_mark(social.enabled)),
                    Cell::new(&social.base_url),
                ]),
                None => providers.add_row(vec![Cell::new("Social"), Cell::new("not configured".bright_black().to_string())]),
            };
            providers.load_preset(comfy_table::presets::UTF8_FULL);
            providers.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", providers);
            println!();

            let mut options = Table::new();
            options.set_header(vec![
                Cell::new("Sync Options").fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold),
            ]);
            for (name, value) in [
                ("Episode batch size", sync.episode_batch_size.to_string()),
                ("Show batch size", sync.show_batch_size.to_string()),
                ("Movie batch size", sync.movie_batch_size.to_string()),
                ("List batch size", sync.list_batch_size.to_string()),
                ("Local batch size", sync.local_batch_size.to_string()),
                ("Rating tolerance (min)", sync.rating_tolerance_minutes.to_string()),
                ("Show refresh interval (h)", sync.show_refresh_interval_hours.to_string()),
                ("Sync interval (min)", scheduler.interval_minutes.to_string()),
                ("Run on startup", scheduler.run_on_startup.to_string()),
                ("Back-off base (min)", scheduler.backoff_base_minutes.to_string()),
                ("Back-off max exponent", scheduler.backoff_max_exponent.to_string()),
            ] {
                options.add_row(vec![Cell::new(name), Cell::new(value)]);
            }
            options.load_preset(comfy_table::presets::UTF8_FULL);
            options.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", options);
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "config_file": paths.config_file().display().to_string(),
                "cloud_enabled": config.is_cloud_enabled(),
                "social_enabled": config.is_social_enabled(),
                "sync": {
                    "episode_batch_size": sync.episode_batch_size,
                    "show_batch_size": sync.show_batch_size,
                    "movie_batch_size": sync.movie_batch_size,
                    "list_batch_size": sync.list_batch_size,
                    "local_batch_size": sync.local_batch_size,
                    "rating_tolerance_minutes": sync.rating_tolerance_minutes,
                    "show_refresh_interval_hours": sync.show_refresh_interval_hours,
                },
                "scheduler": {
                    "interval_minutes": scheduler.interval_minutes,
                    "run_on_startup": scheduler.run_on_startup,
                    "backoff_base_minutes": scheduler.backoff_base_minutes,
                    "backoff_max_exponent": scheduler.backoff_max_exponent,
                },
            }));
        }
    }
    Ok(())
}

fn enabled_mark(enabled: bool) -> String {
    if enabled {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}
