use indicatif::{ProgressBar, ProgressStyle};
use showsync_core::events::Receiver;
use showsync_core::SyncEvent;
use std::io::IsTerminal;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Spinner that follows the steps of a sync pass. Falls back to structured
/// logging when not attached to a terminal.
#[derive(Clone)]
pub struct SyncUI {
    spinner: ProgressBar,
    interactive: bool,
}

impl SyncUI {
    pub fn new() -> Self {
        let interactive = is_interactive();
        let spinner = if interactive {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(120));
        spinner.set_message("Starting sync...");

        if !interactive {
            tracing::info!(
                operation = "ui_init",
                mode = "non_interactive",
                "Running in non-interactive mode - progress disabled, using structured logging"
            );
        }
        Self { spinner, interactive }
    }

    pub fn set_message(&self, msg: String) {
        if self.interactive {
            self.spinner.set_message(msg);
        } else {
            tracing::info!(operation = "progress", message = %msg, "Progress update");
        }
    }

    /// Update the spinner from engine events until the pass finishes.
    pub fn follow(&self, mut events: Receiver<SyncEvent>) -> JoinHandle<()> {
        let ui = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SyncEvent::StepStarted(step)) => ui.set_message(format!("Syncing {}...", step)),
                    Ok(SyncEvent::Finished(_)) | Err(RecvError::Closed) => break,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                }
            }
        })
    }

    pub fn finish(&self) {
        if self.interactive {
            self.spinner.finish_and_clear();
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
