//! Terminal rendering of transfer events

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::TransferEvent;

/// Progress bar fed by [`TransferEvent`]s.
///
/// Log events only update the bar's message: the same text has already gone
/// through `tracing`, so it is never printed a second time here. Without a
/// terminal no bar is drawn at all.
pub struct TransferProgress {
    bar: Option<ProgressBar>,
}

impl TransferProgress {
    pub fn new(interactive: bool) -> Self {
        let bar = interactive.then(|| {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "  {spinner:.cyan} {bar:30.cyan/dim} {pos}/{len} {msg:.dim} {elapsed:.dim}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("━╸─"),
            );
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            bar
        });
        Self { bar }
    }

    /// Draw a bar only when stdout and stdin are terminals and not under CI
    pub fn detect() -> Self {
        let interactive = std::io::stdout().is_terminal()
            && std::io::stdin().is_terminal()
            && std::env::var("CI").is_err();
        Self::new(interactive)
    }

    pub fn on_event(&self, event: &TransferEvent) {
        let Some(bar) = &self.bar else {
            return;
        };
        match event {
            TransferEvent::Progress { current, total } => {
                let total = *total as u64;
                if bar.length() != Some(total) {
                    bar.set_length(total);
                }
                bar.set_position(*current as u64);
            }
            TransferEvent::Log(message) => bar.set_message(message.clone()),
        }
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
