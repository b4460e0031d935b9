//! Terminal progress bar for acquisition waves.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use packfetch::acquire::{ProgressEvent, ProgressObserver};

const TEMPLATE: &str = "{spinner:.green} {msg:<16} [{bar:40.cyan/blue}] {pos}/{len}";

/// One bar, reset at the start of every wave.
pub struct WaveProgress {
    bar: ProgressBar,
}

impl WaveProgress {
    /// A visible bar when `enabled`, a hidden one otherwise.
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }

    /// Observer forwarding orchestrator events to the bar.
    pub fn observer(&self) -> ProgressObserver {
        let bar = self.bar.clone();
        Arc::new(move |event: &ProgressEvent| apply(&bar, event))
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn apply(bar: &ProgressBar, event: &ProgressEvent) {
    match event {
        ProgressEvent::WaveStarted {
            wave,
            attempt,
            artifacts,
        } => {
            bar.reset();
            bar.set_length(*artifacts as u64);
            bar.set_message(format!("wave {} ({})", wave, attempt));
        }
        ProgressEvent::ArtifactFinished { .. } => bar.inc(1),
        ProgressEvent::WaveFinished { wave, retries } => {
            if *retries > 0 {
                bar.println(format!("wave {}: {} artifact(s) will be retried", wave, retries));
            }
        }
    }
}
