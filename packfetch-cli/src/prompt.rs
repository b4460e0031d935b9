//! Interactive downloads-directory prompt.

use std::path::Path;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use packfetch::config::expand_tilde;
use packfetch::manual::{render_report, DownloadsPrompt, ManualDownloadEntry, PromptAnswer};

/// Prompts on the terminal with dialoguer.
#[derive(Default)]
pub struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl DownloadsPrompt for TerminalPrompt {
    fn report(&mut self, outstanding: &[&ManualDownloadEntry], source_dir: &Path) {
        println!();
        println!("{}", style("Manual downloads required").yellow().bold());
        println!();
        print!("{}", render_report(outstanding.iter().copied()));
        println!();
        println!("Watching: {}", style(source_dir.display()).cyan());
    }

    fn ask_source_dir(&mut self, current: &Path) -> PromptAnswer {
        let input: Result<String, _> = Input::with_theme(&self.theme)
            .with_prompt("Downloads directory (Enter to rescan, q to stop)")
            .allow_empty(true)
            .interact_text();

        match input {
            Ok(text) => interpret_answer(&text, current),
            Err(_) => PromptAnswer::Abort,
        }
    }
}

/// Map the typed text to an answer.
fn interpret_answer(text: &str, current: &Path) -> PromptAnswer {
    let text = text.trim();
    if text.is_empty() {
        return PromptAnswer::KeepCurrent;
    }
    if text.eq_ignore_ascii_case("q") || text.eq_ignore_ascii_case("quit") {
        return PromptAnswer::Abort;
    }

    let dir = expand_tilde(text);
    if dir == current {
        PromptAnswer::KeepCurrent
    } else {
        PromptAnswer::UseDir(dir)
    }
}
