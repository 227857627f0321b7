//! # Shell Completion Module
//!
//! Generates completion scripts for the Replay CLI via clap's completion
//! system.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! replay completion bash > ~/.local/share/bash-completion/completions/replay
//!
//! # Generate zsh completions
//! replay completion zsh > ~/.config/zsh/completions/_replay
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our CLI Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}
