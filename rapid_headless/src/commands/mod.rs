// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

pub mod laptimer_run;
pub mod livetiming_run;

use std::path::PathBuf;
use tracing::error;

/// `$XDG_DATA_HOME/rapid` (or the platform equivalent): where the circuit
/// catalogue and recorded sessions live.
pub fn storage_dir() -> Result<PathBuf, ()> {
    let mut dir = dirs::data_local_dir().ok_or_else(|| {
        error!("Could not determine local data directory");
    })?;
    dir.push("rapid");
    Ok(dir)
}

/// Installs a Ctrl-C handler that publishes [`module_core::EventKind::QuitEvent`]
/// so every spawned module gets a chance to shut down cleanly.
pub fn install_quit_handler(ctx: module_core::ModuleCtx) {
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = ctx.sender.send(module_core::Event {
            kind: module_core::EventKind::QuitEvent,
        });
    }) {
        error!("Failed to install Ctrl-C handler: {e}");
    }
}
