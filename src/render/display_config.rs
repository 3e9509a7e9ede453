use super::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub render_system: String,
    pub width: u32,
    pub height: u32,
    pub full_screen: bool,
    pub vsync: bool,
}

impl DisplayConfig {
    pub fn windowed(render_system: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            render_system: render_system.into(),
            width,
            height,
            full_screen: false,
            vsync: true,
        }
    }
}

/// Saved display configuration on disk.
#[derive(Debug, Clone)]
pub struct DisplayConfigStore {
    path: PathBuf,
}

impl DisplayConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when nothing usable has been saved yet.
    pub fn load(&self) -> Option<DisplayConfig> {
        let bytes = std::fs::read(&self.path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!(
                    "[render] ignoring unreadable display config {}: {err}",
                    self.path.display()
                );
                None
            }
        }
    }

    pub fn save(&self, config: &DisplayConfig) -> RenderResult<()> {
        let json = serde_json::to_vec_pretty(config)
            .map_err(|err| RenderError::DisplayConfig(err.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| RenderError::DisplayConfig(err.to_string()))?;
        }
        std::fs::write(&self.path, json).map_err(|err| RenderError::DisplayConfig(err.to_string()))
    }
}

/// Interactive display-configuration chooser.
pub trait ConfigPrompt {
    /// `None` means the user declined to configure the display.
    fn choose(&mut self, render_systems: &[String], proposed: &DisplayConfig)
    -> Option<DisplayConfig>;
}

/// Answers every prompt with a fixed reply.
#[derive(Debug, Clone)]
pub enum ScriptedPrompt {
    AcceptProposed,
    Accept(DisplayConfig),
    Decline,
}

impl ConfigPrompt for ScriptedPrompt {
    fn choose(
        &mut self,
        _render_systems: &[String],
        proposed: &DisplayConfig,
    ) -> Option<DisplayConfig> {
        match self {
            ScriptedPrompt::AcceptProposed => Some(proposed.clone()),
            ScriptedPrompt::Accept(config) => Some(config.clone()),
            ScriptedPrompt::Decline => None,
        }
    }
}

/// Asks on the terminal whether to use the proposed configuration.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self {
            input: std::io::stdin().lock(),
            output: std::io::stdout(),
        }
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ConfigPrompt for TerminalPrompt<R, W> {
    fn choose(
        &mut self,
        render_systems: &[String],
        proposed: &DisplayConfig,
    ) -> Option<DisplayConfig> {
        let _ = writeln!(
            self.output,
            "Available render systems: {}",
            render_systems.join(", ")
        );
        let _ = write!(
            self.output,
            "Use {} at {}x{}{}? [Y/n] ",
            proposed.render_system,
            proposed.width,
            proposed.height,
            if proposed.full_screen { " (full screen)" } else { "" }
        );
        let _ = self.output.flush();

        let mut answer = String::new();
        if self.input.read_line(&mut answer).ok()? == 0 {
            return None;
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => Some(proposed.clone()),
            _ => None,
        }
    }
}
