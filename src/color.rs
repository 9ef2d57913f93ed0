#![allow(clippy::module_name_repetitions)]
//! Color mode configuration and ANSI painting helpers.
//!
//! Logging helpers policy (stderr one-liners):
//! - Use log_info_stderr for progress, log_warn_stderr for fallbacks/notes,
//!   and log_error_stderr for failures.
//! - Precompute once per scope and reuse:
//!     let use_err = starknet_docker::color_enabled_stderr();
//! - stdout is reserved for container output and machine-readable listings; never paint it
//!   from these helpers.

use clap::ValueEnum;
use once_cell::sync::OnceCell;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

static COLOR_MODE: OnceCell<ColorMode> = OnceCell::new();

pub fn set_color_mode(mode: ColorMode) {
    let _ = COLOR_MODE.set(mode);
}

fn parse_color_mode(s: &str) -> Option<ColorMode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "auto" => Some(ColorMode::Auto),
        "always" | "on" | "true" | "yes" => Some(ColorMode::Always),
        "never" | "off" | "false" | "no" => Some(ColorMode::Never),
        _ => None,
    }
}

fn env_color_mode_pref() -> Option<ColorMode> {
    std::env::var("STARKNET_DOCKER_COLOR")
        .ok()
        .and_then(|v| parse_color_mode(&v))
}

fn no_color_env() -> bool {
    // Per https://no-color.org/
    std::env::var("NO_COLOR").is_ok()
}

fn resolve(mode: ColorMode, is_tty: bool) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_tty,
    }
}

fn color_enabled_for(is_tty: bool) -> bool {
    // NO_COLOR wins, then the CLI flag, then STARKNET_DOCKER_COLOR, then TTY detection.
    if no_color_env() {
        return false;
    }
    if let Some(mode) = COLOR_MODE.get().copied() {
        return resolve(mode, is_tty);
    }
    if let Some(env_mode) = env_color_mode_pref() {
        return resolve(env_mode, is_tty);
    }
    is_tty
}

pub fn color_enabled_stdout() -> bool {
    color_enabled_for(atty::is(atty::Stream::Stdout))
}

pub fn color_enabled_stderr() -> bool {
    color_enabled_for(atty::is(atty::Stream::Stderr))
}

/// Wrap string with ANSI color code when enabled; otherwise return unchanged.
pub fn paint(enabled: bool, code: &str, s: &str) -> String {
    if enabled {
        format!("{code}{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

pub fn log_info_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[36;1m", msg));
}

pub fn log_warn_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[33m", msg));
}

pub fn log_error_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[31;1m", msg));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_only_when_enabled() {
        assert_eq!(paint(false, "\x1b[31m", "x"), "x");
        assert_eq!(paint(true, "\x1b[31m", "x"), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn test_parse_color_mode_accepts_aliases() {
        assert_eq!(parse_color_mode(" Always "), Some(ColorMode::Always));
        assert_eq!(parse_color_mode("off"), Some(ColorMode::Never));
        assert_eq!(parse_color_mode("auto"), Some(ColorMode::Auto));
        assert_eq!(parse_color_mode("sometimes"), None);
    }

    #[test]
    fn test_auto_follows_tty() {
        assert!(resolve(ColorMode::Auto, true));
        assert!(!resolve(ColorMode::Auto, false));
        assert!(resolve(ColorMode::Always, false));
        assert!(!resolve(ColorMode::Never, true));
    }
}
