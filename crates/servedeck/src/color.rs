//! CLI color helpers.
//!
//! Every function respects `NO_COLOR`, `FORCE_COLOR`, and TTY detection via
//! `owo-colors`' `if_supports_color()`. `--no-color` sets an in-process flag
//! that bypasses owo-colors entirely.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use owo_colors::Stream::{Stderr, Stdout};

/// Set by `--no-color`.
static NO_COLOR_FLAG: AtomicBool = AtomicBool::new(false);

pub fn set_no_color() {
    NO_COLOR_FLAG.store(true, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb {
    const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }
}

const ACCENT: Rgb = Rgb::from_hex(0x61AFEF); // IDs, names
const GOOD: Rgb = Rgb::from_hex(0x98C379); // running, completed
const PENDING: Rgb = Rgb::from_hex(0xE5C07B); // preparing, warnings
const BAD: Rgb = Rgb::from_hex(0xE06C75); // error, critical
const MUTED: Rgb = Rgb::from_hex(0x5C6370); // borders, hints

fn no_color() -> bool {
    NO_COLOR_FLAG.load(Ordering::Relaxed)
}

fn paint(text: &str, rgb: Rgb) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stdout, |t| t.truecolor(rgb.r, rgb.g, rgb.b))
        .to_string()
}

fn paint_stderr(text: &str, rgb: Rgb) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stderr, |t| t.truecolor(rgb.r, rgb.g, rgb.b))
        .to_string()
}

pub fn accent(text: &str) -> String {
    paint(text, ACCENT)
}

pub fn good(text: &str) -> String {
    paint(text, GOOD)
}

pub fn pending(text: &str) -> String {
    paint(text, PENDING)
}

pub fn bad(text: &str) -> String {
    paint(text, BAD)
}

pub fn muted(text: &str) -> String {
    paint(text, MUTED)
}

pub fn bold(text: &str) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stdout, |t| t.bold()).to_string()
}

pub fn plain(text: &str) -> String {
    text.to_string()
}

/// Color an API status cell. Padding around the value is kept.
pub fn status(cell: &str) -> String {
    match cell.trim() {
        "running" => good(cell),
        "preparing" => pending(cell),
        "stopped" => muted(cell),
        "error" => bad(cell),
        _ => cell.to_string(),
    }
}

/// Color an alert level cell. Padding around the value is kept.
pub fn level(cell: &str) -> String {
    match cell.trim() {
        "info" => muted(cell),
        "warning" => pending(cell),
        "critical" => bad(cell),
        _ => cell.to_string(),
    }
}

/// Error styling for stderr messages.
pub fn error(text: &str) -> String {
    paint_stderr(text, BAD)
}

/// Warning styling for stderr messages.
pub fn warning(text: &str) -> String {
    paint_stderr(text, PENDING)
}

/// Hint styling for stderr messages.
pub fn hint(text: &str) -> String {
    paint_stderr(text, MUTED)
}
