//! Step and section formatting

use super::context::UiContext;
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "");
static INFO: Emoji<'_, '_> = Emoji("• ", "");

/// Title line
pub fn intro(_ctx: &UiContext, title: &str) {
    println!("{}", style(title).cyan().bold());
    println!();
}

pub fn section(_ctx: &UiContext, title: &str) {
    println!();
    println!("{}", style(title).bold());
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        println!("  {}{}", style(CHECK).green(), message);
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.is_interactive() {
        println!("  {}{} ({})", style(CHECK).green(), message, style(detail).dim());
    } else {
        println!("  {} {} ({})", style("[OK]").green(), message, detail);
    }
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        println!("  {}{}", style(WARN).yellow(), message);
    } else {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}

pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.is_interactive() {
        println!("  {}{} - {}", style(WARN).yellow(), message, style(hint).dim());
    } else {
        println!("  {} {} - {}", style("[WARN]").yellow(), message, hint);
    }
}

pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        println!("  {}{}", style(INFO).cyan(), message);
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.is_interactive() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}
