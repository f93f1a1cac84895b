//! Terminal output helpers shared by the commands
//!
//! Interactive terminals get glyphs and colour; pipes and CI get plain
//! bracketed tags so output stays greppable.

mod context;
mod output;

pub use context::UiContext;
pub use output::{intro, key_value, section, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint};
