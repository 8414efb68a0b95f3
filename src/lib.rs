#![warn(clippy::pedantic)]
// Noisy doc lints: would require annotating every fallible pub function
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference: keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// ServerConfig/TelegramConfig/PolicyConfig repeat their module's name
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub(crate) mod errors;
pub mod gateway;
pub(crate) mod media;
pub(crate) mod spool;
pub(crate) mod telegram;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
