//! Interactive commands exposed to the user.
//!
//! Each input line is classified by the dispatcher and routed either to the
//! capability registry (resources, prompts, listings) or to the
//! conversation engine.

pub mod dispatcher;

pub use dispatcher::{format_turn, parse_command, Command, Dispatcher, Reply};
