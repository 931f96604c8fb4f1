pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod exit;
pub mod inspect;
pub mod list;
pub mod output;
pub mod replay;
pub mod runtime;
pub mod validate;

pub use exit::Exit;
pub use inspect::{cmd_inspect, InspectArgs};
pub use list::cmd_list;
pub use replay::{cmd_replay, ReplayArgs};
pub use validate::{cmd_validate, ValidateArgs};
