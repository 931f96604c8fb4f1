use clap::Subcommand;

use super::inspect::InspectArgs;
use super::replay::ReplayArgs;
use super::validate::ValidateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Replay a recorded workflow against a fresh browser session
    Replay(ReplayArgs),

    /// List stored workflows
    List,

    /// Show the steps and required variables of a workflow
    Inspect(InspectArgs),

    /// Load and validate a workflow without running it
    Validate(ValidateArgs),
}
