use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    replayer_cli::cli::app::run().await
}
