use contango::{logging::init_logging, workers};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let event = match workers::read_event_input() {
        Ok(event) => event,
        Err(error) => {
            eprintln!("failed to read trigger event: {error}");
            return ExitCode::FAILURE;
        }
    };

    let response = workers::strategy::handle_strategy_event(&event).await;
    println!("{}", response.to_json());
    ExitCode::SUCCESS
}
