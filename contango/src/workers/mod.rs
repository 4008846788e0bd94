use std::io::Read;

/// The executor worker: consumes order-insert events.
pub mod executor;

/// The strategy worker: consumes quote-insert events.
pub mod strategy;

/// Read the triggering event document from the first argument (a path) or stdin.
pub fn read_event_input() -> std::io::Result<String> {
    match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut event = String::new();
            std::io::stdin().read_to_string(&mut event)?;
            Ok(event)
        }
    }
}
