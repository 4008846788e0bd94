use crate::{
    config::ExecutorConfig,
    notifier::{LogNotifier, Notifier},
    response::WorkerResponse,
};
use contango_execution::{
    Scheduler,
    client::{Broker, ig::IgClient},
};
use contango_store::{
    RedisStore,
    event::StreamEvent,
    store::{OrderHandler, SecurityHandler},
};
use std::sync::Arc;
use tracing::{error, info};

const REPORT_SUBJECT: &str = "IG EXECUTOR RESULTS";

/// Run one executor batch and deliver the report.
pub async fn run_executor<B, S, N>(
    event: &StreamEvent,
    scheduler: &Scheduler<B, S>,
    notifier: &N,
) -> WorkerResponse
where
    B: Broker + 'static,
    S: OrderHandler + SecurityHandler + 'static,
    N: Notifier,
{
    match scheduler.execute_batch(event).await {
        Ok(report) => {
            if report.is_empty() {
                info!("nothing to report - event ignored");
            } else {
                notifier.notify(REPORT_SUBJECT, &report.to_html());
            }
            WorkerResponse::ok()
        }
        Err(error) => {
            error!(%error, "executor batch aborted");
            notifier.notify(REPORT_SUBJECT, &format!("<br>Batch aborted: {error}\n"));
            WorkerResponse::error()
        }
    }
}

/// Full executor entry point: configuration, collaborators, one batch.
///
/// Missing configuration returns `{"State":"ERROR"}` before any side effect.
pub async fn handle_executor_event(event_json: &str) -> WorkerResponse {
    let config = match ExecutorConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "ENVIRONMENT VARS are not set");
            return WorkerResponse::error();
        }
    };

    let event: StreamEvent = match serde_json::from_str(event_json) {
        Ok(event) => event,
        Err(error) => {
            error!(%error, "malformed trigger event");
            return WorkerResponse::error();
        }
    };

    let store = match RedisStore::new(&config.redis_url, config.tables.clone(), "debug", "roll.csv")
    {
        Ok(store) => store,
        Err(error) => {
            error!(%error, "store unavailable");
            return WorkerResponse::error();
        }
    };

    let scheduler = Scheduler::new(IgClient::new(config.ig.clone()), Arc::new(store));
    run_executor(&event, &scheduler, &LogNotifier).await
}
