use crate::{config::StrategyWorkerConfig, response::WorkerResponse};
use contango_store::{RedisStore, event::StreamEvent, store::StoreHandler};
use contango_strategy::RollEvaluator;
use std::sync::Arc;
use tracing::{error, info};

/// Run one strategy batch.
pub async fn run_strategy<S>(event: &StreamEvent, evaluator: &RollEvaluator<S>) -> WorkerResponse
where
    S: StoreHandler,
{
    match evaluator.evaluate_batch(event).await {
        Ok(created) => {
            info!(orders_created = created.len(), "strategy evaluation complete");
            WorkerResponse::ok()
        }
        Err(error) => {
            error!(%error, "strategy evaluation failed");
            WorkerResponse::error()
        }
    }
}

/// Full strategy entry point: configuration, store, one batch.
///
/// Missing configuration returns `{"State":"ERROR"}` before any side effect.
pub async fn handle_strategy_event(event_json: &str) -> WorkerResponse {
    let config = match StrategyWorkerConfig::from_env() {
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

    let store = match RedisStore::new(
        &config.redis_url,
        config.tables.clone(),
        &config.debug_folder,
        &config.roll_file,
    ) {
        Ok(store) => store,
        Err(error) => {
            error!(%error, "store unavailable");
            return WorkerResponse::error();
        }
    };

    let evaluator = RollEvaluator::new(Arc::new(store), config.roll_config());
    run_strategy(&event, &evaluator).await
}
