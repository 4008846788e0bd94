use crate::{
    balance::Money,
    client::{Broker, Deal, Market, OpenPosition, PositionRequest, Session},
    error::BrokerError,
};
use chrono::Utc;
use contango_instrument::symbol::BrokerId;
use parking_lot::Mutex;
use smol_str::{SmolStr, format_smolstr};
use std::{sync::Arc, time::Duration};

/// Scriptable in-process [`Broker`] used by scheduler and worker tests.
///
/// Cheap to clone - clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MockBroker {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    balance: Money,
    fail_login: bool,
    markets: Vec<Market>,
    positions: Vec<OpenPosition>,
    create_result: Option<Result<Deal, BrokerError>>,
    /// When set, a successful create appends a matching open position at this level.
    fill_level: Option<rust_decimal::Decimal>,
    /// Overrides the filled size reported for appended positions.
    fill_size: Option<rust_decimal::Decimal>,
    create_delay: Option<Duration>,
    created: Vec<PositionRequest>,
    deal_sequence: u32,
    logouts: u32,
}

impl MockBroker {
    pub fn new(balance: Money) -> Self {
        let broker = Self::default();
        broker.state.lock().balance = balance;
        broker
    }

    pub fn fail_login(self) -> Self {
        self.state.lock().fail_login = true;
        self
    }

    pub fn with_market(self, market: Market) -> Self {
        self.state.lock().markets.push(market);
        self
    }

    pub fn with_position(self, position: OpenPosition) -> Self {
        self.state.lock().positions.push(position);
        self
    }

    /// Script the next create outcome; by default creates succeed with a fresh reference.
    pub fn with_create_result(self, result: Result<Deal, BrokerError>) -> Self {
        self.state.lock().create_result = Some(result);
        self
    }

    /// Successful creates materialise as open positions filled at `level`.
    pub fn with_fill_level(self, level: rust_decimal::Decimal) -> Self {
        self.state.lock().fill_level = Some(level);
        self
    }

    /// Report fills of `size` regardless of the requested size.
    pub fn with_fill_size(self, size: rust_decimal::Decimal) -> Self {
        self.state.lock().fill_size = Some(size);
        self
    }

    /// Delay every create, for batch deadline tests.
    pub fn with_create_delay(self, delay: Duration) -> Self {
        self.state.lock().create_delay = Some(delay);
        self
    }

    /// Position creation requests received so far.
    pub fn created(&self) -> Vec<PositionRequest> {
        self.state.lock().created.clone()
    }

    pub fn logouts(&self) -> u32 {
        self.state.lock().logouts
    }
}

impl Broker for MockBroker {
    const ID: BrokerId = BrokerId::Ig;

    async fn login(&self) -> Option<Session> {
        let state = self.state.lock();
        if state.fail_login {
            return None;
        }

        Some(Session::new(
            "mock-cst".into(),
            "mock-security-token".into(),
            state.balance.clone(),
        ))
    }

    async fn logout(&self, _: &Session) {
        self.state.lock().logouts += 1;
    }

    async fn search_markets(&self, _: &Session, term: &str) -> Result<Vec<Market>, BrokerError> {
        let state = self.state.lock();
        let term = term.to_uppercase();
        Ok(state
            .markets
            .iter()
            .filter(|market| {
                market.epic.to_uppercase().contains(&term)
                    || market.instrument_name.to_uppercase().contains(&term)
            })
            .cloned()
            .collect())
    }

    async fn create_position(
        &self,
        _: &Session,
        request: &PositionRequest,
    ) -> Result<Deal, BrokerError> {
        let delay = {
            let mut state = self.state.lock();
            state.created.push(request.clone());
            state.create_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if let Some(result) = state.create_result.take() {
            return result;
        }

        state.deal_sequence += 1;
        let deal_reference: SmolStr = format_smolstr!("MOCKREF-{}", state.deal_sequence);

        if let Some(level) = state.fill_level {
            let size = state.fill_size.unwrap_or(request.size);
            let market = state
                .markets
                .iter()
                .find(|market| market.epic == request.epic)
                .cloned()
                .unwrap_or_else(|| {
                    Market::new(
                        request.epic.clone(),
                        "".into(),
                        "".into(),
                        request.expiry.clone(),
                        serde_json::Map::new(),
                    )
                });

            let position = OpenPosition::new(
                deal_reference.clone(),
                format_smolstr!("DI-{}", state.deal_sequence),
                Utc::now(),
                level,
                size,
                request.direction,
                market,
            );
            state.positions.push(position);
        }

        Ok(Deal::new(deal_reference, None))
    }

    async fn get_positions(&self, _: &Session) -> Result<Vec<OpenPosition>, BrokerError> {
        Ok(self.state.lock().positions.clone())
    }
}
