//! Shared application state for the API server.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error};
use turn_runner::core::types::TurnUpdate;
use turn_runner::error::TurnError;
use turn_runner::io::run_state::RunState;
use turn_runner::io::simulation::SimulationRunner;
use turn_runner::io::store::WorldStore;
use turn_runner::turn::{Orchestrator, RunEvent, TurnResult};

use crate::error::ApiError;

pub type SharedOrchestrator = Orchestrator<Box<dyn SimulationRunner>, Box<dyn WorldStore>>;

/// Events broadcast to SSE clients while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    RunStateChanged { state: RunState },
    Record(TurnUpdate),
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SharedOrchestrator>,
    /// Broadcast sender for run progress.
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
}

impl AppState {
    pub fn new(orchestrator: SharedOrchestrator) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            orchestrator: Arc::new(orchestrator),
            event_tx: Arc::new(event_tx),
        }
    }

    /// Run `op` on the blocking pool, forwarding its progress to SSE subscribers.
    pub async fn run_blocking<F>(&self, op: F) -> Result<TurnResult, ApiError>
    where
        F: FnOnce(&SharedOrchestrator, &mut dyn FnMut(RunEvent)) -> Result<TurnResult, TurnError>
            + Send
            + 'static,
    {
        let orchestrator = Arc::clone(&self.orchestrator);
        let event_tx = Arc::clone(&self.event_tx);
        let joined = tokio::task::spawn_blocking(move || {
            let mut on_event = |event: RunEvent| forward_event(&event_tx, event);
            op(&orchestrator, &mut on_event)
        })
        .await;
        match joined {
            Ok(result) => result.map_err(ApiError::from),
            Err(err) => {
                error!(error = %err, "simulation task failed");
                Err(ApiError::internal("simulation task failed"))
            }
        }
    }
}

fn forward_event(event_tx: &broadcast::Sender<ChangeEvent>, event: RunEvent) {
    let change = match event {
        RunEvent::Admitted { .. } => ChangeEvent::RunStateChanged {
            state: RunState::Running,
        },
        RunEvent::Update(update) => ChangeEvent::Record(update),
        RunEvent::Exited { .. } => ChangeEvent::RunStateChanged {
            state: RunState::Idle,
        },
    };
    if event_tx.send(change).is_err() {
        debug!("no SSE subscribers");
    }
}
