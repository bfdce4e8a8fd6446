use filing_agent::agent::Agent;
use filing_agent::providers::base::Provider;
use filing_agent::systems::FilingSystem;
use std::sync::Arc;

/// Shared application state
///
/// The provider and the filing tools are built once at startup; every request gets
/// its own `Agent` on top of them.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub system: Arc<FilingSystem>,
    pub max_rounds: usize,
}

impl AppState {
    pub fn agent(&self) -> Agent {
        let mut agent = Agent::new(self.provider.clone()).with_max_rounds(self.max_rounds);
        agent.add_system(self.system.clone());
        agent
    }
}
