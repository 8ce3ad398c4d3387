use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::adapter::ChainAdapter;
use crate::throttling::RateBudget;
use crate::ChainId;

/// Chain → priority-ordered adapter candidates.
#[derive(Default)]
pub struct AdapterRegistry {
    chains: HashMap<ChainId, Vec<Arc<dyn ChainAdapter>>>,
    budgets: HashMap<String, Arc<RateBudget>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chains = self
            .chains
            .iter()
            .map(|(chain, adapters)| {
                let ids = adapters.iter().map(|adapter| adapter.id()).collect::<Vec<_>>();
                (chain.as_str(), ids)
            })
            .collect::<HashMap<_, _>>();
        f.debug_struct("AdapterRegistry")
            .field("chains", &chains)
            .finish_non_exhaustive()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `adapter` as a candidate for `chain`.
    ///
    /// The chain's list stays sorted ascending by priority; equal priorities
    /// keep registration order. Re-registering an id on the same chain
    /// replaces the earlier entry.
    pub fn register(&mut self, chain: &ChainId, adapter: Arc<dyn ChainAdapter>) {
        let descriptor = adapter.descriptor();
        if !descriptor.supports_chain(chain) {
            warn!(
                adapter = descriptor.id.as_str(),
                chain = chain.as_str(),
                "registering adapter for a chain outside its supported set"
            );
        }

        if let Some(quota) = descriptor.quota {
            self.budgets
                .entry(descriptor.id.clone())
                .or_insert_with(|| Arc::new(RateBudget::new(quota)));
        }

        let candidates = self.chains.entry(chain.clone()).or_default();
        if let Some(position) = candidates
            .iter()
            .position(|existing| existing.id() == adapter.id())
        {
            debug!(
                adapter = adapter.id(),
                chain = chain.as_str(),
                "replacing existing registration"
            );
            candidates.remove(position);
        }
        candidates.push(adapter);
        candidates.sort_by_key(|candidate| candidate.priority());
    }

    /// Ordered candidates for `chain`; empty when nothing is registered.
    pub fn candidates_for(&self, chain: &ChainId) -> Vec<Arc<dyn ChainAdapter>> {
        self.chains.get(chain).cloned().unwrap_or_default()
    }

    pub fn budget_for(&self, adapter_id: &str) -> Option<Arc<RateBudget>> {
        self.budgets.get(adapter_id).cloned()
    }

    /// Chains with at least one adapter, sorted.
    pub fn supported_chains(&self) -> Vec<ChainId> {
        let mut chains = self
            .chains
            .iter()
            .filter(|(_, adapters)| !adapters.is_empty())
            .map(|(chain, _)| chain.clone())
            .collect::<Vec<_>>();
        chains.sort();
        chains
    }
}
