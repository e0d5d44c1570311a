//! Timer Integration - Periodically exercises every active contract

use crate::events::{Command, LedgerEvent, TemplateFilter};
use crate::integration::Integration;
use crate::value::{ContractData, ContractId};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    /// Seconds between ticks; zero or negative disables the timer
    pub interval: i64,
    pub target_template: TemplateFilter,
    pub template_choice: String,
}

pub struct TimerIntegration {
    interval: Option<Duration>,
    filter: TemplateFilter,
    choice: String,
    active_cids: IndexSet<ContractId>,
}

impl TimerIntegration {
    pub fn new(config: &TimerConfig) -> Self {
        let interval = u64::try_from(config.interval)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Self {
            interval,
            filter: config.target_template.clone(),
            choice: config.template_choice.clone(),
            active_cids: IndexSet::new(),
        }
    }
}

impl Integration for TimerIntegration {
    fn kind(&self) -> &'static str {
        "timer"
    }

    fn handle_ledger_event(&mut self, event: &LedgerEvent) -> Vec<Command> {
        match event {
            LedgerEvent::ContractCreated(created) if self.filter.matches(&created.template_id) => {
                debug!("Created CID: {}", created.cid);
                self.active_cids.insert(created.cid.clone());
            }
            LedgerEvent::ContractArchived(archived) if self.filter.matches(&archived.template_id) => {
                debug!("Archived CID: {}", archived.cid);
                self.active_cids.shift_remove(&archived.cid);
            }
            _ => {}
        }
        Vec::new()
    }

    fn timer_interval(&self) -> Option<Duration> {
        self.interval
    }

    fn handle_timer(&mut self) -> Vec<Command> {
        debug!("Timer elapsed: {} active contracts", self.active_cids.len());
        self.active_cids
            .iter()
            .map(|cid| Command::exercise(cid.clone(), &self.choice, ContractData::new()))
            .collect()
    }
}
