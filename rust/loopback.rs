//! Loopback Integration - Answers contract creations with a choice exercise
//!
//! In "Trigger Contract" mode the created contract itself is exercised.
//! Otherwise a new `targetTemplate` contract is created for the integration
//! party and exercised with the created contract id as argument.

use crate::events::{argument, Command, LedgerEvent, TemplateFilter};
use crate::integration::Integration;
use crate::value::{ContractData, ContractValue};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetContractMode {
    TriggerContract,
    CreateAndExercise,
}

impl From<&str> for TargetContractMode {
    fn from(mode: &str) -> Self {
        match mode {
            "Trigger Contract" => TargetContractMode::TriggerContract,
            _ => TargetContractMode::CreateAndExercise,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopbackConfig {
    pub template_filter: TemplateFilter,
    pub target_contract_mode: String,
    #[serde(default)]
    pub target_template: String,
    pub template_choice: String,
}

pub struct LoopbackIntegration {
    filter: TemplateFilter,
    mode: TargetContractMode,
    target_template: String,
    choice: String,
    party: String,
}

impl LoopbackIntegration {
    pub fn new(config: &LoopbackConfig, party: impl Into<String>) -> Self {
        Self {
            filter: config.template_filter.clone(),
            mode: TargetContractMode::from(config.target_contract_mode.as_str()),
            target_template: config.target_template.clone(),
            choice: config.template_choice.clone(),
            party: party.into(),
        }
    }

    pub fn mode(&self) -> TargetContractMode {
        self.mode
    }
}

impl Integration for LoopbackIntegration {
    fn kind(&self) -> &'static str {
        "loopback"
    }

    fn handle_ledger_event(&mut self, event: &LedgerEvent) -> Vec<Command> {
        let LedgerEvent::ContractCreated(created) = event else {
            return Vec::new();
        };
        if !self.filter.matches(&created.template_id) {
            return Vec::new();
        }

        info!("loopback - created: {} ({:?})", created.cid, self.mode);

        let command = match self.mode {
            TargetContractMode::TriggerContract => {
                Command::exercise(created.cid.clone(), &self.choice, ContractData::new())
            }
            TargetContractMode::CreateAndExercise => Command::create_and_exercise(
                &self.target_template,
                argument("integrationParty", self.party.as_str()),
                &self.choice,
                argument("cid", ContractValue::ContractId(created.cid.clone())),
            ),
        };
        vec![command]
    }
}
