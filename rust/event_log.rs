//! Ledger Event Log - Bounded history of everything the ledger reports
//!
//! Records ledger/transaction lifecycle events and contract creations and
//! archivals for all templates. Contracts seen only in the startup sweep are
//! logged but not added to the history.

use crate::error::Result;
use crate::events::{Command, LedgerEvent, TemplateFilter};
use crate::integration::Integration;
use crate::value::{ContractData, ContractId};
use crate::webhook::{Method, WebhookRequest, WebhookResponse, WebhookRoute};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogConfig {
    /// Entries kept; zero or negative keeps everything
    #[serde(default)]
    pub history_bound: i64,
}

/// One history entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub integration_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<ContractId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdata: Option<ContractData>,
}

impl HistoryEntry {
    fn describe(kind: &'static str) -> Self {
        Self {
            kind,
            integration_time: Utc::now(),
            command_id: None,
            workflow_id: None,
            cid: None,
            cdata: None,
        }
    }
}

pub struct LedgerEventLog {
    bound: Option<usize>,
    filter: TemplateFilter,
    history: VecDeque<HistoryEntry>,
}

impl LedgerEventLog {
    pub fn new(config: &EventLogConfig) -> Self {
        let bound = usize::try_from(config.history_bound).ok().filter(|b| *b > 0);
        Self {
            bound,
            filter: TemplateFilter::any(),
            history: VecDeque::new(),
        }
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn extend_history(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        if let Some(bound) = self.bound {
            while self.history.len() > bound {
                self.history.pop_front();
            }
        }
    }
}

impl Integration for LedgerEventLog {
    fn kind(&self) -> &'static str {
        "ledger_event_log"
    }

    fn handle_ledger_event(&mut self, event: &LedgerEvent) -> Vec<Command> {
        let entry = match event {
            LedgerEvent::LedgerInit | LedgerEvent::LedgerReady => {
                info!("{}", event.kind());
                Some(HistoryEntry::describe(event.kind()))
            }
            LedgerEvent::TransactionStart(tx) | LedgerEvent::TransactionEnd(tx) => {
                info!("{}: {:?}", event.kind(), tx);
                Some(HistoryEntry {
                    command_id: Some(tx.command_id.clone()),
                    workflow_id: Some(tx.workflow_id.clone()),
                    ..HistoryEntry::describe(event.kind())
                })
            }
            LedgerEvent::ContractCreated(created) if self.filter.matches(&created.template_id) => {
                if created.sweep {
                    info!("contract_created (sweep): {}", created.cid);
                    None
                } else {
                    info!("contract_created: {} ({})", created.cid, created.template_id);
                    Some(HistoryEntry {
                        cid: Some(created.cid.clone()),
                        cdata: Some(created.cdata.clone()),
                        ..HistoryEntry::describe(event.kind())
                    })
                }
            }
            LedgerEvent::ContractArchived(archived) if self.filter.matches(&archived.template_id) => {
                info!("contract_archived: {} ({})", archived.cid, archived.template_id);
                Some(HistoryEntry {
                    cid: Some(archived.cid.clone()),
                    ..HistoryEntry::describe(event.kind())
                })
            }
            _ => None,
        };

        if let Some(entry) = entry {
            self.extend_history(entry);
        }
        Vec::new()
    }

    fn webhooks(&self) -> Vec<WebhookRoute> {
        vec![
            WebhookRoute::get("", "Transactions"),
            WebhookRoute::post("/reset", "Reset"),
        ]
    }

    fn handle_webhook(&mut self, request: &WebhookRequest) -> Result<WebhookResponse> {
        match (request.method, request.path.as_str()) {
            (Method::Get, "/") => WebhookResponse::json(&json!({ "transactions": self.history })),
            (Method::Post, "/reset") => {
                self.reset();
                Ok(WebhookResponse::empty_success())
            }
            _ => Ok(WebhookResponse::not_found(&request.path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TransactionEvent;
    use crate::value::ContractData;

    fn start(command_id: &str) -> LedgerEvent {
        LedgerEvent::TransactionStart(TransactionEvent {
            command_id: command_id.to_string(),
            workflow_id: "wf".to_string(),
        })
    }

    #[test]
    fn test_history_bound_keeps_latest() {
        let mut log = LedgerEventLog::new(&EventLogConfig { history_bound: 2 });
        log.handle_ledger_event(&LedgerEvent::LedgerInit);
        log.handle_ledger_event(&start("c1"));
        log.handle_ledger_event(&start("c2"));

        let kinds: Vec<Option<&str>> = log.history().iter().map(|e| e.command_id.as_deref()).collect();
        assert_eq!(kinds, vec![Some("c1"), Some("c2")]);
    }

    #[test]
    fn test_unbounded_history() {
        for bound in [0, -5] {
            let mut log = LedgerEventLog::new(&EventLogConfig { history_bound: bound });
            for i in 0..10 {
                log.handle_ledger_event(&start(&format!("c{}", i)));
            }
            assert_eq!(log.history().len(), 10);
        }
    }

    #[test]
    fn test_sweep_creations_are_not_recorded() {
        let mut log = LedgerEventLog::new(&EventLogConfig::default());
        let mut sweep = LedgerEvent::created("#1:0", "Main:Asset", ContractData::new());
        if let LedgerEvent::ContractCreated(created) = &mut sweep {
            created.sweep = true;
        }
        log.handle_ledger_event(&sweep);
        assert!(log.history().is_empty());

        log.handle_ledger_event(&LedgerEvent::created("#2:0", "Main:Asset", ContractData::new()));
        log.handle_ledger_event(&LedgerEvent::archived("#2:0", "Main:Asset"));
        let kinds: Vec<&str> = log.history().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec!["contract_created", "contract_archived"]);
        assert_eq!(log.history()[1].cid, Some(ContractId::new("#2:0")));
    }

    #[test]
    fn test_reset_webhook() {
        let mut log = LedgerEventLog::new(&EventLogConfig::default());
        log.handle_ledger_event(&LedgerEvent::LedgerReady);

        let response = log.handle_webhook(&WebhookRequest::post("/reset", "")).unwrap();
        assert_eq!(response, WebhookResponse::empty_success());
        assert!(log.history().is_empty());

        let listing = log.handle_webhook(&WebhookRequest::get("/")).unwrap();
        assert_eq!(listing.body_text(), r#"{"transactions":[]}"#);
    }
}
