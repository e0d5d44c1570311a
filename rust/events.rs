//! Ledger Events - What the ledger delivers to integrations and what
//! integrations hand back for it to execute

use crate::error::{IntegrationError, Result};
use crate::value::{ContractData, ContractId, ContractValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction boundary details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub command_id: String,
    #[serde(default)]
    pub workflow_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub cid: ContractId,
    pub template_id: String,
    #[serde(default)]
    pub cdata: ContractData,
    /// Delivered by the initial active-contract sweep rather than the live
    /// transaction stream.
    #[serde(default)]
    pub sweep: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedEvent {
    pub cid: ContractId,
    pub template_id: String,
}

/// Ledger lifecycle event, one JSON object per line on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    LedgerInit,
    LedgerReady,
    TransactionStart(TransactionEvent),
    TransactionEnd(TransactionEvent),
    ContractCreated(CreatedEvent),
    ContractArchived(ArchivedEvent),
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::LedgerInit => "ledger_init",
            LedgerEvent::LedgerReady => "ledger_ready",
            LedgerEvent::TransactionStart(_) => "transaction_start",
            LedgerEvent::TransactionEnd(_) => "transaction_end",
            LedgerEvent::ContractCreated(_) => "contract_created",
            LedgerEvent::ContractArchived(_) => "contract_archived",
        }
    }

    pub fn from_json_line(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| IntegrationError::Decode(format!("invalid ledger event: {}", e)))
    }

    pub fn created(cid: impl Into<ContractId>, template_id: &str, cdata: ContractData) -> Self {
        LedgerEvent::ContractCreated(CreatedEvent {
            cid: cid.into(),
            template_id: template_id.to_string(),
            cdata,
            sweep: false,
        })
    }

    pub fn archived(cid: impl Into<ContractId>, template_id: &str) -> Self {
        LedgerEvent::ContractArchived(ArchivedEvent {
            cid: cid.into(),
            template_id: template_id.to_string(),
        })
    }
}

/// Template selector for contract events.
///
/// `*` matches every template. Any other filter matches a template id equal
/// to it, or a package-qualified id ending in `:<filter>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateFilter(String);

impl TemplateFilter {
    pub const WILDCARD: &'static str = "*";

    pub fn new(filter: impl Into<String>) -> Self {
        Self(filter.into())
    }

    pub fn any() -> Self {
        Self::new(Self::WILDCARD)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, template_id: &str) -> bool {
        let filter = self.0.as_str();
        filter == Self::WILDCARD
            || template_id == filter
            || template_id
                .strip_suffix(filter)
                .map_or(false, |qualifier| qualifier.ends_with(':'))
    }
}

impl fmt::Display for TemplateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateFilter {
    fn from(filter: &str) -> Self {
        Self::new(filter)
    }
}

/// Ledger command returned by an integration handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Exercise {
        cid: ContractId,
        choice: String,
        argument: ContractData,
    },
    CreateAndExercise {
        template_id: String,
        payload: ContractData,
        choice: String,
        argument: ContractData,
    },
}

impl Command {
    pub fn exercise(cid: ContractId, choice: &str, argument: ContractData) -> Self {
        Command::Exercise {
            cid,
            choice: choice.to_string(),
            argument,
        }
    }

    pub fn create_and_exercise(
        template_id: &str,
        payload: ContractData,
        choice: &str,
        argument: ContractData,
    ) -> Self {
        Command::CreateAndExercise {
            template_id: template_id.to_string(),
            payload,
            choice: choice.to_string(),
            argument,
        }
    }
}

/// Single-field argument record, e.g. `{"cid": <contract id>}`.
pub fn argument(name: &str, value: impl Into<ContractValue>) -> ContractData {
    let mut fields = ContractData::new();
    fields.insert(name.to_string(), value.into());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_event_lines() {
        let created = LedgerEvent::from_json_line(
            r##"{"type":"contract_created","cid":"#1:0","template_id":"pkg:Main:Invoice","cdata":{"amount":{"$decimal":"1.00"}}}"##,
        )
        .unwrap();
        match &created {
            LedgerEvent::ContractCreated(event) => {
                assert_eq!(event.cid.as_str(), "#1:0");
                assert!(!event.sweep);
                assert_eq!(event.cdata.len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(created.kind(), "contract_created");

        let start = LedgerEvent::from_json_line(
            r#"{"type":"transaction_start","command_id":"c1","workflow_id":"w1"}"#,
        )
        .unwrap();
        assert_eq!(
            start,
            LedgerEvent::TransactionStart(TransactionEvent {
                command_id: "c1".to_string(),
                workflow_id: "w1".to_string(),
            })
        );

        assert_eq!(
            LedgerEvent::from_json_line(r#"{"type":"ledger_ready"}"#).unwrap(),
            LedgerEvent::LedgerReady
        );
    }

    #[test]
    fn test_undecodable_lines() {
        assert!(LedgerEvent::from_json_line("not json").is_err());
        assert!(LedgerEvent::from_json_line(r#"{"type":"mystery"}"#).is_err());
    }

    #[test]
    fn test_odd_field_values_keep_the_event() {
        let event = LedgerEvent::from_json_line(
            r##"{"type":"contract_created","cid":"#1:0","template_id":"T",
                "cdata":{"d":{"$date":"nope"},"meta":{"$ref":5}}}"##,
        )
        .unwrap();
        let LedgerEvent::ContractCreated(created) = event else {
            panic!("expected contract_created");
        };
        assert_eq!(created.cdata["d"], ContractValue::from("nope"));
        assert!(created.cdata["meta"].as_record().is_some());
    }

    #[test]
    fn test_template_filter() {
        assert!(TemplateFilter::any().matches("anything:at:all"));

        let filter = TemplateFilter::new("Main:Invoice");
        assert!(filter.matches("Main:Invoice"));
        assert!(filter.matches("0123abcd:Main:Invoice"));
        assert!(!filter.matches("Main:InvoiceLine"));
        assert!(!filter.matches("Other:Main:Invoices"));
        assert!(!filter.matches("XMain:Invoice"));
    }

    #[test]
    fn test_command_wire_format() {
        let command = Command::exercise(ContractId::new("#3:0"), "Tick", ContractData::new());
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            serde_json::json!({"command": "exercise", "cid": "#3:0", "choice": "Tick", "argument": {}})
        );
    }
}
