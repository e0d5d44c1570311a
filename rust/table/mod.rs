//! Table Integration - Active contracts of one template as a CSV/JSON table
//!
//! - `GET /` renders the table as CSV in the configured dialect
//! - `GET /json` renders `{"rows": [...]}`

pub mod format;
pub mod projector;
pub mod render;
pub mod schema;

pub use format::{format_lookup, format_scalar, MISSING_SENTINEL};
pub use projector::{ActiveSet, ContractTableProjector, TableRow};
pub use render::{render_csv, render_json, CsvDialect, NO_DATA};
pub use schema::{column_name, derive_schema, find_scalar_columns, lookup, ColumnSchema, FieldPath, Lookup};

use crate::error::Result;
use crate::events::{Command, LedgerEvent, TemplateFilter};
use crate::integration::Integration;
use crate::webhook::{Method, WebhookRequest, WebhookResponse, WebhookRoute};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    pub target_template: TemplateFilter,
    #[serde(default)]
    pub csv_dialect: CsvDialect,
}

pub struct TableIntegration {
    filter: TemplateFilter,
    dialect: CsvDialect,
    projector: ContractTableProjector,
}

impl TableIntegration {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            filter: config.target_template.clone(),
            dialect: config.csv_dialect,
            projector: ContractTableProjector::new(),
        }
    }

    pub fn csv_body(&self) -> Result<String> {
        render_csv(&self.projector.render_rows(), self.dialect)
    }

    pub fn json_body(&self) -> serde_json::Value {
        render_json(&self.projector.render_rows())
    }
}

impl Integration for TableIntegration {
    fn kind(&self) -> &'static str {
        "table"
    }

    fn handle_ledger_event(&mut self, event: &LedgerEvent) -> Vec<Command> {
        match event {
            LedgerEvent::ContractCreated(created) if self.filter.matches(&created.template_id) => {
                self.projector
                    .record_created(created.cid.clone(), created.cdata.clone());
            }
            LedgerEvent::ContractArchived(archived) if self.filter.matches(&archived.template_id) => {
                self.projector.record_archived(&archived.cid);
            }
            _ => {}
        }
        Vec::new()
    }

    fn webhooks(&self) -> Vec<WebhookRoute> {
        vec![
            WebhookRoute::get("", "CSV Table"),
            WebhookRoute::get("/json", "JSON Table"),
        ]
    }

    fn handle_webhook(&mut self, request: &WebhookRequest) -> Result<WebhookResponse> {
        match (request.method, request.path.as_str()) {
            (Method::Get, "/") => Ok(WebhookResponse::blob_success(self.csv_body()?, "text/csv")),
            (Method::Get, "/json") => WebhookResponse::json(&self.json_body()),
            _ => Ok(WebhookResponse::not_found(&request.path)),
        }
    }
}
