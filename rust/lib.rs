pub mod config;
pub mod error;
pub mod event_log;
pub mod events;
pub mod host;
pub mod integration;
pub mod loopback;
pub mod server;
pub mod table;
pub mod timer;
pub mod value;
pub mod webhook;

pub use config::{HostSettings, IntegrationKind, IntegrationSpec};
pub use error::{IntegrationError, Result};
pub use events::{Command, LedgerEvent, TemplateFilter};
pub use host::{ChannelSink, CommandSink, IntegrationHost, NdjsonSink};
pub use integration::Integration;
pub use table::{ContractTableProjector, CsvDialect};
pub use value::{ContractData, ContractId, ContractValue};
pub use webhook::{Method, WebhookRequest, WebhookResponse, WebhookRoute};
