//! Integration trait
//!
//! An integration owns its state and reacts to three kinds of input: ledger
//! events, timer ticks and webhook requests. Handlers return the ledger
//! commands they want executed; the host forwards them.
//!
//! # Example
//!
//! ```no_run
//! use ledger_integrations::events::{Command, LedgerEvent};
//! use ledger_integrations::integration::Integration;
//!
//! struct CountingIntegration {
//!     seen: usize,
//! }
//!
//! impl Integration for CountingIntegration {
//!     fn kind(&self) -> &'static str {
//!         "counting"
//!     }
//!
//!     fn handle_ledger_event(&mut self, _event: &LedgerEvent) -> Vec<Command> {
//!         self.seen += 1;
//!         Vec::new()
//!     }
//! }
//! ```

use crate::error::Result;
use crate::events::{Command, LedgerEvent};
use crate::webhook::{WebhookRequest, WebhookResponse, WebhookRoute};
use std::time::Duration;

pub trait Integration: Send {
    /// Integration type name, as used in configuration
    fn kind(&self) -> &'static str;

    fn handle_ledger_event(&mut self, _event: &LedgerEvent) -> Vec<Command> {
        Vec::new()
    }

    /// Period of the timer, if this integration has one
    fn timer_interval(&self) -> Option<Duration> {
        None
    }

    fn handle_timer(&mut self) -> Vec<Command> {
        Vec::new()
    }

    fn webhooks(&self) -> Vec<WebhookRoute> {
        Vec::new()
    }

    /// Called only for requests matching one of [`Integration::webhooks`].
    fn handle_webhook(&mut self, request: &WebhookRequest) -> Result<WebhookResponse> {
        Ok(WebhookResponse::not_found(&request.path))
    }
}
