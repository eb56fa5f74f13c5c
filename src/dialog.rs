//! Confirmation dialog for removing an accounting record

use crate::model::AccountingRecord;
use crate::resources::AccountingResource;
use crate::util::escape_html;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Message shown for any failed removal
pub const COMMUNICATION_ERROR: &str = "The request could not be executed successfully";

/// Signals sent from the dialog to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
    Closed,
    Removed,
}

pub struct RemoveAccountingDialog {
    acc_to_remove: AccountingRecord,
    communication_error: Option<String>,
    accounting: Arc<dyn AccountingResource>,
    events: mpsc::UnboundedSender<DialogEvent>,
}

impl RemoveAccountingDialog {
    pub fn new(
        acc_to_remove: AccountingRecord,
        accounting: Arc<dyn AccountingResource>,
        events: mpsc::UnboundedSender<DialogEvent>,
    ) -> Self {
        Self {
            acc_to_remove,
            communication_error: None,
            accounting,
            events,
        }
    }

    pub fn acc_to_remove(&self) -> &AccountingRecord {
        &self.acc_to_remove
    }

    pub fn communication_error(&self) -> Option<&str> {
        self.communication_error.as_deref()
    }

    fn emit(&self, event: DialogEvent) {
        if self.events.send(event).is_err() {
            debug!(?event, "Dialog event dropped, parent is gone");
        }
    }

    pub fn close(&self) {
        self.emit(DialogEvent::Closed);
    }

    /// Delete the selected record.
    ///
    /// A record without an id closes the dialog without contacting the
    /// backend. Failures of any kind only set the error message.
    pub async fn remove_accounting(&mut self) {
        let Some(id) = self.acc_to_remove.id.clone() else {
            self.emit(DialogEvent::Closed);
            return;
        };

        match self.accounting.delete(&id).await {
            Ok(()) => {
                info!(accounting_id = %id, "Accounting removed");
                self.emit(DialogEvent::Removed);
            }
            Err(e) => {
                warn!(accounting_id = %id, error = %e, "Failed to remove accounting");
                self.communication_error = Some(COMMUNICATION_ERROR.to_string());
            }
        }
    }

    /// Modal markup; the buttons post back `action=close` or `action=remove`
    pub fn render(&self, form_action: &str) -> String {
        let id = self.acc_to_remove.id.as_deref().unwrap_or_default();
        let id = escape_html(id);

        let alert = match &self.communication_error {
            Some(message) => format!(
                r#"<div class="alert alert-danger"><strong>Error:</strong> {}</div>"#,
                escape_html(message)
            ),
            None => String::new(),
        };

        format!(
            r#"<div class="modal active" id="remove-accounting-dialog">
    <div class="modal-content">
        <form method="post" action="{action}">
            <input type="hidden" name="id" value="{id}">
            <div class="modal-header"><h4>Remove Accounting</h4></div>
            <div class="modal-body">Do you want to remove accounting {id}?</div>
            <div class="modal-footer text-right">
                {alert}
                <button type="submit" name="action" value="close" class="btn btn-default">Cancel</button>
                <button type="submit" name="action" value="remove" class="btn btn-primary primary">Remove</button>
            </div>
        </form>
    </div>
</div>"#,
            action = escape_html(form_action),
        )
    }
}
