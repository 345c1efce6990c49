//! Backfills contact records from the legacy supplier contact fields.

use clap::Args;
use directory_core::{Contact, ContactDraft, ListQuery, SupplierDetail};
use directory_storage::DirectoryStore;
use tracing::debug;

use crate::output::{CliError, ImportReport};

/// Create contacts from supplier fields.
#[derive(Args)]
pub struct PopulateContactsCommand {}

impl PopulateContactsCommand {
    /// Runs the backfill.
    pub async fn run(self, store: &dyn DirectoryStore) -> Result<(), CliError> {
        let report = populate_contacts(store).await?;
        report.print("Populated contacts");
        Ok(())
    }
}

/// For every supplier, adds a primary contact from `contact_name` and
/// `contact_email` and a regular one from `accounting_contact` and
/// `accounting_email`. A supplier that already has a contact with the same
/// name and email is left alone, so the command can be re-run.
pub async fn populate_contacts(store: &dyn DirectoryStore) -> Result<ImportReport, CliError> {
    let suppliers = store.list_suppliers(&ListQuery::all()).await?.items;
    let mut report = ImportReport::default();

    for detail in &suppliers {
        report.rows += 1;
        let supplier = &detail.supplier;
        let candidates = [
            (supplier.contact_name.as_deref(), supplier.contact_email.as_deref(), true),
            (supplier.accounting_contact.as_deref(), supplier.accounting_email.as_deref(), false),
        ];

        for (name, email, primary) in candidates {
            let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            let email = email.map(str::trim).filter(|e| !e.is_empty());
            if has_contact(detail, name, email) {
                continue;
            }

            let mut draft = ContactDraft::new(supplier.id, name);
            draft.email = email.map(str::to_string);
            draft.primary_contact = primary;
            if let Err(err) = draft.validate() {
                report.skip_supplier(supplier.id, &supplier.name, err.to_string());
                continue;
            }

            let contact = store.create_contact(draft).await?;
            debug!(supplier = %supplier.name, contact = %contact.name, primary, "Created contact");
            report.created += 1;
        }
    }

    Ok(report)
}

fn has_contact(detail: &SupplierDetail, name: &str, email: Option<&str>) -> bool {
    detail
        .contacts
        .iter()
        .any(|c: &Contact| c.name == name && c.email.as_deref() == email)
}
