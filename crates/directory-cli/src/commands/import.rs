//! Bulk imports from spreadsheet exports.
//!
//! - `import-tsv`: vendors with their suppliers and category
//! - `import-supplier-contacts`: contact fields keyed by supplier name
//! - `import-supplier-contacts-extended`: credentials, ordering and
//!   accounting details keyed by supplier name

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use directory_core::{validation, SupplierPatch, ValidationError};
use directory_crypto::{CredentialCipher, EncryptionKey};
use directory_storage::DirectoryStore;
use tracing::debug;

use super::sheet::{Row, Sheet};
use crate::output::{CliError, ImportReport};

/// Import vendors, suppliers and categories.
#[derive(Args)]
pub struct ImportTsvCommand {
    /// TSV file with `Vendor`, `Supplier` and `Category` columns
    pub file: PathBuf,
}

impl ImportTsvCommand {
    /// Runs the import.
    pub async fn run(self, store: &dyn DirectoryStore) -> Result<(), CliError> {
        let sheet = Sheet::open(&self.file, b'\t')?;
        let report = import_vendors(store, &sheet).await?;
        report.print("Imported vendors");
        Ok(())
    }
}

/// Update supplier contact fields.
#[derive(Args)]
pub struct ImportContactsCommand {
    /// CSV file keyed by a `Supplier` column
    pub file: PathBuf,
}

impl ImportContactsCommand {
    /// Runs the import.
    pub async fn run(self, store: &dyn DirectoryStore) -> Result<(), CliError> {
        let sheet = Sheet::open(&self.file, b',')?;
        let report = import_supplier_contacts(store, &sheet).await?;
        report.print("Imported supplier contacts");
        Ok(())
    }
}

/// Upsert supplier credentials and account details.
#[derive(Args)]
pub struct ImportExtendedCommand {
    /// TSV file keyed by a `Supplier` column
    pub file: PathBuf,

    /// Base64 password encryption key
    #[arg(long, env = "DIRECTORY__PASSWORD_ENCRYPTION_KEY", hide_env_values = true)]
    pub key: String,
}

impl ImportExtendedCommand {
    /// Runs the import.
    pub async fn run(self, store: &dyn DirectoryStore) -> Result<(), CliError> {
        let cipher = CredentialCipher::new(&EncryptionKey::from_base64(self.key.trim())?)?;
        let sheet = Sheet::open(&self.file, b'\t')?;
        let report = import_supplier_details(store, &cipher, &sheet, |name, created| {
            let verb = if created { "Created".green() } else { "Updated".cyan() };
            println!("{verb} supplier: {name}");
        })
        .await?;
        report.print("Imported supplier details");
        Ok(())
    }
}

/// Columns copied by `import-supplier-contacts` when present.
const CONTACT_COLUMNS: [&str; 4] = ["contact_name", "contact_email", "website", "phone"];

/// Plain text columns copied by `import-supplier-contacts-extended`.
const DETAIL_COLUMNS: [&str; 8] = [
    "website_username",
    "minimum_order_amount",
    "notes",
    "shipping_fees",
    "max_delivery_time",
    "accounting_email",
    "accounting_contact",
    "account_number",
];

fn check_name(field: &str, value: &str) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    validation::name(&mut errors, field, value);
    errors.into_result()
}

/// Get-or-creates each vendor, its suppliers and its category, then links
/// them. Rows without a vendor name are skipped.
pub async fn import_vendors(store: &dyn DirectoryStore, sheet: &Sheet) -> Result<ImportReport, CliError> {
    sheet.require(&["Vendor", "Supplier", "Category"])?;
    let mut report = ImportReport::default();

    for row in &sheet.rows {
        report.rows += 1;
        let row = match row {
            Ok(row) => row,
            Err((line, reason)) => {
                report.skip(*line, reason.clone());
                continue;
            }
        };

        let Some(vendor_name) = row.text("Vendor") else {
            report.skip(row.line, "Vendor: This field may not be blank.");
            continue;
        };
        let supplier_names: Vec<String> = row
            .get("Supplier")
            .unwrap_or_default()
            .split(',')
            .filter_map(|name| validation::non_empty(Some(name)))
            .collect();
        let category_name = row.text("Category");

        let names = std::iter::once(("Vendor", vendor_name.as_str()))
            .chain(supplier_names.iter().map(|n| ("Supplier", n.as_str())))
            .chain(category_name.iter().map(|n| ("Category", n.as_str())));
        if let Some(err) = names.filter_map(|(field, value)| check_name(field, value).err()).next() {
            report.skip(row.line, err.to_string());
            continue;
        }

        let (vendor, created) = store.get_or_create_vendor(&vendor_name).await?;
        report.created += usize::from(created);

        for name in &supplier_names {
            let (supplier, created) = store.get_or_create_supplier(name).await?;
            report.created += usize::from(created);
            store.add_vendor_supplier(vendor.id, supplier.id).await?;
            report.linked += 1;
        }

        if let Some(name) = &category_name {
            let (category, created) = store.get_or_create_category(name).await?;
            report.created += usize::from(created);
            store.add_vendor_category(vendor.id, category.id).await?;
            report.linked += 1;
        }
        debug!(line = row.line, vendor = %vendor_name, "Imported vendor row");
    }

    Ok(report)
}

/// Sets contact fields on the named supplier, creating it if needed. Only
/// columns present in the file are touched; blank cells clear the field.
pub async fn import_supplier_contacts(store: &dyn DirectoryStore, sheet: &Sheet) -> Result<ImportReport, CliError> {
    sheet.require(&["Supplier"])?;
    let mut report = ImportReport::default();

    for row in &sheet.rows {
        report.rows += 1;
        let row = match row {
            Ok(row) => row,
            Err((line, reason)) => {
                report.skip(*line, reason.clone());
                continue;
            }
        };

        let Some(name) = row.text("Supplier") else {
            report.skip(row.line, "Supplier: This field may not be blank.");
            continue;
        };
        let patch = contact_patch(row);
        if let Err(err) = check_name("Supplier", &name).and(patch.validate()) {
            report.skip(row.line, err.to_string());
            continue;
        }

        let (_, created) = store.upsert_supplier(&name, patch).await?;
        if created {
            report.created += 1;
        } else {
            report.updated += 1;
        }
    }

    Ok(report)
}

fn contact_patch(row: &Row) -> SupplierPatch {
    let cell = |column: &str| row.has(column).then(|| row.text(column));
    let [contact_name, contact_email, website, phone] = CONTACT_COLUMNS.map(cell);
    SupplierPatch {
        contact_name,
        contact_email,
        website,
        phone,
        ..SupplierPatch::default()
    }
}

/// Upserts credentials and account details on the named supplier. The
/// website password is encrypted before it reaches the store and
/// `account_active` is true only for a case-insensitive `true` cell.
/// `on_row` receives each supplier name and whether it was created.
pub async fn import_supplier_details(
    store: &dyn DirectoryStore,
    cipher: &CredentialCipher,
    sheet: &Sheet,
    mut on_row: impl FnMut(&str, bool),
) -> Result<ImportReport, CliError> {
    sheet.require(&["Supplier"])?;
    let mut report = ImportReport::default();

    for row in &sheet.rows {
        report.rows += 1;
        let row = match row {
            Ok(row) => row,
            Err((line, reason)) => {
                report.skip(*line, reason.clone());
                continue;
            }
        };

        let Some(name) = row.text("Supplier") else {
            report.skip(row.line, "Supplier: This field may not be blank.");
            continue;
        };
        let patch = detail_patch(row, cipher)?;
        if let Err(err) = check_name("Supplier", &name).and(patch.validate()) {
            report.skip(row.line, err.to_string());
            continue;
        }

        let (supplier, created) = store.upsert_supplier(&name, patch).await?;
        if created {
            report.created += 1;
        } else {
            report.updated += 1;
        }
        on_row(&supplier.name, created);
    }

    Ok(report)
}

fn detail_patch(row: &Row, cipher: &CredentialCipher) -> Result<SupplierPatch, CliError> {
    let cell = |column: &str| row.has(column).then(|| row.text(column));
    let [website_username, minimum_order_amount, notes, shipping_fees, max_delivery_time, accounting_email, accounting_contact, account_number] =
        DETAIL_COLUMNS.map(cell);

    let website_password = match cell("website_password") {
        Some(Some(plain)) => Some(Some(cipher.encrypt(&plain)?)),
        other => other.map(|_| None),
    };
    let account_active = row
        .get("account_active")
        .map(|v| v.trim().eq_ignore_ascii_case("true"));

    Ok(SupplierPatch {
        website_username,
        website_password,
        minimum_order_amount,
        notes,
        shipping_fees,
        max_delivery_time,
        accounting_email,
        accounting_contact,
        account_number,
        account_active,
        ..SupplierPatch::default()
    })
}
