//! Suppliers: distributors that carry one or more vendors' products.

use crate::contact::{primary_of, Contact};
use crate::validation::{self, NAME_MAX, PASSWORD_TOKEN_MAX, PHONE_MAX, WEBSITE_MAX};
use crate::{SupplierId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ciphertext of a supplier website password.
///
/// The token is produced by the credential cipher; this type never holds
/// plaintext and never prints its contents.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    /// Wraps a stored token.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as stored.
    #[must_use]
    pub fn as_token(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper.
    #[must_use]
    pub fn into_token(self) -> String {
        self.0
    }
}

impl fmt::Debug for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedSecret([REDACTED, {} chars])", self.0.len())
    }
}

/// A supplier record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    /// Supplier id.
    pub id: SupplierId,
    /// Display name.
    pub name: String,
    /// Legacy single contact name.
    pub contact_name: Option<String>,
    /// Legacy single contact email.
    pub contact_email: Option<String>,
    /// Ordering website.
    pub website: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Login for the ordering website.
    pub website_username: Option<String>,
    /// Encrypted password for the ordering website.
    pub website_password: Option<EncryptedSecret>,
    /// Minimum order, free text.
    pub minimum_order_amount: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Shipping fees, free text.
    pub shipping_fees: Option<String>,
    /// Maximum delivery time, free text.
    pub max_delivery_time: Option<String>,
    /// Accounts payable email.
    pub accounting_email: Option<String>,
    /// Accounts payable contact.
    pub accounting_contact: Option<String>,
    /// Our account number with the supplier.
    pub account_number: Option<String>,
    /// Whether the account is open.
    pub account_active: bool,
}

impl Supplier {
    /// Creates a supplier with only a name.
    pub fn new(id: SupplierId, name: impl Into<String>) -> Self {
        SupplierDraft::named(name).into_supplier(id)
    }

    /// Returns true if a website password is stored.
    #[must_use]
    pub fn has_website_password(&self) -> bool {
        self.website_password.is_some()
    }
}

/// Fields for creating a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierDraft {
    /// Display name.
    pub name: String,
    /// Legacy contact name.
    pub contact_name: Option<String>,
    /// Legacy contact email.
    pub contact_email: Option<String>,
    /// Website.
    pub website: Option<String>,
    /// Phone.
    pub phone: Option<String>,
    /// Website login.
    pub website_username: Option<String>,
    /// Already-encrypted website password.
    pub website_password: Option<EncryptedSecret>,
    /// Minimum order.
    pub minimum_order_amount: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Shipping fees.
    pub shipping_fees: Option<String>,
    /// Max delivery time.
    pub max_delivery_time: Option<String>,
    /// Accounting email.
    pub accounting_email: Option<String>,
    /// Accounting contact.
    pub accounting_contact: Option<String>,
    /// Account number.
    pub account_number: Option<String>,
    /// Account open.
    pub account_active: bool,
}

impl SupplierDraft {
    /// A draft with only the name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Checks lengths and email formats.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validation::name(&mut errors, "name", &self.name);
        check_optional_fields(
            &mut errors,
            &OptionalFields {
                contact_name: self.contact_name.as_deref(),
                contact_email: self.contact_email.as_deref(),
                website: self.website.as_deref(),
                phone: self.phone.as_deref(),
                website_username: self.website_username.as_deref(),
                website_password: self.website_password.as_ref(),
                accounting_email: self.accounting_email.as_deref(),
                accounting_contact: self.accounting_contact.as_deref(),
                account_number: self.account_number.as_deref(),
            },
        );
        errors.into_result()
    }

    /// Materializes the draft under a fresh id.
    #[must_use]
    pub fn into_supplier(self, id: SupplierId) -> Supplier {
        Supplier {
            id,
            name: self.name.trim().to_string(),
            contact_name: self.contact_name,
            contact_email: self.contact_email,
            website: self.website,
            phone: self.phone,
            website_username: self.website_username,
            website_password: self.website_password,
            minimum_order_amount: self.minimum_order_amount,
            notes: self.notes,
            shipping_fees: self.shipping_fees,
            max_delivery_time: self.max_delivery_time,
            accounting_email: self.accounting_email,
            accounting_contact: self.accounting_contact,
            account_number: self.account_number,
            account_active: self.account_active,
        }
    }
}

/// Partial update of a supplier.
///
/// `None` leaves a field unchanged; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierPatch {
    /// New name.
    pub name: Option<String>,
    /// Contact name.
    pub contact_name: Option<Option<String>>,
    /// Contact email.
    pub contact_email: Option<Option<String>>,
    /// Website.
    pub website: Option<Option<String>>,
    /// Phone.
    pub phone: Option<Option<String>>,
    /// Website login.
    pub website_username: Option<Option<String>>,
    /// Already-encrypted website password.
    pub website_password: Option<Option<EncryptedSecret>>,
    /// Minimum order.
    pub minimum_order_amount: Option<Option<String>>,
    /// Notes.
    pub notes: Option<Option<String>>,
    /// Shipping fees.
    pub shipping_fees: Option<Option<String>>,
    /// Max delivery time.
    pub max_delivery_time: Option<Option<String>>,
    /// Accounting email.
    pub accounting_email: Option<Option<String>>,
    /// Accounting contact.
    pub accounting_contact: Option<Option<String>>,
    /// Account number.
    pub account_number: Option<Option<String>>,
    /// Account open.
    pub account_active: Option<bool>,
}

impl SupplierPatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Checks the fields being set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        if let Some(name) = &self.name {
            validation::name(&mut errors, "name", name);
        }
        check_optional_fields(
            &mut errors,
            &OptionalFields {
                contact_name: flatten(&self.contact_name),
                contact_email: flatten(&self.contact_email),
                website: flatten(&self.website),
                phone: flatten(&self.phone),
                website_username: flatten(&self.website_username),
                website_password: self.website_password.as_ref().and_then(Option::as_ref),
                accounting_email: flatten(&self.accounting_email),
                accounting_contact: flatten(&self.accounting_contact),
                account_number: flatten(&self.account_number),
            },
        );
        errors.into_result()
    }

    /// Applies the patch in place.
    pub fn apply(&self, supplier: &mut Supplier) {
        if let Some(name) = &self.name {
            supplier.name = name.trim().to_string();
        }
        set(&mut supplier.contact_name, &self.contact_name);
        set(&mut supplier.contact_email, &self.contact_email);
        set(&mut supplier.website, &self.website);
        set(&mut supplier.phone, &self.phone);
        set(&mut supplier.website_username, &self.website_username);
        set(&mut supplier.website_password, &self.website_password);
        set(&mut supplier.minimum_order_amount, &self.minimum_order_amount);
        set(&mut supplier.notes, &self.notes);
        set(&mut supplier.shipping_fees, &self.shipping_fees);
        set(&mut supplier.max_delivery_time, &self.max_delivery_time);
        set(&mut supplier.accounting_email, &self.accounting_email);
        set(&mut supplier.accounting_contact, &self.accounting_contact);
        set(&mut supplier.account_number, &self.account_number);
        if let Some(active) = self.account_active {
            supplier.account_active = active;
        }
    }
}

fn set<T: Clone>(target: &mut Option<T>, change: &Option<Option<T>>) {
    if let Some(value) = change {
        target.clone_from(value);
    }
}

fn flatten(value: &Option<Option<String>>) -> Option<&str> {
    value.as_ref().and_then(|v| v.as_deref())
}

struct OptionalFields<'a> {
    contact_name: Option<&'a str>,
    contact_email: Option<&'a str>,
    website: Option<&'a str>,
    phone: Option<&'a str>,
    website_username: Option<&'a str>,
    website_password: Option<&'a EncryptedSecret>,
    accounting_email: Option<&'a str>,
    accounting_contact: Option<&'a str>,
    account_number: Option<&'a str>,
}

fn check_optional_fields(errors: &mut ValidationError, f: &OptionalFields<'_>) {
    validation::max_chars(errors, "contact_name", f.contact_name, NAME_MAX);
    validation::max_chars(errors, "contact_email", f.contact_email, NAME_MAX);
    validation::max_chars(errors, "website", f.website, WEBSITE_MAX);
    validation::max_chars(errors, "phone", f.phone, PHONE_MAX);
    validation::max_chars(errors, "website_username", f.website_username, WEBSITE_MAX);
    validation::max_chars(
        errors,
        "website_password",
        f.website_password.map(EncryptedSecret::as_token),
        PASSWORD_TOKEN_MAX,
    );
    validation::email(errors, "accounting_email", f.accounting_email);
    validation::max_chars(errors, "accounting_email", f.accounting_email, NAME_MAX);
    validation::max_chars(errors, "accounting_contact", f.accounting_contact, NAME_MAX);
    validation::max_chars(errors, "account_number", f.account_number, NAME_MAX);
}

/// A supplier together with its contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDetail {
    /// The supplier.
    pub supplier: Supplier,
    /// Its contacts, ordered by id.
    pub contacts: Vec<Contact>,
}

impl SupplierDetail {
    /// Returns the primary contact, if one is flagged.
    #[must_use]
    pub fn primary_contact(&self) -> Option<&Contact> {
        primary_of(&self.contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = EncryptedSecret::from_token("gAAAAAB-super-secret");
        let debug = format!("{secret:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_draft_validation() {
        let draft = SupplierDraft {
            accounting_email: Some("bad".to_string()),
            phone: Some("1".repeat(40)),
            ..SupplierDraft::named("")
        };
        let errors = draft.validate().unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("accounting_email"));
        assert!(errors.has("phone"));

        assert!(SupplierDraft::named("Long & McQuade").validate().is_ok());
    }

    #[test]
    fn test_long_accounting_email_is_rejected() {
        // well-formed, but longer than the column allows
        let domain = ["a", "b", "c", "d"].map(|label| label.repeat(50)).join(".");
        let email = format!("accounts@{domain}.com");
        assert!(email.chars().count() > NAME_MAX);
        let draft = SupplierDraft {
            accounting_email: Some(email),
            ..SupplierDraft::named("Alpha")
        };
        let errors = draft.validate().unwrap_err();
        assert_eq!(
            errors.fields["accounting_email"],
            vec![format!("Ensure this field has no more than {NAME_MAX} characters.")]
        );
    }

    #[test]
    fn test_patch_apply_sets_and_clears() {
        let mut supplier = Supplier::new(SupplierId::new(1), "Coast Music");
        supplier.notes = Some("old".to_string());
        supplier.website_password = Some(EncryptedSecret::from_token("tok"));

        let patch = SupplierPatch {
            phone: Some(Some("604-555-0100".to_string())),
            notes: Some(None),
            account_active: Some(true),
            ..SupplierPatch::default()
        };
        patch.apply(&mut supplier);

        assert_eq!(supplier.phone.as_deref(), Some("604-555-0100"));
        assert_eq!(supplier.notes, None);
        assert!(supplier.account_active);
        // untouched fields survive
        assert!(supplier.has_website_password());
        assert_eq!(supplier.name, "Coast Music");
    }

    #[test]
    fn test_empty_patch() {
        assert!(SupplierPatch::default().is_empty());
        let patch = SupplierPatch {
            name: Some("x".into()),
            ..SupplierPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
