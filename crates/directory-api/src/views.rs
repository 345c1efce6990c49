//! Output shapes.
//!
//! Anonymous callers see a reduced supplier shape; authenticated callers see
//! every field except the stored ciphertext, which is reduced to a
//! `website_password_set` flag.

use directory_core::{Category, Contact, SupplierDetail, SupplierId, VendorDetail, VendorId};
use serde::Serialize;

/// Supplier fields visible without logging in.
#[derive(Debug, Clone, Serialize)]
pub struct PublicSupplierView {
    /// Id.
    pub id: SupplierId,
    /// Name.
    pub name: String,
    /// Contact name.
    pub contact_name: Option<String>,
    /// Contact email.
    pub contact_email: Option<String>,
    /// Website.
    pub website: Option<String>,
    /// Phone.
    pub phone: Option<String>,
}

/// Supplier fields for authenticated callers.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierView {
    /// Id.
    pub id: SupplierId,
    /// Name.
    pub name: String,
    /// Contact name.
    pub contact_name: Option<String>,
    /// Contact email.
    pub contact_email: Option<String>,
    /// Website.
    pub website: Option<String>,
    /// Phone.
    pub phone: Option<String>,
    /// Website username.
    pub website_username: Option<String>,
    /// Whether a password is stored; the password itself is never listed.
    pub website_password_set: bool,
    /// Minimum order amount.
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
    /// Account active.
    pub account_active: bool,
    /// Contacts.
    pub contacts: Vec<Contact>,
    /// Primary contact.
    pub primary_contact: Option<Contact>,
}

/// Either supplier shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SupplierOut {
    /// Anonymous shape.
    Public(PublicSupplierView),
    /// Authenticated shape.
    Full(Box<SupplierView>),
}

impl SupplierOut {
    /// Renders a supplier for a caller.
    #[must_use]
    pub fn render(detail: SupplierDetail, authenticated: bool) -> Self {
        if authenticated {
            Self::Full(Box::new(SupplierView::from(detail)))
        } else {
            Self::Public(PublicSupplierView::from(detail))
        }
    }
}

impl From<SupplierDetail> for PublicSupplierView {
    fn from(detail: SupplierDetail) -> Self {
        let s = detail.supplier;
        Self {
            id: s.id,
            name: s.name,
            contact_name: s.contact_name,
            contact_email: s.contact_email,
            website: s.website,
            phone: s.phone,
        }
    }
}

impl From<SupplierDetail> for SupplierView {
    fn from(detail: SupplierDetail) -> Self {
        let primary_contact = detail.primary_contact().cloned();
        let website_password_set = detail.supplier.has_website_password();
        let s = detail.supplier;
        Self {
            id: s.id,
            name: s.name,
            contact_name: s.contact_name,
            contact_email: s.contact_email,
            website: s.website,
            phone: s.phone,
            website_username: s.website_username,
            website_password_set,
            minimum_order_amount: s.minimum_order_amount,
            notes: s.notes,
            shipping_fees: s.shipping_fees,
            max_delivery_time: s.max_delivery_time,
            accounting_email: s.accounting_email,
            accounting_contact: s.accounting_contact,
            account_number: s.account_number,
            account_active: s.account_active,
            contacts: detail.contacts,
            primary_contact,
        }
    }
}

/// A vendor with embedded suppliers and categories.
#[derive(Debug, Clone, Serialize)]
pub struct VendorView {
    /// Id.
    pub id: VendorId,
    /// Name.
    pub name: String,
    /// Linked suppliers, in the caller's shape.
    pub suppliers: Vec<SupplierOut>,
    /// Linked categories.
    pub categories: Vec<Category>,
}

impl VendorView {
    /// Renders a vendor for a caller.
    #[must_use]
    pub fn render(detail: VendorDetail, authenticated: bool) -> Self {
        Self {
            id: detail.vendor.id,
            name: detail.vendor.name,
            suppliers: detail
                .suppliers
                .into_iter()
                .map(|s| SupplierOut::render(s, authenticated))
                .collect(),
            categories: detail.categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory_core::{ContactDraft, ContactId, EncryptedSecret, Supplier};

    fn detail() -> SupplierDetail {
        let mut supplier = Supplier::new(SupplierId::new(1), "Coast Music");
        supplier.website_password = Some(EncryptedSecret::from_token("AQ-token"));
        supplier.accounting_email = Some("ap@coast.ca".into());
        SupplierDetail {
            contacts: vec![ContactDraft::new(supplier.id, "Dana").primary().into_contact(ContactId::new(4))],
            supplier,
        }
    }

    #[test]
    fn test_public_view_redacts() {
        let json = serde_json::to_value(SupplierOut::render(detail(), false)).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 6);
        for hidden in ["accounting_email", "website_password", "website_password_set", "contacts"] {
            assert!(json.get(hidden).is_none(), "{hidden} leaked");
        }
    }

    #[test]
    fn test_full_view_hides_ciphertext() {
        let json = serde_json::to_value(SupplierOut::render(detail(), true)).unwrap();
        assert_eq!(json["website_password_set"], true);
        assert!(json.get("website_password").is_none());
        assert_eq!(json["accounting_email"], "ap@coast.ca");
        assert_eq!(json["primary_contact"]["name"], "Dana");
        assert!(!json.to_string().contains("AQ-token"));
    }
}
