//! Staff-only admin surface.
//!
//! Listings carry the admin columns for each entity; the supplier change
//! view groups fields into fieldsets and shows the decrypted website
//! password.

use crate::{
    error::ApiError,
    extract::{IdPath, StaffUser},
    handlers::suppliers::reveal,
    pagination::{self, ListParams, ListResponse},
    response::NoContent,
    state::AppState,
    ApiResult,
};
use axum::{
    extract::{Query, State},
    http::Uri,
    Json,
};
use directory_core::{Category, Contact, Supplier, SupplierDetail, SupplierId, VendorDetail, VendorId};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Field groups of the supplier change view.
pub const SUPPLIER_FIELDSETS: &[(Option<&str>, &[&str])] = &[
    (None, &["name", "contact_name", "contact_email", "website", "phone"]),
    (Some("Website Credentials"), &["website_username", "website_password"]),
    (
        Some("Order & Shipping Details"),
        &["minimum_order_amount", "shipping_fees", "max_delivery_time"],
    ),
    (
        Some("Accounting"),
        &["accounting_email", "accounting_contact", "account_number", "account_active"],
    ),
    (Some("Other"), &["notes"]),
];

/// Vendor admin row.
#[derive(Debug, Serialize)]
pub struct VendorRow {
    /// Id.
    pub id: VendorId,
    /// Name.
    pub name: String,
    /// Linked supplier names, comma separated.
    pub suppliers: String,
}

impl From<VendorDetail> for VendorRow {
    fn from(detail: VendorDetail) -> Self {
        Self {
            suppliers: detail.supplier_names(),
            id: detail.vendor.id,
            name: detail.vendor.name,
        }
    }
}

/// Supplier admin row.
#[allow(missing_docs)]
#[derive(Debug, Serialize)]
pub struct SupplierRow {
    pub id: SupplierId,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub accounting_email: Option<String>,
    pub accounting_contact: Option<String>,
    pub account_number: Option<String>,
    pub account_active: bool,
}

impl From<SupplierDetail> for SupplierRow {
    fn from(detail: SupplierDetail) -> Self {
        let s = detail.supplier;
        Self {
            id: s.id,
            name: s.name,
            contact_name: s.contact_name,
            contact_email: s.contact_email,
            website: s.website,
            phone: s.phone,
            accounting_email: s.accounting_email,
            accounting_contact: s.accounting_contact,
            account_number: s.account_number,
            account_active: s.account_active,
        }
    }
}

/// One fieldset of the supplier change view.
#[derive(Debug, Serialize)]
pub struct Fieldset {
    /// Heading; the first group has none.
    pub title: Option<String>,
    /// Field values keyed by field name, in display order.
    pub fields: Vec<FieldValue>,
}

/// A field in a fieldset.
#[derive(Debug, Serialize)]
pub struct FieldValue {
    /// Field name.
    pub name: String,
    /// Current value.
    pub value: Value,
}

/// Supplier change view.
#[derive(Debug, Serialize)]
pub struct SupplierChangeView {
    /// Id.
    pub id: SupplierId,
    /// Grouped fields. `website_password` shows only whether one is stored.
    pub fieldsets: Vec<Fieldset>,
    /// Decrypted website password.
    pub original_website_password: Option<String>,
    /// Inline contacts.
    pub contacts: Vec<Contact>,
}

/// Groups a supplier's fields into the admin fieldsets.
pub fn fieldsets(supplier: &Supplier) -> ApiResult<Vec<Fieldset>> {
    let mut values = match serde_json::to_value(supplier) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };
    values.insert(
        "website_password".to_string(),
        Value::Bool(supplier.has_website_password()),
    );

    Ok(SUPPLIER_FIELDSETS
        .iter()
        .map(|(title, names)| Fieldset {
            title: title.map(str::to_string),
            fields: names
                .iter()
                .map(|name| FieldValue {
                    name: (*name).to_string(),
                    value: values.get(*name).cloned().unwrap_or(Value::Null),
                })
                .collect(),
        })
        .collect())
}

/// Vendor listing; searches vendor, supplier and category names.
pub async fn list_vendors(
    State(state): State<Arc<AppState>>,
    StaffUser(_user): StaffUser,
    Query(params): Query<ListParams>,
    uri: Uri,
) -> ApiResult<ListResponse<VendorRow>> {
    pagination::list(&params, &uri, |query| {
        let state = state.clone();
        async move { Ok(state.store.list_vendors(&query).await?.map(VendorRow::from)) }
    })
    .await
}

/// Supplier listing.
pub async fn list_suppliers(
    State(state): State<Arc<AppState>>,
    StaffUser(_user): StaffUser,
    Query(params): Query<ListParams>,
    uri: Uri,
) -> ApiResult<ListResponse<SupplierRow>> {
    pagination::list(&params, &uri, |query| {
        let state = state.clone();
        async move { Ok(state.store.list_suppliers(&query).await?.map(SupplierRow::from)) }
    })
    .await
}

/// Category listing.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    StaffUser(_user): StaffUser,
    Query(params): Query<ListParams>,
    uri: Uri,
) -> ApiResult<ListResponse<Category>> {
    pagination::list(&params, &uri, |query| {
        let state = state.clone();
        async move { Ok(state.store.list_categories(&query).await?) }
    })
    .await
}

/// Supplier change view with the decrypted password.
pub async fn supplier_detail(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    IdPath(id): IdPath<SupplierId>,
) -> ApiResult<Json<SupplierChangeView>> {
    let detail = state.store.get_supplier(id).await?;
    let original_website_password = reveal(&state.cipher, &detail.supplier)?;
    if original_website_password.is_some() {
        info!(supplier_id = %id, user = %user.username, "Supplier password revealed in admin");
    }

    Ok(Json(SupplierChangeView {
        id,
        fieldsets: fieldsets(&detail.supplier)?,
        original_website_password,
        contacts: detail.contacts,
    }))
}

/// Inline editor: links a supplier to a vendor.
pub async fn link_supplier(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    IdPath((vendor_id, supplier_id)): IdPath<(VendorId, SupplierId)>,
) -> ApiResult<Json<VendorRow>> {
    state.store.add_vendor_supplier(vendor_id, supplier_id).await?;
    info!(vendor_id = %vendor_id, supplier_id = %supplier_id, user = %user.username, "Supplier linked");
    Ok(Json(state.store.get_vendor(vendor_id).await?.into()))
}

/// Inline editor: unlinks a supplier from a vendor.
pub async fn unlink_supplier(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    IdPath((vendor_id, supplier_id)): IdPath<(VendorId, SupplierId)>,
) -> ApiResult<NoContent> {
    state.store.remove_vendor_supplier(vendor_id, supplier_id).await?;
    info!(vendor_id = %vendor_id, supplier_id = %supplier_id, user = %user.username, "Supplier unlinked");
    Ok(NoContent)
}
