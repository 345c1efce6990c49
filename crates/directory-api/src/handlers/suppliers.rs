//! Supplier handlers.
//!
//! Writes take the website password in plaintext; it is encrypted once,
//! here, before it reaches the store. Reads never return it except through
//! the staff-only reveal endpoint.

use crate::{
    extract::{AuthUser, IdPath, JsonBody, MaybeUser, StaffUser},
    nullable,
    pagination::{self, ListParams, ListResponse},
    response::{Created, NoContent},
    state::AppState,
    views::SupplierOut,
    ApiResult,
};
use axum::{
    extract::{Query, State},
    http::Uri,
    Json,
};
use directory_core::{EncryptedSecret, Supplier, SupplierDraft, SupplierId, SupplierPatch, ValidationError};
use directory_crypto::CredentialCipher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Supplier create/update body. Text fields accept `null` or `""` to clear.
#[allow(missing_docs)]
#[derive(Debug, Default, Deserialize)]
pub struct SupplierWrite {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub website_username: Option<Option<String>>,
    /// Plaintext; encrypted before storage.
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub website_password: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub minimum_order_amount: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub shipping_fees: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub max_delivery_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub accounting_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub accounting_contact: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub account_number: Option<Option<String>>,
    pub account_active: Option<bool>,
}

impl SupplierWrite {
    /// Converts to a patch, encrypting any new password. Full updates must
    /// name the supplier.
    pub fn into_patch(self, cipher: &CredentialCipher, partial: bool) -> ApiResult<SupplierPatch> {
        if !partial && self.name.is_none() {
            return Err(name_required().into());
        }
        let website_password = encrypt_change(cipher, self.website_password)?;
        let patch = SupplierPatch {
            name: self.name,
            contact_name: nullable::text(self.contact_name),
            contact_email: nullable::text(self.contact_email),
            website: nullable::text(self.website),
            phone: nullable::text(self.phone),
            website_username: nullable::text(self.website_username),
            website_password,
            minimum_order_amount: nullable::text(self.minimum_order_amount),
            notes: nullable::text(self.notes),
            shipping_fees: nullable::text(self.shipping_fees),
            max_delivery_time: nullable::text(self.max_delivery_time),
            accounting_email: nullable::text(self.accounting_email),
            accounting_contact: nullable::text(self.accounting_contact),
            account_number: nullable::text(self.account_number),
            account_active: self.account_active,
        };
        patch.validate()?;
        Ok(patch)
    }

    /// Converts to a draft for creation.
    pub fn into_draft(self, cipher: &CredentialCipher) -> ApiResult<SupplierDraft> {
        let patch = self.into_patch(cipher, false)?;
        let mut supplier = Supplier::new(SupplierId::new(0), "");
        patch.apply(&mut supplier);

        let draft = SupplierDraft {
            name: supplier.name,
            contact_name: supplier.contact_name,
            contact_email: supplier.contact_email,
            website: supplier.website,
            phone: supplier.phone,
            website_username: supplier.website_username,
            website_password: supplier.website_password,
            minimum_order_amount: supplier.minimum_order_amount,
            notes: supplier.notes,
            shipping_fees: supplier.shipping_fees,
            max_delivery_time: supplier.max_delivery_time,
            accounting_email: supplier.accounting_email,
            accounting_contact: supplier.accounting_contact,
            account_number: supplier.account_number,
            account_active: supplier.account_active,
        };
        draft.validate()?;
        Ok(draft)
    }
}

fn name_required() -> ValidationError {
    ValidationError::field("name", "This field is required.")
}

fn encrypt_change(
    cipher: &CredentialCipher,
    change: Option<Option<String>>,
) -> ApiResult<Option<Option<EncryptedSecret>>> {
    match change {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(plain)) if plain.is_empty() => Ok(Some(None)),
        Some(Some(plain)) => Ok(Some(Some(cipher.encrypt(&plain)?))),
    }
}

/// Decrypted website credentials.
#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordReveal {
    /// Supplier id.
    pub id: SupplierId,
    /// Website username.
    pub website_username: Option<String>,
    /// Decrypted website password.
    pub website_password: Option<String>,
}

/// Decrypts a supplier's stored website password.
pub fn reveal(cipher: &CredentialCipher, supplier: &Supplier) -> ApiResult<Option<String>> {
    Ok(supplier
        .website_password
        .as_ref()
        .map(|secret| cipher.decrypt(secret))
        .transpose()?)
}

/// Lists suppliers.
pub async fn list_suppliers(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<ListParams>,
    uri: Uri,
) -> ApiResult<ListResponse<SupplierOut>> {
    let authenticated = user.is_some();
    pagination::list(&params, &uri, |query| {
        let state = state.clone();
        async move {
            let page = state.store.list_suppliers(&query).await?;
            Ok(page.map(|s| SupplierOut::render(s, authenticated)))
        }
    })
    .await
}

/// Gets one supplier.
pub async fn get_supplier(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    IdPath(id): IdPath<SupplierId>,
) -> ApiResult<Json<SupplierOut>> {
    let detail = state.store.get_supplier(id).await?;
    Ok(Json(SupplierOut::render(detail, user.is_some())))
}

/// Creates a supplier.
pub async fn create_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<SupplierWrite>,
) -> ApiResult<Created<SupplierOut>> {
    let draft = body.into_draft(&state.cipher)?;
    let detail = state.store.create_supplier(draft).await?;
    info!(supplier_id = %detail.supplier.id, user = %user.username, "Supplier created");

    let location = format!("/routes/suppliers/{}", detail.supplier.id);
    Ok(Created::new(SupplierOut::render(detail, true), location))
}

/// Replaces a supplier's fields. Omitted fields are left alone; `name` is
/// required.
pub async fn update_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<SupplierId>,
    JsonBody(body): JsonBody<SupplierWrite>,
) -> ApiResult<Json<SupplierOut>> {
    let patch = body.into_patch(&state.cipher, false)?;
    write_supplier(&state, &user.username, id, patch).await
}

/// Partially updates a supplier.
pub async fn patch_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<SupplierId>,
    JsonBody(body): JsonBody<SupplierWrite>,
) -> ApiResult<Json<SupplierOut>> {
    let patch = body.into_patch(&state.cipher, true)?;
    write_supplier(&state, &user.username, id, patch).await
}

async fn write_supplier(
    state: &AppState,
    username: &str,
    id: SupplierId,
    patch: SupplierPatch,
) -> ApiResult<Json<SupplierOut>> {
    let password_changed = patch.website_password.is_some();
    let detail = state.store.update_supplier(id, patch).await?;
    info!(supplier_id = %id, user = %username, password_changed, "Supplier updated");
    Ok(Json(SupplierOut::render(detail, true)))
}

/// Deletes a supplier with its contacts.
pub async fn delete_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<SupplierId>,
) -> ApiResult<NoContent> {
    state.store.delete_supplier(id).await?;
    info!(supplier_id = %id, user = %user.username, "Supplier deleted");
    Ok(NoContent)
}

/// Reveals the decrypted website credentials. Staff only.
pub async fn reveal_password(
    State(state): State<Arc<AppState>>,
    StaffUser(user): StaffUser,
    IdPath(id): IdPath<SupplierId>,
) -> ApiResult<Json<PasswordReveal>> {
    let detail = state.store.get_supplier(id).await?;
    let website_password = reveal(&state.cipher, &detail.supplier)?;
    info!(supplier_id = %id, user = %user.username, "Supplier password revealed");

    Ok(Json(PasswordReveal {
        id,
        website_username: detail.supplier.website_username,
        website_password,
    }))
}
