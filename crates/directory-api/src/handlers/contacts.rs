//! Contact handlers. Every contact endpoint requires an authenticated caller.
//!
//! Marking a contact primary demotes the supplier's previous primary in the
//! same store call.

use crate::{
    extract::{AuthUser, IdPath, JsonBody},
    nullable,
    pagination::{self, ListParams, ListResponse},
    response::{Created, NoContent},
    state::AppState,
    ApiResult,
};
use axum::{
    extract::{Query, State},
    http::Uri,
    Json,
};
use directory_core::{Contact, ContactDraft, ContactId, ContactPatch, ContactQuery, SupplierId, ValidationError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Contact list query string.
#[derive(Debug, Default, Deserialize)]
pub struct ContactParams {
    /// Restrict to one supplier.
    pub supplier: Option<String>,
    /// Search and pagination.
    #[serde(flatten)]
    pub list: ListParams,
}

impl ContactParams {
    fn filter(&self) -> ApiResult<ContactQuery> {
        let supplier = match self.supplier.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map(SupplierId::new)
                    .map_err(|_| ValidationError::field("supplier", "A valid integer is required."))?,
            ),
        };
        Ok(ContactQuery { supplier })
    }
}

/// Contact create/update body.
#[derive(Debug, Default, Deserialize)]
pub struct ContactWrite {
    /// Owning supplier.
    #[serde(alias = "supplier_id")]
    pub supplier: Option<SupplierId>,
    /// Name.
    pub name: Option<String>,
    /// Email.
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub email: Option<Option<String>>,
    /// Phone.
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub phone: Option<Option<String>>,
    /// Title.
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub title: Option<Option<String>>,
    /// Notes.
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub notes: Option<Option<String>>,
    /// Primary flag.
    pub primary_contact: Option<bool>,
}

impl ContactWrite {
    fn required(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        if self.supplier.is_none() {
            errors.add("supplier", "This field is required.");
        }
        if self.name.is_none() {
            errors.add("name", "This field is required.");
        }
        errors.into_result()
    }

    fn into_draft(self) -> ApiResult<ContactDraft> {
        self.required()?;
        let mut draft = ContactDraft::new(
            self.supplier.unwrap_or(SupplierId::new(0)),
            self.name.unwrap_or_default(),
        );
        draft.email = nullable::text(self.email).flatten();
        draft.phone = nullable::text(self.phone).flatten();
        draft.title = nullable::text(self.title).flatten();
        draft.notes = nullable::text(self.notes).flatten();
        draft.primary_contact = self.primary_contact.unwrap_or(false);
        draft.validate()?;
        Ok(draft)
    }

    fn into_patch(self, partial: bool) -> ApiResult<ContactPatch> {
        if !partial {
            self.required()?;
        }
        let patch = ContactPatch {
            supplier_id: self.supplier,
            name: self.name,
            email: nullable::text(self.email),
            phone: nullable::text(self.phone),
            title: nullable::text(self.title),
            notes: nullable::text(self.notes),
            primary_contact: self.primary_contact,
        };
        patch.validate()?;
        Ok(patch)
    }
}

/// Lists contacts, optionally for one supplier.
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(params): Query<ContactParams>,
    uri: Uri,
) -> ApiResult<ListResponse<Contact>> {
    let filter = params.filter()?;
    pagination::list(&params.list, &uri, |query| {
        let state = state.clone();
        async move { Ok(state.store.list_contacts(filter, &query).await?) }
    })
    .await
}

/// Gets one contact.
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    IdPath(id): IdPath<ContactId>,
) -> ApiResult<Json<Contact>> {
    Ok(Json(state.store.get_contact(id).await?))
}

/// Creates a contact.
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<ContactWrite>,
) -> ApiResult<Created<Contact>> {
    let contact = state.store.create_contact(body.into_draft()?).await?;
    info!(
        contact_id = %contact.id,
        supplier_id = %contact.supplier_id,
        primary = contact.primary_contact,
        user = %user.username,
        "Contact created"
    );
    let location = format!("/routes/contacts/{}", contact.id);
    Ok(Created::new(contact, location))
}

/// Replaces a contact's fields; `supplier` and `name` are required.
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<ContactId>,
    JsonBody(body): JsonBody<ContactWrite>,
) -> ApiResult<Json<Contact>> {
    write_contact(&state, &user.username, id, body.into_patch(false)?).await
}

/// Partially updates a contact.
pub async fn patch_contact(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<ContactId>,
    JsonBody(body): JsonBody<ContactWrite>,
) -> ApiResult<Json<Contact>> {
    write_contact(&state, &user.username, id, body.into_patch(true)?).await
}

async fn write_contact(state: &AppState, username: &str, id: ContactId, patch: ContactPatch) -> ApiResult<Json<Contact>> {
    let contact = state.store.update_contact(id, patch).await?;
    info!(contact_id = %id, primary = contact.primary_contact, user = %username, "Contact updated");
    Ok(Json(contact))
}

/// Deletes a contact. A deleted primary is not replaced.
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<ContactId>,
) -> ApiResult<NoContent> {
    state.store.delete_contact(id).await?;
    info!(contact_id = %id, user = %user.username, "Contact deleted");
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_filter_parsing() {
        let params = ContactParams {
            supplier: Some("7".into()),
            ..ContactParams::default()
        };
        assert_eq!(params.filter().unwrap().supplier, Some(SupplierId::new(7)));

        let params = ContactParams {
            supplier: Some("seven".into()),
            ..ContactParams::default()
        };
        assert!(params.filter().is_err());
        assert_eq!(ContactParams::default().filter().unwrap().supplier, None);
    }

    #[test]
    fn test_create_requires_supplier_and_name() {
        let err = ContactWrite::default().into_draft().unwrap_err();
        match err {
            crate::ApiError::Validation(v) => {
                assert!(v.has("supplier"));
                assert!(v.has("name"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_supplier_id_alias() {
        let body: ContactWrite =
            serde_json::from_str(r#"{"supplier_id":3,"name":"Dana","primary_contact":true}"#).unwrap();
        let draft = body.into_draft().unwrap();
        assert_eq!(draft.supplier_id, SupplierId::new(3));
        assert!(draft.primary_contact);
    }
}
