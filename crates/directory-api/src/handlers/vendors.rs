//! Vendor handlers.

use crate::{
    extract::{AuthUser, IdPath, JsonBody, MaybeUser},
    pagination::{self, ListParams, ListResponse},
    response::{Created, NoContent},
    state::AppState,
    views::VendorView,
    ApiResult,
};
use axum::{
    extract::{Query, State},
    http::Uri,
    Json,
};
use directory_core::{CategoryId, SupplierId, ValidationError, VendorDraft, VendorId, VendorPatch};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Vendor create/update body.
///
/// Omitted link lists leave the existing links alone on update; a list that
/// is present replaces them.
#[derive(Debug, Default, Deserialize)]
pub struct VendorWrite {
    /// Vendor name.
    pub name: Option<String>,
    /// Linked supplier ids.
    pub supplier_ids: Option<Vec<SupplierId>>,
    /// Linked category ids.
    pub category_ids: Option<Vec<CategoryId>>,
}

impl VendorWrite {
    fn into_draft(self) -> ApiResult<VendorDraft> {
        let name = self.name.ok_or_else(name_required)?;
        let draft = VendorDraft {
            name,
            supplier_ids: self.supplier_ids.unwrap_or_default(),
            category_ids: self.category_ids.unwrap_or_default(),
        };
        draft.validate()?;
        Ok(draft)
    }

    fn into_patch(self, partial: bool) -> ApiResult<VendorPatch> {
        if !partial && self.name.is_none() {
            return Err(name_required().into());
        }
        let patch = VendorPatch {
            name: self.name,
            supplier_ids: self.supplier_ids,
            category_ids: self.category_ids,
        };
        patch.validate()?;
        Ok(patch)
    }
}

fn name_required() -> ValidationError {
    ValidationError::field("name", "This field is required.")
}

/// Lists vendors; `search` matches vendor, supplier and category names.
pub async fn list_vendors(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<ListParams>,
    uri: Uri,
) -> ApiResult<ListResponse<VendorView>> {
    let authenticated = user.is_some();
    pagination::list(&params, &uri, |query| {
        let state = state.clone();
        async move {
            let page = state.store.list_vendors(&query).await?;
            Ok(page.map(|v| VendorView::render(v, authenticated)))
        }
    })
    .await
}

/// Gets one vendor.
pub async fn get_vendor(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    IdPath(id): IdPath<VendorId>,
) -> ApiResult<Json<VendorView>> {
    let detail = state.store.get_vendor(id).await?;
    Ok(Json(VendorView::render(detail, user.is_some())))
}

/// Creates a vendor.
pub async fn create_vendor(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<VendorWrite>,
) -> ApiResult<Created<VendorView>> {
    let detail = state.store.create_vendor(body.into_draft()?).await?;
    info!(vendor_id = %detail.vendor.id, user = %user.username, "Vendor created");

    let location = format!("/routes/vendors/{}", detail.vendor.id);
    Ok(Created::new(VendorView::render(detail, true), location))
}

/// Replaces a vendor.
pub async fn update_vendor(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<VendorId>,
    JsonBody(body): JsonBody<VendorWrite>,
) -> ApiResult<Json<VendorView>> {
    write_vendor(&state, &user.username, id, body.into_patch(false)?).await
}

/// Partially updates a vendor.
pub async fn patch_vendor(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<VendorId>,
    JsonBody(body): JsonBody<VendorWrite>,
) -> ApiResult<Json<VendorView>> {
    write_vendor(&state, &user.username, id, body.into_patch(true)?).await
}

async fn write_vendor(state: &AppState, username: &str, id: VendorId, patch: VendorPatch) -> ApiResult<Json<VendorView>> {
    let detail = state.store.update_vendor(id, patch).await?;
    info!(vendor_id = %id, user = %username, "Vendor updated");
    Ok(Json(VendorView::render(detail, true)))
}

/// Deletes a vendor.
pub async fn delete_vendor(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<VendorId>,
) -> ApiResult<NoContent> {
    state.store.delete_vendor(id).await?;
    info!(vendor_id = %id, user = %user.username, "Vendor deleted");
    Ok(NoContent)
}
