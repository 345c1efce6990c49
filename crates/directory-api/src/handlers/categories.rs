//! Category handlers.

use crate::{
    extract::{AuthUser, IdPath, JsonBody},
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
use directory_core::{Category, CategoryDraft, CategoryId, ValidationError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Category create/update body.
#[derive(Debug, Deserialize)]
pub struct CategoryWrite {
    /// Category name.
    pub name: Option<String>,
}

impl CategoryWrite {
    fn into_draft(self) -> ApiResult<CategoryDraft> {
        let name = self
            .name
            .ok_or_else(|| ValidationError::field("name", "This field is required."))?;
        let draft = CategoryDraft::new(name);
        draft.validate()?;
        Ok(draft)
    }
}

/// Lists categories.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    uri: Uri,
) -> ApiResult<ListResponse<Category>> {
    pagination::list(&params, &uri, |query| {
        let state = state.clone();
        async move { Ok(state.store.list_categories(&query).await?) }
    })
    .await
}

/// Gets one category.
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath<CategoryId>,
) -> ApiResult<Json<Category>> {
    Ok(Json(state.store.get_category(id).await?))
}

/// Creates a category.
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<CategoryWrite>,
) -> ApiResult<Created<Category>> {
    let category = state.store.create_category(body.into_draft()?).await?;
    info!(category_id = %category.id, user = %user.username, "Category created");
    let location = format!("/routes/categories/{}", category.id);
    Ok(Created::new(category, location))
}

/// Renames a category.
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<CategoryId>,
    JsonBody(body): JsonBody<CategoryWrite>,
) -> ApiResult<Json<Category>> {
    let category = state.store.update_category(id, body.into_draft()?).await?;
    info!(category_id = %id, user = %user.username, "Category updated");
    Ok(Json(category))
}

/// Partially updates a category; without a `name` nothing changes.
pub async fn patch_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    IdPath(id): IdPath<CategoryId>,
    JsonBody(body): JsonBody<CategoryWrite>,
) -> ApiResult<Json<Category>> {
    if body.name.is_none() {
        return Ok(Json(state.store.get_category(id).await?));
    }
    update_category(State(state), user, IdPath(id), JsonBody(body)).await
}

/// Deletes a category.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath<CategoryId>,
) -> ApiResult<NoContent> {
    state.store.delete_category(id).await?;
    info!(category_id = %id, user = %user.username, "Category deleted");
    Ok(NoContent)
}
