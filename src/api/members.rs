//! Member administration endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        pagination::{MemberPage, PageRequest, Paginated},
        user::{CreateMember, Member, MemberQuery, MemberSort, UpdateMember},
    },
    AppState,
};

use super::{AdminUser, AppJson, AppPath, AppQuery};

/// List members with search and pagination
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(MemberQuery),
    responses(
        (status = 200, description = "Page of members", body = MemberPage),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppQuery(query): AppQuery<MemberQuery>,
) -> AppResult<Json<MemberPage>> {
    let page = PageRequest::<MemberSort>::from_query(
        query.page,
        query.per_page,
        query.sort_by.as_deref(),
        query.order.as_deref(),
        &state.config.pagination,
    )?;

    let (members, total) = state.services.members.search(&query, &page).await?;
    Ok(Json(Paginated::new(members, page.page_info(total))))
}

/// Get member details by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<Member>> {
    let member = state.services.members.get(id).await?;
    Ok(Json(member))
}

/// Create a member or administrator account
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppJson(data): AppJson<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    data.validate()?;
    let member = state.services.members.create(data).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Update a member
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<i32>,
    AppJson(data): AppJson<UpdateMember>,
) -> AppResult<Json<Member>> {
    data.validate()?;
    let member = state.services.members.update(id, data).await?;
    Ok(Json(member))
}

/// Delete a member
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Member still has books on loan", body = crate::error::ErrorResponse),
        (status = 422, description = "Cannot delete your own account", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.services.members.delete(id, admin.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
