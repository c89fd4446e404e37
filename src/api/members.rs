//! Member endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::member::{ActiveMember, CreateMember, Member, UpdateMember},
};

use super::JsonBody;

/// Ranking of members by active loans
#[derive(Debug, Serialize, ToSchema)]
pub struct TopActiveResponse {
    pub status: String,
    pub data: Vec<ActiveMember>,
}

/// List all members
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    responses(
        (status = 200, description = "Member list", body = Vec<Member>)
    )
)]
pub async fn list_members(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Member>>> {
    let members = state.services.catalog.list_members().await?;
    Ok(Json(members))
}

/// Get member by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Member>> {
    let member = state.services.catalog.get_member(id).await?;
    Ok(Json(member))
}

/// Create member together with its user identity
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn create_member(
    State(state): State<crate::AppState>,
    JsonBody(data): JsonBody<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let member = state.services.catalog.create_member(&data).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Update member
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn update_member(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    JsonBody(data): JsonBody<UpdateMember>,
) -> AppResult<Json<Member>> {
    let member = state.services.catalog.update_member(id, &data).await?;
    Ok(Json(member))
}

/// Delete member
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Member has active loans")
    )
)]
pub async fn delete_member(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_member(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Members with the most active loans, at most five
#[utoipa::path(
    get,
    path = "/members/top-active",
    tag = "members",
    responses(
        (status = 200, description = "Members ranked by active loans", body = TopActiveResponse)
    )
)]
pub async fn top_active_members(
    State(state): State<crate::AppState>,
) -> AppResult<Json<TopActiveResponse>> {
    let members = state.services.ledger.top_active_members().await?;

    Ok(Json(TopActiveResponse {
        status: "Success.".to_string(),
        data: members,
    }))
}
