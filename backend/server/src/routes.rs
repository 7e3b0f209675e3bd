use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    extract::{self, FromRequestParts, Path, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Response},
};
use bank::{
    Category, CategoryId, CategoryWithAggregates, ItemId, ItemWithVoteCount,
    compute_category_votes,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    dashboard::fetch_dashboard,
    error::AppError,
    identity::{CookieStorage, Identity},
    state::State,
    store::{NewItem, VoteFilter},
    utils::{neighbours, required_name},
    votes::{VoteStatus, submit_vote},
};

/// The caller's identity, resolved from its cookies.
///
/// Responses built through [`Session::respond`] carry the cookie of a freshly issued id.
pub struct Session {
    pub identity: Identity,
    set_cookie: Option<HeaderValue>,
}

impl Session {
    pub fn respond(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();

        if let Some(cookie) = self.set_cookie {
            response.headers_mut().append(SET_COOKIE, cookie);
        }

        response
    }
}

impl FromRequestParts<Arc<State>> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        let mut storage =
            CookieStorage::from_headers(&parts.headers, state.config.user_cookie_max_age);
        let identity = state.identity.resolve(&mut storage);

        Ok(Self {
            identity,
            set_cookie: storage.into_set_cookie(),
        })
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct CategoryView {
    pub category: Category,
    pub items: Vec<ItemWithVoteCount>,
    /// The caller's vote in this category.
    pub existing_vote: Option<ItemId>,
    pub previous: Option<CategoryId>,
    pub next: Option<CategoryId>,
}

#[derive(Deserialize)]
pub struct NewCategoryPayload {
    name: String,
}

#[derive(Deserialize)]
pub struct NewItemPayload {
    name: String,
    #[serde(default)]
    image: Option<String>,
    category_id: String,
}

#[derive(Deserialize)]
pub struct VotePayload {
    item_id: String,
    category_id: String,
    #[serde(default)]
    existing_vote_item_id: Option<String>,
}

pub async fn session_handler(session: Session) -> Response {
    let user_id = session.identity.user_id().map(str::to_string);

    session.respond(Json(SessionResponse { user_id }))
}

pub async fn dashboard_handler(
    extract::State(state): extract::State<Arc<State>>,
) -> Result<Json<Vec<CategoryWithAggregates>>, AppError> {
    let dashboard = fetch_dashboard(state.store.as_ref(), state.config.dashboard_strategy).await?;

    Ok(Json(dashboard))
}

pub async fn categories_handler(
    extract::State(state): extract::State<Arc<State>>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.store.categories().await?))
}

pub async fn create_category_handler(
    extract::State(state): extract::State<Arc<State>>,
    payload: Result<Json<NewCategoryPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;
    let name = required_name(&payload.name, "category")?;

    let category = state.store.insert_category(&name).await?;
    info!("Added category {} ({})", category.name, category.id);

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn category_handler(
    extract::State(state): extract::State<Arc<State>>,
    Path(id): Path<String>,
    session: Session,
) -> Result<Response, AppError> {
    let store = state.store.as_ref();

    let category = store
        .category(&id)
        .await?
        .ok_or(AppError::CategoryNotFound)?;

    let category_votes = VoteFilter {
        user_id: None,
        category_id: Some(id.clone()),
    };
    let (categories, items, votes) = tokio::try_join!(
        store.categories(),
        store.items(Some(&id)),
        store.votes(&category_votes)
    )?;

    let existing_vote = session.identity.user_id().and_then(|user_id| {
        votes
            .iter()
            .find(|vote| vote.user_id == user_id)
            .map(|vote| vote.item_id.clone())
    });
    let (previous, next) = neighbours(&categories, &id);

    Ok(session.respond(Json(CategoryView {
        category,
        items: compute_category_votes(&items, &votes),
        existing_vote,
        previous,
        next,
    })))
}

pub async fn create_item_handler(
    extract::State(state): extract::State<Arc<State>>,
    payload: Result<Json<NewItemPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;
    let name = required_name(&payload.name, "item")?;

    if state.store.category(&payload.category_id).await?.is_none() {
        return Err(AppError::Validation("Unknown category".to_string()));
    }

    let item = state
        .store
        .insert_item(NewItem {
            name,
            image: payload.image.filter(|image| !image.is_empty()),
            category_id: payload.category_id,
        })
        .await?;
    info!("Added item {} ({}) to {}", item.name, item.id, item.category_id);

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn votes_handler(
    extract::State(state): extract::State<Arc<State>>,
    session: Session,
    payload: Result<Json<VotePayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;

    let Some(user_id) = session.identity.user_id().map(str::to_string) else {
        return Err(AppError::IdentityUnavailable);
    };

    let items = state.store.items(Some(&payload.category_id)).await?;
    if !items.iter().any(|item| item.id == payload.item_id) {
        return Err(AppError::Validation(
            "Item does not belong to this category".to_string(),
        ));
    }

    let Some(_ticket) = state.in_flight.begin(&user_id, &payload.category_id) else {
        return Err(AppError::VoteInFlight);
    };

    // the stored vote wins over whatever the client remembers
    let existing_vote_item_id = state
        .store
        .votes(&VoteFilter {
            user_id: Some(user_id.clone()),
            category_id: Some(payload.category_id.clone()),
        })
        .await?
        .into_iter()
        .next()
        .map(|vote| vote.item_id);

    if payload.existing_vote_item_id != existing_vote_item_id {
        warn!(
            "Stale vote from {user_id} in {}: client has {:?}, store has {:?}",
            payload.category_id, payload.existing_vote_item_id, existing_vote_item_id
        );
    }

    let outcome = submit_vote(
        state.store.as_ref(),
        &payload.item_id,
        &user_id,
        &payload.category_id,
        existing_vote_item_id.as_deref(),
    )
    .await;

    let status = match outcome.status {
        VoteStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };

    Ok(session.respond((status, Json(outcome))))
}
