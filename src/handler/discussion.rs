use crate::{
    AppState,
    db::{CommentExt, DBClient, ReactionExt, ThreadExt, VoteExt},
    dtos::{
        CreateCommentDto, DataResponseDto, JsonBody, ListResponseDto, ReactDto, ReactResponseDto,
        ThreadDetailResponseDto, ThreadInputDto, ThreadListQueryDto, ThreadListResponseDto,
        UpdateCommentDto, VoteDto, VoteResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth, optional_auth},
    models::{ReactionOutcome, ReactionType, Target, ThreadSort, VoteOutcome, VoteType},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use validator::Validate;

/// Router for threads, comments, votes and reactions.
///
/// Reads run behind `optional_auth` so a signed-in viewer sees their own
/// votes and reactions. Every write requires `auth`.
pub fn discussion_handler(app_state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_threads))
        .route("/{id}", get(get_thread))
        .route("/{id}/comments", get(list_comments))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            optional_auth,
        ));

    let protected = Router::new()
        .route("/", post(create_thread))
        .route("/{id}", put(update_thread))
        .route("/{id}/comments", post(create_comment))
        .route("/{id}/vote", post(vote_thread))
        .route("/{id}/react", post(react_thread))
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
        .route("/comments/{id}/vote", post(vote_comment))
        .route("/comments/{id}/react", post(react_comment))
        .route_layer(middleware::from_fn_with_state(app_state, auth));

    public.merge(protected)
}

fn db_error(context: &str, e: sqlx::Error) -> HttpError {
    tracing::error!("DB error, {}: {}", context, e);
    HttpError::server_error(ErrorMessage::ServerError.to_string())
}

fn viewer_id(viewer: &Option<Extension<JWTAuthMiddleware>>) -> Option<i64> {
    viewer.as_ref().map(|Extension(auth)| auth.user.id)
}

fn not_found_for(target: Target) -> HttpError {
    match target {
        Target::Thread(_) => HttpError::not_found(ErrorMessage::ThreadNotFound.to_string()),
        Target::Comment(_) => HttpError::not_found(ErrorMessage::CommentNotFound.to_string()),
    }
}

// ============================================================================
// Threads
// ============================================================================

#[instrument(skip(app_state, viewer))]
pub async fn list_threads(
    State(app_state): State<AppState>,
    viewer: Option<Extension<JWTAuthMiddleware>>,
    Query(query): Query<ThreadListQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let db = app_state.db()?;
    let (page, per_page) = query.pagination();
    let sort = ThreadSort::from_param(query.sort.as_deref());

    let threads = db
        .get_threads(sort, page, per_page, viewer_id(&viewer))
        .await
        .map_err(|e| db_error("listing threads", e))?;

    let total = db
        .get_thread_count()
        .await
        .map_err(|e| db_error("counting threads", e))?;

    Ok(Json(ThreadListResponseDto {
        status: "success",
        threads,
        total,
        page,
        per_page,
    }))
}

#[instrument(skip(app_state, viewer))]
pub async fn get_thread(
    State(app_state): State<AppState>,
    viewer: Option<Extension<JWTAuthMiddleware>>,
    Path(thread_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let db = app_state.db()?;
    let viewer = viewer_id(&viewer);

    let thread = db
        .get_thread_view(thread_id, viewer)
        .await
        .map_err(|e| db_error("getting thread", e))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ThreadNotFound.to_string()))?;

    let comments = db
        .get_comments(thread_id, viewer)
        .await
        .map_err(|e| db_error("getting comments", e))?;

    // Counted in the background; the response shows the count before this view.
    let counter = db.clone();
    tokio::spawn(async move {
        if let Err(e) = counter.increment_view_count(thread_id).await {
            tracing::debug!("View count update for thread {} failed: {}", thread_id, e);
        }
    });

    Ok(Json(ThreadDetailResponseDto {
        status: "success",
        thread,
        comments,
    }))
}

#[instrument(skip(app_state, user, body), fields(user_id = user.user.id))]
pub async fn create_thread(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    JsonBody(body): JsonBody<ThreadInputDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::warn!("Invalid thread input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let content = ammonia::clean(&body.content);
    let thread = app_state
        .db()?
        .create_thread(user.user.id, body.title.trim(), &content)
        .await
        .map_err(|e| db_error("creating thread", e))?;

    tracing::info!(thread_id = thread.id, "Thread created");
    Ok((StatusCode::CREATED, Json(DataResponseDto::new(thread))))
}

#[instrument(skip(app_state, user, body), fields(user_id = user.user.id))]
pub async fn update_thread(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(thread_id): Path<i64>,
    JsonBody(body): JsonBody<ThreadInputDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::warn!("Invalid thread input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let db = app_state.db()?;
    let content = ammonia::clean(&body.content);

    let updated = db
        .update_thread(thread_id, user.user.id, body.title.trim(), &content)
        .await
        .map_err(|e| db_error("updating thread", e))?;

    match updated {
        Some(thread) => Ok(Json(DataResponseDto::new(thread))),
        None => {
            let exists = db
                .get_thread(thread_id)
                .await
                .map_err(|e| db_error("getting thread", e))?
                .is_some();
            if exists {
                Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()))
            } else {
                Err(HttpError::not_found(ErrorMessage::ThreadNotFound.to_string()))
            }
        }
    }
}

// ============================================================================
// Comments
// ============================================================================

#[instrument(skip(app_state, viewer))]
pub async fn list_comments(
    State(app_state): State<AppState>,
    viewer: Option<Extension<JWTAuthMiddleware>>,
    Path(thread_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let db = app_state.db()?;

    db.get_thread(thread_id)
        .await
        .map_err(|e| db_error("getting thread", e))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ThreadNotFound.to_string()))?;

    let comments = db
        .get_comments(thread_id, viewer_id(&viewer))
        .await
        .map_err(|e| db_error("getting comments", e))?;

    Ok(Json(ListResponseDto::new(comments)))
}

#[instrument(skip(app_state, user, body), fields(user_id = user.user.id))]
pub async fn create_comment(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(thread_id): Path<i64>,
    JsonBody(body): JsonBody<CreateCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::warn!("Invalid comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let db = app_state.db()?;

    let thread = db
        .get_thread(thread_id)
        .await
        .map_err(|e| db_error("getting thread", e))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ThreadNotFound.to_string()))?;

    if thread.is_locked {
        return Err(HttpError::forbidden(ErrorMessage::ThreadLocked.to_string()));
    }

    let depth = match body.parent_id {
        Some(parent_id) => {
            let parent = db
                .get_comment(parent_id)
                .await
                .map_err(|e| db_error("getting parent comment", e))?
                .filter(|parent| parent.thread_id == thread_id && !parent.is_deleted)
                .ok_or_else(|| {
                    HttpError::bad_request(ErrorMessage::InvalidParentComment.to_string())
                })?;
            parent.depth + 1
        }
        None => 0,
    };

    let content = ammonia::clean(&body.content);
    let comment = db
        .create_comment(thread_id, user.user.id, body.parent_id, depth, &content)
        .await
        .map_err(|e| db_error("creating comment", e))?;

    tracing::info!(comment_id = comment.id, thread_id, "Comment created");
    Ok((StatusCode::CREATED, Json(DataResponseDto::new(comment))))
}

/// 403 if a live comment exists but belongs to someone else, otherwise 404.
async fn comment_write_error(db: &DBClient, comment_id: i64) -> HttpError {
    match db.get_comment(comment_id).await {
        Ok(Some(comment)) if !comment.is_deleted => {
            HttpError::forbidden(ErrorMessage::PermissionDenied.to_string())
        }
        Ok(_) => HttpError::not_found(ErrorMessage::CommentNotFound.to_string()),
        Err(e) => db_error("getting comment", e),
    }
}

#[instrument(skip(app_state, user, body), fields(user_id = user.user.id))]
pub async fn update_comment(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(comment_id): Path<i64>,
    JsonBody(body): JsonBody<UpdateCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::warn!("Invalid comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let db = app_state.db()?;
    let content = ammonia::clean(&body.content);

    let updated = db
        .update_comment(comment_id, user.user.id, &content)
        .await
        .map_err(|e| db_error("updating comment", e))?;

    match updated {
        Some(comment) => Ok(Json(DataResponseDto::new(comment))),
        None => Err(comment_write_error(db, comment_id).await),
    }
}

#[instrument(skip(app_state, user), fields(user_id = user.user.id))]
pub async fn delete_comment(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let db = app_state.db()?;

    let deleted = db
        .delete_comment(comment_id, user.user.id)
        .await
        .map_err(|e| db_error("deleting comment", e))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(comment_write_error(db, comment_id).await)
    }
}

// ============================================================================
// Votes and reactions
// ============================================================================

async fn vote(
    app_state: &AppState,
    user_id: i64,
    target: Target,
    body: VoteDto,
) -> Result<Json<VoteResponseDto>, HttpError> {
    let vote_type = VoteType::try_from(body.vote_type)
        .map_err(|_| HttpError::bad_request(ErrorMessage::InvalidVoteType.to_string()))?;

    let db = app_state.db()?;

    let owner = db
        .get_target_owner(target)
        .await
        .map_err(|e| db_error("getting vote target", e))?
        .ok_or_else(|| not_found_for(target))?;

    if owner == user_id {
        return Err(HttpError::forbidden(ErrorMessage::SelfVote.to_string()));
    }

    let (outcome, score) = db
        .toggle_vote(user_id, target, vote_type)
        .await
        .map_err(|e| db_error("toggling vote", e))?;

    let (message, action) = match outcome {
        VoteOutcome::Recorded => ("Vote recorded", "recorded"),
        VoteOutcome::Removed => ("Vote removed", "removed"),
    };

    Ok(Json(VoteResponseDto {
        status: "success".to_string(),
        message: message.to_string(),
        action: action.to_string(),
        score,
    }))
}

#[instrument(skip(app_state, user, body), fields(user_id = user.user.id))]
pub async fn vote_thread(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(thread_id): Path<i64>,
    JsonBody(body): JsonBody<VoteDto>,
) -> Result<impl IntoResponse, HttpError> {
    vote(&app_state, user.user.id, Target::Thread(thread_id), body).await
}

#[instrument(skip(app_state, user, body), fields(user_id = user.user.id))]
pub async fn vote_comment(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(comment_id): Path<i64>,
    JsonBody(body): JsonBody<VoteDto>,
) -> Result<impl IntoResponse, HttpError> {
    vote(&app_state, user.user.id, Target::Comment(comment_id), body).await
}

async fn react(
    app_state: &AppState,
    user_id: i64,
    target: Target,
    body: ReactDto,
) -> Result<Json<ReactResponseDto>, HttpError> {
    let reaction_type: ReactionType = body
        .reaction_type
        .parse()
        .map_err(|_| HttpError::bad_request(ErrorMessage::InvalidReactionType.to_string()))?;

    let db = app_state.db()?;

    let owner = db
        .get_target_owner(target)
        .await
        .map_err(|e| db_error("getting reaction target", e))?
        .ok_or_else(|| not_found_for(target))?;

    if owner == user_id {
        return Err(HttpError::forbidden(ErrorMessage::SelfReact.to_string()));
    }

    let outcome = db
        .toggle_reaction(user_id, target, reaction_type)
        .await
        .map_err(|e| db_error("toggling reaction", e))?;

    let action = match outcome {
        ReactionOutcome::Added => "added",
        ReactionOutcome::Removed => "removed",
    };

    Ok(Json(ReactResponseDto {
        status: "success".to_string(),
        message: "Reaction toggled".to_string(),
        action: action.to_string(),
    }))
}

#[instrument(skip(app_state, user, body), fields(user_id = user.user.id))]
pub async fn react_thread(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(thread_id): Path<i64>,
    JsonBody(body): JsonBody<ReactDto>,
) -> Result<impl IntoResponse, HttpError> {
    react(&app_state, user.user.id, Target::Thread(thread_id), body).await
}

#[instrument(skip(app_state, user, body), fields(user_id = user.user.id))]
pub async fn react_comment(
    State(app_state): State<AppState>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(comment_id): Path<i64>,
    JsonBody(body): JsonBody<ReactDto>,
) -> Result<impl IntoResponse, HttpError> {
    react(&app_state, user.user.id, Target::Comment(comment_id), body).await
}
