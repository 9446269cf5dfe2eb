// handlers/protected/thoughts.rs - /thoughts feed

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::config::PaginationConfig;
use crate::database::models::{NewThought, Thought, User};
use crate::handlers::utils::{json_body, required_text};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateThought {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A thought together with its author's public record
#[derive(Debug, Serialize)]
pub struct ThoughtEntry {
    #[serde(flatten)]
    pub thought: Thought,
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct ThoughtPage {
    pub thoughts: Vec<ThoughtEntry>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

/// Resolve `page` (1-based) and `limit` against the configured bounds
fn page_window(query: &PageQuery, pagination: &PaginationConfig) -> (i64, i64) {
    let page = query.page.filter(|p| *p >= 1).unwrap_or(1);
    let limit = query
        .limit
        .filter(|l| *l >= 1)
        .unwrap_or(i64::from(pagination.default_limit))
        .min(i64::from(pagination.max_limit));
    (page, limit)
}

/// GET /thoughts?page=1&limit=10 - Family feed, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<ThoughtPage> {
    let (page, limit) = page_window(&query, &state.config.pagination);
    let offset = (page - 1).saturating_mul(limit);

    let total = state.store.count_thoughts(caller.family_id).await?;
    let thoughts = state.store.list_thoughts(caller.family_id, offset, limit).await?;

    let authors: HashMap<i64, User> = state
        .store
        .list_family_users(caller.family_id)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let has_more = offset + (thoughts.len() as i64) < total;
    let thoughts = thoughts
        .into_iter()
        .map(|thought| {
            let user = authors.get(&thought.user_id).cloned();
            ThoughtEntry { thought, user }
        })
        .collect();

    Ok(ApiResponse::success(ThoughtPage {
        thoughts,
        total,
        page,
        limit,
        has_more,
    }))
}

/// POST /thoughts - Post to the family feed
///
/// Expected Input:
/// ```json
/// { "content": "Who finished the milk?" }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<CreateThought>, JsonRejection>,
) -> ApiResult<Thought> {
    caller.require_accepted()?;
    let payload = json_body(payload)?;
    let content = required_text("content", payload.content)?;

    let thought = state
        .store
        .create_thought(NewThought {
            content,
            user_id: caller.id,
            family_id: caller.family_id,
        })
        .await?;

    Ok(ApiResponse::created(thought))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination() -> PaginationConfig {
        PaginationConfig {
            default_limit: 10,
            max_limit: 50,
        }
    }

    #[test]
    fn defaults_apply_when_absent() {
        assert_eq!(page_window(&PageQuery::default(), &pagination()), (1, 10));
    }

    #[test]
    fn limit_is_clamped_and_bad_values_fall_back() {
        let query = PageQuery {
            page: Some(3),
            limit: Some(500),
        };
        assert_eq!(page_window(&query, &pagination()), (3, 50));

        let query = PageQuery {
            page: Some(0),
            limit: Some(-4),
        };
        assert_eq!(page_window(&query, &pagination()), (1, 10));
    }
}
