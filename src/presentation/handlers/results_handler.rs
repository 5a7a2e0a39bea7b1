// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::DateTime;
use std::sync::Arc;
use tracing::{error, warn};

use crate::application::dto::result_object::ResultObjectDto;
use crate::config::settings::Settings;
use crate::domain::repositories::lock_repository::LockRepository;
use crate::domain::repositories::storage_repository::StorageRepository;

/// 对象列表的缓存键
const LISTING_CACHE_KEY: &str = "r2-listing-cache";

/// 列出对象存储中的全部结果文件
///
/// 读穿缓存：命中时直接返回缓存的列表；未命中时走一次
/// list 加逐对象 head 的完整查询，再回填缓存。缓存后端
/// 不可用只影响性能，不影响正确性。
pub async fn list_results(
    Extension(storage): Extension<Arc<dyn StorageRepository>>,
    Extension(locks): Extension<Arc<dyn LockRepository>>,
    Extension(settings): Extension<Arc<Settings>>,
) -> impl IntoResponse {
    match locks.get(LISTING_CACHE_KEY).await {
        Ok(Some(cached)) => {
            if let Ok(objects) = serde_json::from_str::<Vec<ResultObjectDto>>(&cached) {
                return (StatusCode::OK, Json(objects)).into_response();
            }
            // Unreadable cache entries are treated as a miss.
        }
        Ok(None) => {}
        Err(e) => warn!("listing cache unavailable: {}", e),
    }

    let mut objects = match storage.list().await {
        Ok(objects) => objects,
        Err(e) => {
            error!("object listing failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Failed to list stored results."
                })),
            )
                .into_response();
        }
    };

    for object in &mut objects {
        match storage.head(&object.key).await {
            Ok(uploaded_by) => object.uploaded_by = uploaded_by,
            Err(e) => warn!(key = %object.key, "metadata lookup failed: {}", e),
        }
    }

    // Newest first.
    objects.sort_by_key(|object| {
        std::cmp::Reverse(DateTime::parse_from_rfc3339(&object.last_modified).ok())
    });

    let dtos: Vec<ResultObjectDto> = objects.into_iter().map(ResultObjectDto::from).collect();

    if let Ok(serialized) = serde_json::to_string(&dtos) {
        if let Err(e) = locks
            .set(
                LISTING_CACHE_KEY,
                &serialized,
                settings.storage.listing_cache_ttl,
            )
            .await
        {
            warn!("listing cache write failed: {}", e);
        }
    }

    (StatusCode::OK, Json(dtos)).into_response()
}
