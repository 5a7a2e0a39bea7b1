// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::error;

use crate::application::dto::status_response::StatusDto;
use crate::domain::repositories::runtime_repository::RuntimeRepository;
use crate::utils::url_utils;

/// 列出当前活跃的抓取进程
pub async fn list_status(
    Extension(runtime): Extension<Arc<dyn RuntimeRepository>>,
) -> impl IntoResponse {
    let processes = match runtime.list().await {
        Ok(processes) => processes,
        Err(e) => {
            error!("status listing could not query the runtime: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Failed to list active jobs."
                })),
            )
                .into_response();
        }
    };

    let statuses: Vec<StatusDto> = processes
        .into_iter()
        .filter(|p| !p.is_proxy())
        .map(|p| {
            let short = url_utils::short_id(&p.id);
            StatusDto {
                owner: p.owner().unwrap_or_default().to_string(),
                target: p.target().unwrap_or_default().to_string(),
                logs_url: format!("/logs/{}", short),
                container_id: short,
            }
        })
        .collect();

    (StatusCode::OK, Json(statuses)).into_response()
}
