// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    extract::{Extension, Form},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use std::sync::Arc;
use tracing::{error, warn};

use crate::{
    application::dto::{
        provision_request::ProvisionRequestDto, provision_response::ProvisionResponseDto,
    },
    application::usecases::provision_job::{ProvisionError, ProvisionJobUseCase},
    domain::services::admission::{AdmissionError, AdmissionService},
};

/// 表单提交入口
///
/// 准入拒绝同步返回给提交方；通过准入的任务立即返回进程
/// 句柄，运行结果不回传（通过状态和日志接口观察）。
pub async fn provision(
    Extension(admission): Extension<Arc<AdmissionService>>,
    Extension(usecase): Extension<Arc<ProvisionJobUseCase>>,
    Form(payload): Form<ProvisionRequestDto>,
) -> impl IntoResponse {
    let job = match admission
        .admit(&payload.url, &payload.upload_identifier, &payload.scrape_mode)
        .await
    {
        Ok(job) => job,
        Err(e) => {
            counter!("provision_admission_rejected_total").increment(1);
            return rejection_response(e);
        }
    };

    match usecase.clone().launch(job).await {
        Ok(handle) => {
            let message = if handle.proxied {
                format!(
                    "Scrape job started; follow the logs at /logs/{}",
                    handle.short_id
                )
            } else {
                format!(
                    "Scrape job started without a proxy; follow the logs at /logs/{}",
                    handle.short_id
                )
            };
            (
                StatusCode::CREATED,
                Json(ProvisionResponseDto {
                    success: true,
                    container_id: handle.short_id,
                    message,
                }),
            )
                .into_response()
        }
        Err(ProvisionError::NoProxyAvailable) => {
            warn!("submission rejected: proxy pool exhausted");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "success": false,
                    "error": "All proxies are in use; try again later."
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!("failed to launch scrape job: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Failed to start the scrape job."
                })),
            )
                .into_response()
        }
    }
}

fn rejection_response(err: AdmissionError) -> Response {
    match &err {
        AdmissionError::InvalidMode(_)
        | AdmissionError::InvalidUrl
        | AdmissionError::InvalidIdentifier => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": err.to_string()
            })),
        )
            .into_response(),
        AdmissionError::Busy { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "success": false,
                "error": err.to_string()
            })),
        )
            .into_response(),
        AdmissionError::Runtime(e) => {
            error!("admission check could not query the runtime: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Failed to process request due to internal error."
                })),
            )
                .into_response()
        }
    }
}
