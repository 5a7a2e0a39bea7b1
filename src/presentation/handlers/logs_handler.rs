// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, Path, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::repositories::runtime_repository::RuntimeRepository;

/// 日志流接口
///
/// 校验句柄前缀确实属于当前活跃的抓取进程后升级为WebSocket，
/// 持续推送标准输出直到进程结束或客户端断开。
pub async fn stream_logs(
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
    Extension(runtime): Extension<Arc<dyn RuntimeRepository>>,
) -> impl IntoResponse {
    let processes = match runtime.list().await {
        Ok(processes) => processes,
        Err(e) => {
            error!("log lookup could not query the runtime: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Failed to look up the process."
                })),
            )
                .into_response();
        }
    };

    let process = processes
        .into_iter()
        .filter(|p| !p.is_proxy())
        .find(|p| p.id.starts_with(&id));

    let process = match process {
        Some(process) => process,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "success": false,
                    "error": "No active scrape job with that id."
                })),
            )
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| forward_logs(socket, runtime, process.id))
        .into_response()
}

async fn forward_logs(mut socket: WebSocket, runtime: Arc<dyn RuntimeRepository>, id: String) {
    let mut stream = match runtime.log_stream(&id).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = socket
                .send(Message::Text(format!("error: {}", e).into()))
                .await;
            return;
        }
    };

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                if bytes.is_empty() {
                    continue;
                }
                let line = String::from_utf8_lossy(&bytes).into_owned();
                if socket.send(Message::Text(line.into())).await.is_err() {
                    // Client went away; stop tailing.
                    debug!(process = %id, "log viewer disconnected");
                    return;
                }
            }
            Err(e) => {
                let _ = socket
                    .send(Message::Text(format!("error: {}", e).into()))
                    .await;
                return;
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}
