// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;

/// 抓取任务提交回执
#[derive(Debug, Serialize)]
pub struct ProvisionResponseDto {
    /// 是否成功
    pub success: bool,
    /// 进程短句柄，可用于查询日志
    pub container_id: String,
    /// 人类可读的状态说明
    pub message: String,
}
