// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;

/// 单个活跃抓取进程的状态
#[derive(Debug, Serialize)]
pub struct StatusDto {
    /// 进程短句柄
    pub container_id: String,
    /// 任务所有者（上传者标识）
    pub owner: String,
    /// 抓取目标
    pub target: String,
    /// 日志查看地址
    pub logs_url: String,
}
