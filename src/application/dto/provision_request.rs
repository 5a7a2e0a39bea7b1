// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;

/// 抓取任务提交请求
///
/// 与提交表单的字段一一对应。所有校验在准入控制器中按
/// 固定顺序进行，这里只做反序列化。
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRequestDto {
    /// 目标URL
    pub url: String,
    /// 上传者标识
    pub upload_identifier: String,
    /// 抓取模式字符串（HOTEL/RESTO/AIRLINE）
    pub scrape_mode: String,
}
