// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use uuid::Uuid;

/// 从目标URL推导位置名称
///
/// 取URL中 `-Reviews-` 之后的部分并去掉 `.html` 后缀。
/// 调用前URL已通过模式校验，推导不会失败；对意外输入
/// 退化为返回整个URL。
pub fn location_name_from_url(url: &str) -> String {
    let name = url
        .rsplit_once("-Reviews-")
        .map(|(_, tail)| tail)
        .unwrap_or(url);
    name.trim_end_matches(".html").to_string()
}

/// 进程句柄的短前缀（12个字符），用于状态展示和日志查询
pub fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}

/// 生成暂存文件名的随机后缀（11个字符）
///
/// 多个任务并发抓取同名目标时避免本地文件名冲突。
pub fn staging_suffix() -> String {
    Uuid::new_v4().to_string().chars().take(11).collect()
}

/// 暂存文件名：目标名称加随机后缀
pub fn staging_file_name(location_name: &str, suffix: &str) -> String {
    format!("{}-{}.csv", location_name, suffix)
}
