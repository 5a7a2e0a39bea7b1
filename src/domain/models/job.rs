// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::models::proxy::ProxyBinding;
use crate::utils::url_utils;

/// 上传者标识的最大长度（字符数）
pub const MAX_UPLOAD_IDENTIFIER_LEN: usize = 20;

/// 抓取模式枚举
///
/// 定义了系统支持的三种抓取目标类型，每种类型对应不同的
/// URL校验规则和工作进程环境变量。这是一个封闭枚举，
/// 未知的模式字符串在准入阶段被拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScrapeMode {
    /// 酒店评论抓取
    Hotel,
    /// 餐厅评论抓取
    Resto,
    /// 航空公司评论抓取
    Airline,
}

impl ScrapeMode {
    /// 工作进程期望的目标名称环境变量名
    pub fn name_env_var(&self) -> &'static str {
        match self {
            ScrapeMode::Hotel => "HOTEL_NAME",
            ScrapeMode::Resto => "RESTO_NAME",
            ScrapeMode::Airline => "AIRLINE_NAME",
        }
    }
}

impl fmt::Display for ScrapeMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScrapeMode::Hotel => write!(f, "HOTEL"),
            ScrapeMode::Resto => write!(f, "RESTO"),
            ScrapeMode::Airline => write!(f, "AIRLINE"),
        }
    }
}

/// 未知抓取模式错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown scrape mode: {0}")]
pub struct UnknownScrapeMode(pub String);

impl FromStr for ScrapeMode {
    type Err = UnknownScrapeMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOTEL" => Ok(ScrapeMode::Hotel),
            "RESTO" => Ok(ScrapeMode::Resto),
            "AIRLINE" => Ok(ScrapeMode::Airline),
            other => Err(UnknownScrapeMode(other.to_string())),
        }
    }
}

/// 抓取任务实体
///
/// 表示一次已被接受的抓取请求，从提交到资源释放的整个生命周期。
/// 任务是短暂的：核心不保留任何持久化记录，任务对象在终态
/// （成功或失败）且资源释放后即被丢弃。
#[derive(Debug, Clone)]
pub struct Job {
    /// 调用方提供的上传者标识（非空，不超过20个字符）
    pub upload_identifier: String,
    /// 目标URL，已按模式对应的正则校验
    pub target_url: String,
    /// 抓取模式
    pub mode: ScrapeMode,
    /// 从URL推导出的目标位置名称
    pub location_name: String,
    /// 工作进程句柄，创建后由生命周期管理器填入
    pub process_id: Option<String>,
    /// 已获取的代理资源绑定（可选）
    pub proxy: Option<ProxyBinding>,
}

impl Job {
    /// 从已通过校验的输入构建任务
    pub fn new(upload_identifier: String, target_url: String, mode: ScrapeMode) -> Self {
        let location_name = url_utils::location_name_from_url(&target_url);
        Self {
            upload_identifier,
            target_url,
            mode,
            location_name,
            process_id: None,
            proxy: None,
        }
    }
}
