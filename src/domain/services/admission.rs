// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use thiserror::Error;

use crate::domain::models::job::{Job, ScrapeMode};
use crate::domain::repositories::runtime_repository::{RuntimeError, RuntimeRepository};
use crate::utils::validators;

/// 默认并发上限
pub const DEFAULT_ADMISSION_CEILING: usize = 5;

/// 准入错误类型
///
/// 校验类错误同步返回给调用方，不触碰任何资源。
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// 未知抓取模式
    #[error("unknown scrape mode: {0}")]
    InvalidMode(String),
    /// URL与该模式的格式不符
    #[error("target URL does not match the pattern for the requested mode")]
    InvalidUrl,
    /// 上传者标识不合法
    #[error("upload identifier must be non-empty and at most 20 characters")]
    InvalidIdentifier,
    /// 活跃任务数已达上限
    #[error("too many active scrape jobs: {active} of {ceiling}")]
    Busy { active: usize, ceiling: usize },
    /// 运行时查询失败；状态不明时绝不放行
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// 准入控制器
///
/// 对新的抓取请求做纯决策：依次校验模式、URL、上传者标识，
/// 最后将当前活跃任务数与并发上限比较。除读取进程数之外
/// 没有任何副作用。
pub struct AdmissionService {
    runtime: Arc<dyn RuntimeRepository>,
    ceiling: usize,
}

impl AdmissionService {
    pub fn new(runtime: Arc<dyn RuntimeRepository>, ceiling: usize) -> Self {
        Self { runtime, ceiling }
    }

    /// 评估一次抓取请求
    ///
    /// # 参数
    ///
    /// * `target_url` - 目标URL
    /// * `upload_identifier` - 上传者标识
    /// * `mode` - 抓取模式字符串
    ///
    /// # 返回值
    ///
    /// * `Ok(Job)` - 请求被接受，返回构建好的任务
    /// * `Err(AdmissionError)` - 请求被拒绝及其原因
    pub async fn admit(
        &self,
        target_url: &str,
        upload_identifier: &str,
        mode: &str,
    ) -> Result<Job, AdmissionError> {
        let mode: ScrapeMode = mode
            .parse()
            .map_err(|_| AdmissionError::InvalidMode(mode.to_string()))?;

        if !validators::is_valid_target_url(target_url, mode) {
            return Err(AdmissionError::InvalidUrl);
        }

        if !validators::is_valid_upload_identifier(upload_identifier) {
            return Err(AdmissionError::InvalidIdentifier);
        }

        // Snapshot read: two concurrent requests can both pass with
        // count == ceiling - 1. The ceiling is a load-shedding signal,
        // not an atomic reservation.
        let active = self.active_job_count().await?;
        if active >= self.ceiling {
            return Err(AdmissionError::Busy {
                active,
                ceiling: self.ceiling,
            });
        }

        Ok(Job::new(
            upload_identifier.to_string(),
            target_url.to_string(),
            mode,
        ))
    }

    /// 当前活跃的抓取进程数（排除代理进程）
    ///
    /// 每次调用都向运行时重新查询；查询失败是硬错误，
    /// 不会被当作"没有进程在运行"。
    pub async fn active_job_count(&self) -> Result<usize, RuntimeError> {
        let processes = self.runtime.list().await?;
        Ok(processes.iter().filter(|p| !p.is_proxy()).count())
    }
}
