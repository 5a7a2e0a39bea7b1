// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, warn};

use crate::config::settings::ProvisionerSettings;
use crate::domain::models::job::Job;
use crate::domain::models::worker_process::{LABEL_TARGET, LABEL_TASK_OWNER, LABEL_VPN_REGION};
use crate::domain::repositories::lock_repository::LockRepository;
use crate::domain::repositories::runtime_repository::{
    RuntimeError, RuntimeRepository, WorkerSpec,
};
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};
use crate::domain::services::proxy_pool::{PoolError, ProxyPoolService};
use crate::utils::url_utils;

/// 任务生命周期错误类型
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// 部署要求代理但资源池已耗尽
    #[error("no proxy available and this deployment requires one")]
    NoProxyAvailable,
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// 暂存文件读写失败
    #[error("staging I/O error: {0}")]
    Staging(#[from] std::io::Error),
}

/// 异步任务的立即回执
///
/// 提交方拿到进程句柄用于状态轮询和日志查询；
/// 任务结果本身不会回传给提交方。
#[derive(Debug, Clone)]
pub struct JobHandle {
    /// 完整进程句柄
    pub process_id: String,
    /// 短句柄前缀，用于展示
    pub short_id: String,
    /// 是否绑定了代理资源
    pub proxied: bool,
}

/// 任务终态
#[derive(Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// 工作进程正常退出，结果已上传
    Uploaded { key: String },
    /// 工作进程非零退出，输出被丢弃；这是预期内的结果而非系统错误
    Discarded { exit_code: i64 },
}

/// 任务生命周期管理器
///
/// 驱动单个任务走完 创建 → 启动 → 等待 → 提取上传/丢弃 → 清理
/// 的全过程。进程的移除和代理锁的释放在每条路径上都保证执行，
/// 且进程移除由 `container-cleanup:<id>` 锁保证恰好一次。
pub struct ProvisionJobUseCase {
    runtime: Arc<dyn RuntimeRepository>,
    locks: Arc<dyn LockRepository>,
    storage: Arc<dyn StorageRepository>,
    pool: Arc<ProxyPoolService>,
    settings: ProvisionerSettings,
}

impl ProvisionJobUseCase {
    pub fn new(
        runtime: Arc<dyn RuntimeRepository>,
        locks: Arc<dyn LockRepository>,
        storage: Arc<dyn StorageRepository>,
        pool: Arc<ProxyPoolService>,
        settings: ProvisionerSettings,
    ) -> Self {
        Self {
            runtime,
            locks,
            storage,
            pool,
            settings,
        }
    }

    /// 启动一个已通过准入的任务
    ///
    /// 同步完成代理获取和进程创建，让提交方立即拿到进程句柄；
    /// 随后的运行阶段在独立的异步任务中执行，彼此互不阻塞。
    pub async fn launch(self: Arc<Self>, mut job: Job) -> Result<JobHandle, ProvisionError> {
        match self.pool.acquire().await? {
            Some(binding) => job.proxy = Some(binding),
            None if self.settings.require_proxy => return Err(ProvisionError::NoProxyAvailable),
            None => {
                warn!(
                    target_name = %job.location_name,
                    "no proxy available; proceeding with direct egress"
                );
            }
        }

        let spec = self.worker_spec(&job);
        let process_id = match self.runtime.create(&spec).await {
            Ok(id) => id,
            Err(e) => {
                // The job never owned a process; only the proxy needs undoing.
                if let Some(binding) = &job.proxy {
                    if let Err(release_err) = self.pool.release(binding).await {
                        error!("proxy release after create failure failed: {}", release_err);
                    }
                }
                return Err(e.into());
            }
        };
        job.process_id = Some(process_id.clone());

        let handle = JobHandle {
            short_id: url_utils::short_id(&process_id),
            proxied: job.proxy.is_some(),
            process_id: process_id.clone(),
        };

        tokio::spawn(async move {
            self.run(job, process_id).await;
        });

        Ok(handle)
    }

    /// 运行已创建的任务直到终态，并无条件清理
    ///
    /// 错误不回传给原始提交方；通过日志和指标观察。
    pub async fn run(&self, job: Job, process_id: String) {
        counter!("provision_jobs_started_total").increment(1);

        let outcome = self.execute(&job, &process_id).await;
        match &outcome {
            Ok(JobOutcome::Uploaded { key }) => {
                info!(process = %process_id, object = %key, "scrape job succeeded");
                counter!("provision_jobs_succeeded_total").increment(1);
            }
            Ok(JobOutcome::Discarded { exit_code }) => {
                warn!(
                    process = %process_id,
                    exit_code,
                    "worker exited non-zero; output discarded"
                );
                counter!("provision_jobs_failed_total").increment(1);
            }
            Err(e) => {
                error!(process = %process_id, "scrape job failed: {}", e);
                counter!("provision_jobs_failed_total").increment(1);
            }
        }

        // Cleanup runs once the outcome is known, on every path.
        self.cleanup(&job, &process_id).await;
    }

    /// 启动、等待并在正常退出时提取上传结果
    async fn execute(&self, job: &Job, process_id: &str) -> Result<JobOutcome, ProvisionError> {
        self.runtime.start(process_id).await?;
        info!(
            process = %process_id,
            owner = %job.upload_identifier,
            target_name = %job.location_name,
            mode = %job.mode,
            "worker started"
        );

        let exit_code = self.runtime.wait(process_id).await?;
        if exit_code != 0 {
            return Ok(JobOutcome::Discarded { exit_code });
        }

        let contents = self
            .runtime
            .copy_file(process_id, &self.settings.result_path)
            .await?;

        // A fresh suffix keeps concurrent jobs against the same target
        // from clobbering each other's staging copy.
        let file_name =
            url_utils::staging_file_name(&job.location_name, &url_utils::staging_suffix());
        let staging_path = PathBuf::from(&self.settings.staging_dir).join(&file_name);

        fs::write(&staging_path, &contents).await?;

        let upload = self
            .storage
            .put(&file_name, &staging_path, &job.upload_identifier)
            .await;

        // The staging copy goes away whether or not the upload succeeded.
        if let Err(e) = fs::remove_file(&staging_path).await {
            warn!(path = %staging_path.display(), "failed to delete staging copy: {}", e);
        }

        upload?;
        Ok(JobOutcome::Uploaded { key: file_name })
    }

    /// 保证清理：恰好一次的进程移除，随后释放代理锁
    async fn cleanup(&self, job: &Job, process_id: &str) {
        // Removal mutex shared with the shutdown reaper: whoever wins the
        // lock removes the process, the other side skips.
        let cleanup_key = format!("container-cleanup:{}", process_id);
        match self
            .locks
            .acquire(&cleanup_key, self.settings.cleanup_lock_ttl)
            .await
        {
            Ok(true) => {
                if let Err(e) = self.runtime.remove(process_id).await {
                    error!(process = %process_id, "worker removal failed: {}", e);
                }
                if let Err(e) = self.locks.release(&cleanup_key).await {
                    warn!(process = %process_id, "cleanup lock release failed: {}", e);
                }
            }
            Ok(false) => {
                info!(process = %process_id, "worker already being removed elsewhere");
            }
            Err(e) => {
                // The lock is advisory; with the lock service down, leaking
                // the process is worse than a duplicate removal attempt.
                warn!(process = %process_id, "cleanup lock unavailable: {}", e);
                if let Err(e) = self.runtime.remove(process_id).await {
                    error!(process = %process_id, "worker removal failed: {}", e);
                }
            }
        }

        if let Some(binding) = &job.proxy {
            if let Err(e) = self.pool.release(binding).await {
                error!(proxy = %binding.resource.id, "proxy release failed: {}", e);
            }
        }
    }

    /// 生成工作进程的创建配置
    ///
    /// 环境变量契约与工作镜像约定：目标URL、模式、目标名称、
    /// 可选的代理地址、固定并发度和编排器标记。
    fn worker_spec(&self, job: &Job) -> WorkerSpec {
        let mut env = vec![
            format!("LOCATION_URL={}", job.target_url),
            format!("SCRAPE_MODE={}", job.mode),
            format!("{}={}", job.mode.name_env_var(), job.location_name),
            "CONCURRENCY=1".to_string(),
            "IS_PROVISIONER=true".to_string(),
        ];

        let mut labels = HashMap::new();
        labels.insert(
            LABEL_TASK_OWNER.to_string(),
            job.upload_identifier.clone(),
        );
        labels.insert(LABEL_TARGET.to_string(), job.location_name.clone());

        if let Some(binding) = &job.proxy {
            env.push(format!("PROXY_HOST={}", binding.resource.address));
            if let Some(region) = &binding.resource.region {
                labels.insert(LABEL_VPN_REGION.to_string(), region.clone());
            }
        }

        WorkerSpec {
            image: self.settings.image.clone(),
            env,
            labels,
        }
    }
}
