// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::repositories::lock_repository::LockRepository;
use crate::domain::repositories::runtime_repository::RuntimeRepository;

/// 关停清扫器
///
/// 进程收到终止信号后执行一次：清扫所有残留的抓取进程并
/// 释放启动期持有的池级锁。与在途任务通过互不相同的锁命名
/// 空间（`container-cleanup:` 对 `proxy-usage:`）避免双重清理。
pub struct ShutdownReaper {
    runtime: Arc<dyn RuntimeRepository>,
    locks: Arc<dyn LockRepository>,
    /// 启动期获取、由清扫负责释放的池级锁（如镜像拉取锁）
    startup_locks: Arc<DashSet<String>>,
    cleanup_lock_ttl: usize,
}

impl ShutdownReaper {
    pub fn new(
        runtime: Arc<dyn RuntimeRepository>,
        locks: Arc<dyn LockRepository>,
        startup_locks: Arc<DashSet<String>>,
        cleanup_lock_ttl: usize,
    ) -> Self {
        Self {
            runtime,
            locks,
            startup_locks,
            cleanup_lock_ttl,
        }
    }

    /// 清扫所有活跃的抓取进程
    ///
    /// 逐个尝试获取进程的移除互斥锁：拿到就强制移除，拿不到
    /// 说明另一个清扫者或任务本身正在处理，直接跳过不重试。
    /// 所有错误只记录日志，绝不阻塞进程退出。
    pub async fn sweep(&self) {
        info!("shutdown sweep started");

        let processes = match self.runtime.list().await {
            Ok(processes) => processes,
            Err(e) => {
                error!("shutdown sweep could not list processes: {}", e);
                Vec::new()
            }
        };

        for process in processes.into_iter().filter(|p| !p.is_proxy()) {
            let cleanup_key = format!("container-cleanup:{}", process.id);
            match self.locks.acquire(&cleanup_key, self.cleanup_lock_ttl).await {
                Ok(true) => {
                    match self.runtime.remove(&process.id).await {
                        Ok(()) => info!(process = %process.id, "worker removed by shutdown sweep"),
                        Err(e) => error!(process = %process.id, "sweep removal failed: {}", e),
                    }
                    if let Err(e) = self.locks.release(&cleanup_key).await {
                        warn!(process = %process.id, "cleanup lock release failed: {}", e);
                    }
                }
                Ok(false) => {
                    debug!(process = %process.id, "cleanup already owned elsewhere; skipping");
                }
                Err(e) => {
                    warn!(process = %process.id, "cleanup lock unavailable: {}; skipping", e);
                }
            }
        }

        let held: Vec<String> = self
            .startup_locks
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for key in held {
            if let Err(e) = self.locks.release(&key).await {
                warn!(key = %key, "startup lock release failed: {}", e);
            }
            self.startup_locks.remove(&key);
        }

        info!("shutdown sweep finished");
    }
}
