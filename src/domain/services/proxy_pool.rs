// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::proxy::{ProxyBinding, ProxyResource};
use crate::domain::repositories::lock_repository::{LockError, LockRepository};
use crate::domain::repositories::runtime_repository::{RuntimeError, RuntimeRepository};

/// 资源池错误类型
#[derive(Error, Debug)]
pub enum PoolError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// 代理资源池管理器
///
/// 仲裁预先部署的代理进程的独占使用权。每个代理由分布式锁
/// `proxy-usage:<id>` 保护，锁的原子获取保证同一时刻最多
/// 一个任务持有同一个代理。
pub struct ProxyPoolService {
    runtime: Arc<dyn RuntimeRepository>,
    locks: Arc<dyn LockRepository>,
    lock_ttl_seconds: usize,
}

impl ProxyPoolService {
    /// 创建资源池管理器
    ///
    /// `lock_ttl_seconds` 必须大于抓取任务的最长预期时长：
    /// TTL过期是持有者崩溃时的安全网，不是正常的释放路径。
    pub fn new(
        runtime: Arc<dyn RuntimeRepository>,
        locks: Arc<dyn LockRepository>,
        lock_ttl_seconds: usize,
    ) -> Self {
        Self {
            runtime,
            locks,
            lock_ttl_seconds,
        }
    }

    /// 尝试获取一个空闲代理
    ///
    /// 按列表顺序逐个尝试加锁，返回第一个锁定成功且地址可用的
    /// 资源。没有重试也没有排队；全部失败时返回 None，表示
    /// 代理暂时耗尽，调用方自行决定降级还是拒绝。
    pub async fn acquire(&self) -> Result<Option<ProxyBinding>, PoolError> {
        let processes = self.runtime.list().await?;

        for process in processes.into_iter().filter(|p| p.is_proxy()) {
            // A proxy without usable address labels is skipped, not locked.
            let address = match process.proxy_address() {
                Some(address) => address,
                None => continue,
            };

            let resource = ProxyResource {
                id: process.id.clone(),
                address,
                region: process.region().map(str::to_string),
            };

            if self
                .locks
                .acquire(&resource.lock_key(), self.lock_ttl_seconds)
                .await?
            {
                debug!(proxy = %resource.id, region = ?resource.region, "proxy acquired");
                return Ok(Some(ProxyBinding::new(resource)));
            }
        }

        Ok(None)
    }

    /// 释放代理绑定
    ///
    /// 幂等操作：正常完成路径与关停清扫路径可能各释放一次，
    /// 重复释放或释放不存在的键都不是错误。
    pub async fn release(&self, binding: &ProxyBinding) -> Result<(), PoolError> {
        self.locks.release(&binding.lock_key).await?;
        debug!(proxy = %binding.resource.id, "proxy released");
        Ok(())
    }
}
