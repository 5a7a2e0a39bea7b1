// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// 分布式锁错误类型
#[derive(Error, Debug)]
pub enum LockError {
    /// 锁服务后端错误
    #[error("lock backend error: {0}")]
    Backend(String),
}

/// 分布式锁与缓存仓库特质
///
/// 外部缓存/锁服务的抽象：原子的带TTL获取、幂等的释放，
/// 以及用于缓存列表数据的普通读写。
#[async_trait]
pub trait LockRepository: Send + Sync {
    /// 原子地获取锁（set-if-absent 语义）
    ///
    /// # 参数
    ///
    /// * `key` - 锁键名
    /// * `ttl_seconds` - 过期时间（秒），是持有者崩溃时的安全网
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 获取成功，当前调用方为唯一持有者
    /// * `Ok(false)` - 锁已被其他持有者占用
    async fn acquire(&self, key: &str, ttl_seconds: usize) -> Result<bool, LockError>;

    /// 释放锁
    ///
    /// 幂等操作：释放不存在的键不是错误。正常完成路径与
    /// 关停清扫路径可能对同一个键各释放一次。
    async fn release(&self, key: &str) -> Result<(), LockError>;

    /// 读取缓存值
    async fn get(&self, key: &str) -> Result<Option<String>, LockError>;

    /// 写入缓存值并指定过期时间
    async fn set(&self, key: &str, value: &str, ttl_seconds: usize) -> Result<(), LockError>;
}
