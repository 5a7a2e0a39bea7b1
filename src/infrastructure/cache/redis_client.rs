// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;

use crate::domain::repositories::lock_repository::{LockError, LockRepository};

/// Redis客户端
///
/// 提供对Redis数据库的异步操作接口，承担两类职责：
/// 带TTL的原子互斥锁（set-if-absent语义）和列表数据的读穿缓存。
#[derive(Clone)]
pub struct RedisClient {
    /// Redis客户端
    client: redis::Client,
}

impl RedisClient {
    /// 创建新的Redis客户端实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisClient)` - Redis客户端实例
    /// * `Err(anyhow::Error)` - 创建过程中出现的错误
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// 检查Redis服务器是否可达
    pub async fn ping(&self) -> Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<()>(&mut con).await?;
        Ok(())
    }

    /// 获取指定键的值
    ///
    /// # 参数
    ///
    /// * `key` - 键
    ///
    /// # 返回值
    ///
    /// * `Ok(Option<String>)` - 键对应的值，如果不存在则返回None
    /// * `Err(anyhow::Error)` - 获取过程中出现的错误
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    /// 设置键值对并指定过期时间
    ///
    /// # 参数
    ///
    /// * `key` - 键
    /// * `value` - 值
    /// * `ttl_seconds` - 过期时间（秒）
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 设置成功
    /// * `Err(anyhow::Error)` - 设置过程中出现的错误
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: usize) -> Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.set_ex::<_, _, ()>(key, value, ttl_seconds as u64)
            .await?;
        Ok(())
    }

    /// 原子地获取带过期时间的锁（SET NX EX）
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 键不存在，本次调用成为唯一持有者
    /// * `Ok(false)` - 键已存在，锁被其他持有者占用
    pub async fn set_if_absent(&self, key: &str, ttl_seconds: usize) -> Result<bool> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds as u64)
            .query_async(&mut con)
            .await?;
        Ok(reply.is_some())
    }

    /// 删除键
    ///
    /// 删除不存在的键不是错误。
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.del::<_, ()>(key).await?;
        Ok(())
    }
}

#[async_trait]
impl LockRepository for RedisClient {
    async fn acquire(&self, key: &str, ttl_seconds: usize) -> Result<bool, LockError> {
        self.set_if_absent(key, ttl_seconds)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))
    }

    async fn release(&self, key: &str) -> Result<(), LockError> {
        self.delete(key)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, LockError> {
        RedisClient::get(self, key)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: usize) -> Result<(), LockError> {
        RedisClient::set(self, key, value, ttl_seconds)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))
    }
}
