// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含服务器、Redis、对象存储和任务编排等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 对象存储配置
    pub storage: StorageSettings,
    /// 任务编排配置
    pub provisioner: ProvisionerSettings,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// Redis配置设置
#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL
    pub url: String,
}

/// 对象存储配置设置
#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    /// Cloudflare账户ID，决定R2端点地址
    pub account_id: String,
    /// 存储桶名称
    pub bucket: String,
    /// 访问密钥ID
    pub access_key: String,
    /// 访问密钥
    pub secret_key: String,
    /// 对象列表缓存的过期时间（秒）
    pub listing_cache_ttl: usize,
}

/// 任务编排配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionerSettings {
    /// 工作进程镜像
    pub image: String,
    /// 活跃抓取任务的并发上限
    pub max_active_jobs: usize,
    /// 没有可用代理时是拒绝任务（true）还是直连降级（false）
    pub require_proxy: bool,
    /// 代理互斥锁的过期时间（秒），必须大于抓取任务的最长预期时长
    pub proxy_lock_ttl: usize,
    /// 进程移除互斥锁的过期时间（秒）
    pub cleanup_lock_ttl: usize,
    /// 镜像拉取锁的过期时间（秒）
    pub image_pull_lock_ttl: usize,
    /// 工作进程内结果文件的固定路径
    pub result_path: String,
    /// 结果文件的本地暂存目录
    pub staging_dir: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("redis.url", "redis://localhost:6379")?
            // Default Storage settings; credentials come from the environment
            .set_default("storage.account_id", "")?
            .set_default("storage.bucket", "scraper-results")?
            .set_default("storage.access_key", "")?
            .set_default("storage.secret_key", "")?
            .set_default("storage.listing_cache_ttl", 300)?
            // Default Provisioner settings
            .set_default(
                "provisioner.image",
                "ghcr.io/algo7/tripadvisor-review-scraper/scrap:latest",
            )?
            .set_default("provisioner.max_active_jobs", 5)?
            .set_default("provisioner.require_proxy", false)?
            .set_default("provisioner.proxy_lock_ttl", 3600)?
            .set_default("provisioner.cleanup_lock_ttl", 60)?
            .set_default("provisioner.image_pull_lock_ttl", 600)?
            .set_default("provisioner.result_path", "/workdir/reviews/All.csv")?
            .set_default("provisioner.staging_dir", "./staging")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("PROVISIONRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}
