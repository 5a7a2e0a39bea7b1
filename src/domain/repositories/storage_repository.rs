// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 存储错误
    #[error("Storage error: {0}")]
    Other(String),
}

/// 对象存储中的一个结果文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    /// 对象键名
    pub key: String,
    /// 对象大小（字节）
    pub size: i64,
    /// 最后修改时间，RFC3339 格式
    pub last_modified: String,
    /// 上传者标识，来自对象元数据
    pub uploaded_by: Option<String>,
}

/// 存储仓库特质
///
/// 结果文件的持久化目的地。核心只搬运字节，不解释文件内容。
#[async_trait]
pub trait StorageRepository: Send + Sync {
    /// 上传本地文件，附带上传者元数据
    async fn put(&self, key: &str, path: &Path, uploaded_by: &str) -> Result<(), StorageError>;

    /// 列出所有对象（不含元数据）
    async fn list(&self) -> Result<Vec<StoredObject>, StorageError>;

    /// 查询单个对象的上传者元数据
    async fn head(&self, key: &str) -> Result<Option<String>, StorageError>;
}
