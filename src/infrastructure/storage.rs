// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;

use crate::domain::repositories::storage_repository::{
    StorageError, StorageRepository, StoredObject,
};

/// 对象元数据中的上传者键名
const METADATA_UPLOADED_BY: &str = "uploadedby";

/// R2 对象存储实现
///
/// 通过S3兼容API访问Cloudflare R2存储桶。结果文件在此落盘，
/// 核心不解释文件内容。
pub struct R2Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl R2Storage {
    /// 创建R2存储客户端
    ///
    /// # 参数
    ///
    /// * `account_id` - Cloudflare账户ID，决定端点地址
    /// * `bucket` - 存储桶名称
    /// * `access_key` - 访问密钥ID
    /// * `secret_key` - 访问密钥
    pub fn new(account_id: String, bucket: String, access_key: String, secret_key: String) -> Self {
        let credentials =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let endpoint = format!("https://{}.r2.cloudflarestorage.com", account_id);

        let config = aws_sdk_s3::config::Builder::new()
            .region(aws_sdk_s3::config::Region::new("auto"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = aws_sdk_s3::Client::from_conf(config);

        Self { client, bucket }
    }
}

#[async_trait]
impl StorageRepository for R2Storage {
    async fn put(&self, key: &str, path: &Path, uploaded_by: &str) -> Result<(), StorageError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .metadata(METADATA_UPLOADED_BY, uploaded_by)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredObject>, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let objects = output
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| {
                let key = object.key?;
                Some(StoredObject {
                    key,
                    size: object.size.unwrap_or(0),
                    last_modified: object
                        .last_modified
                        .map(|ts| ts.to_string())
                        .unwrap_or_default(),
                    uploaded_by: None,
                })
            })
            .collect();

        Ok(objects)
    }

    async fn head(&self, key: &str) -> Result<Option<String>, StorageError> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        Ok(response
            .metadata
            .and_then(|m| m.get(METADATA_UPLOADED_BY).cloned()))
    }
}
