// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::domain::repositories::storage_repository::StoredObject;

/// 对象存储中一个结果文件的展示数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultObjectDto {
    /// 对象键名
    pub key: String,
    /// 对象大小（字节）
    pub size: i64,
    /// 最后修改时间，展示用格式
    pub last_modified: String,
    /// 上传者标识
    pub uploaded_by: Option<String>,
}

impl From<StoredObject> for ResultObjectDto {
    fn from(object: StoredObject) -> Self {
        // RFC3339 from the store, a friendlier shape for the page.
        let last_modified = DateTime::parse_from_rfc3339(&object.last_modified)
            .map(|ts| ts.format("%m/%d/%Y %H:%M:%S %Z").to_string())
            .unwrap_or(object.last_modified);

        Self {
            key: object.key,
            size: object.size,
            last_modified,
            uploaded_by: object.uploaded_by,
        }
    }
}
