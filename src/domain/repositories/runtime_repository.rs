// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::models::worker_process::WorkerProcess;

/// 容器运行时错误类型
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// 运行时不可达或请求失败
    #[error("runtime I/O error: {0}")]
    Io(String),
    /// wait 协议层面的错误，区别于进程的非零退出
    #[error("wait protocol error: {0}")]
    Wait(String),
    /// 指定的进程不存在
    #[error("process not found: {0}")]
    NotFound(String),
}

/// 工作进程创建配置
///
/// 传给容器运行时的全部创建参数：镜像、环境变量和标签。
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    /// 工作进程镜像
    pub image: String,
    /// 环境变量，KEY=VALUE 形式
    pub env: Vec<String>,
    /// 进程标签，用于发现和过滤
    pub labels: HashMap<String, String>,
}

/// 容器运行时仓库特质
///
/// 容器运行时之上的薄适配层，只做 I/O 不做策略。
/// 具体实现由基础设施层提供，测试中可用内存假实现替换。
#[async_trait]
pub trait RuntimeRepository: Send + Sync {
    /// 检查运行时是否可达
    async fn ping(&self) -> Result<(), RuntimeError>;

    /// 拉取镜像
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

    /// 创建工作进程，返回运行时分配的进程句柄
    async fn create(&self, spec: &WorkerSpec) -> Result<String, RuntimeError>;

    /// 启动进程
    async fn start(&self, id: &str) -> Result<(), RuntimeError>;

    /// 阻塞等待进程退出，返回退出码
    ///
    /// wait 协议自身的错误通过 `RuntimeError::Wait` 返回，
    /// 与进程的非零退出码是两类不同的结果。
    async fn wait(&self, id: &str) -> Result<i64, RuntimeError>;

    /// 从进程文件系统中拷出单个文件的内容
    async fn copy_file(&self, id: &str, path: &str) -> Result<Bytes, RuntimeError>;

    /// 强制移除进程及其附带的临时卷
    async fn remove(&self, id: &str) -> Result<(), RuntimeError>;

    /// 列出当前所有由本系统管理的进程
    async fn list(&self) -> Result<Vec<WorkerProcess>, RuntimeError>;

    /// 持续读取进程标准输出，直到进程结束
    async fn log_stream(
        &self,
        id: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, RuntimeError>>, RuntimeError>;
}
