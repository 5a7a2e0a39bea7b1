// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;

/// 任务所有者标签，值为上传者标识或代理哨兵值
pub const LABEL_TASK_OWNER: &str = "TaskOwner";
/// 抓取目标标签
pub const LABEL_TARGET: &str = "Target";
/// 代理进程所在区域标签
pub const LABEL_VPN_REGION: &str = "vpn.region";
/// 代理主机地址标签
pub const LABEL_PROXY_HOST: &str = "vpn.proxy.host";
/// 代理端口标签
pub const LABEL_PROXY_PORT: &str = "vpn.proxy.port";

/// TaskOwner 标签的哨兵值，标记该进程是代理进程而不是抓取任务
pub const PROXY_OWNER_SENTINEL: &str = "proxy-pool";

/// 进程状态
///
/// 列表查询只携带状态分类；退出码以 wait 原语的返回值为准。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// 已创建但尚未启动
    Created,
    /// 运行中
    Running,
    /// 已退出（附带退出码）
    Exited(i64),
}

impl ProcessState {
    /// 从容器运行时的状态字符串解析
    pub fn from_runtime_state(state: &str) -> Self {
        match state {
            "created" => ProcessState::Created,
            "running" | "restarting" | "paused" => ProcessState::Running,
            // Listing does not carry the exit code; wait() is authoritative.
            _ => ProcessState::Exited(0),
        }
    }
}

/// 工作进程
///
/// 与容器运行时进程一一对应。由创建它的任务生命周期管理器
/// 独占持有，直到被移除为止。
#[derive(Debug, Clone)]
pub struct WorkerProcess {
    /// 运行时分配的不透明进程句柄
    pub id: String,
    /// 进程标签
    pub labels: HashMap<String, String>,
    /// 进程状态
    pub state: ProcessState,
}

impl WorkerProcess {
    /// 任务所有者（TaskOwner 标签值）
    pub fn owner(&self) -> Option<&str> {
        self.labels.get(LABEL_TASK_OWNER).map(String::as_str)
    }

    /// 抓取目标（Target 标签值）
    pub fn target(&self) -> Option<&str> {
        self.labels.get(LABEL_TARGET).map(String::as_str)
    }

    /// 代理区域（vpn.region 标签值）
    pub fn region(&self) -> Option<&str> {
        self.labels.get(LABEL_VPN_REGION).map(String::as_str)
    }

    /// 该进程是否为代理进程
    pub fn is_proxy(&self) -> bool {
        self.owner() == Some(PROXY_OWNER_SENTINEL)
    }

    /// 代理地址，由主机和端口标签拼接而成
    ///
    /// 两个标签缺一不可，缺失时返回 None，表示该代理资源不可用。
    pub fn proxy_address(&self) -> Option<String> {
        let host = self.labels.get(LABEL_PROXY_HOST)?;
        let port = self.labels.get(LABEL_PROXY_PORT)?;
        if host.is_empty() || port.is_empty() {
            return None;
        }
        Some(format!("http://{}:{}", host, port))
    }
}
