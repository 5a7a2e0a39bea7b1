// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 抓取任务（job）：一次被接受的抓取请求，从提交到资源释放
/// - 工作进程（worker_process）：执行实际抓取的容器运行时进程
/// - 代理资源（proxy）：预先部署、同一时刻最多被一个任务使用的出口通道
///
/// 这些模型都是短暂的：核心不保留任何持久化的任务历史，
/// 运行时列表和对象存储是仅有的事实来源。
pub mod job;
pub mod proxy;
pub mod worker_process;
