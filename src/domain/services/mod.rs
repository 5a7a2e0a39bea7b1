// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务，这些服务封装了复杂的
/// 业务规则和领域逻辑，协调多个领域对象来完成业务操作。
///
/// 包含的服务：
/// - 准入控制（admission）：按模式、URL、标识和并发上限评估新请求
/// - 代理资源池（proxy_pool）：通过分布式锁仲裁代理的独占使用权
pub mod admission;
pub mod proxy_pool;
