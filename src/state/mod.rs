//! # 应用状态模块
//!
//! 定义了处理器之间共享的状态：
//! - `reaction` - 有上限的内存留言缓冲区

pub mod reaction;

pub use reaction::{ReactionRecord, ReactionStore, RequestMeta};

use crate::config::{ConfigProvider, EnvConfig};
use std::sync::Arc;

/// 应用状态
///
/// 由路由器持有并注入每个处理器；测试中可以各自创建独立实例。
///
/// ### 字段说明
/// - `reactions`: 留言缓冲区（进程内，重启即清空）
/// - `config`: 配置来源，鉴权配置每次请求时从这里重新读取
#[derive(Clone)]
pub struct AppState {
    pub reactions: ReactionStore,
    pub config: Arc<dyn ConfigProvider>,
}

impl AppState {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            reactions: ReactionStore::new(),
            config,
        }
    }

    /// 使用进程环境变量作为配置来源
    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvConfig))
    }
}
