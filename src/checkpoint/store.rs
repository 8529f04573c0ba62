//! 断点存储抽象
//!
//! 只按 ID 存取不透明字节；不解析内容。Load 必须返回与 Save 完全相同的字节。

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::CheckpointError;

/// 同一 ID 上已有活动断点时 Save 的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// 拒绝并返回 CheckpointError::Conflict
    #[default]
    Reject,
    /// 覆盖旧断点
    Overwrite,
}

/// 断点存储 trait：不同 ID 可并发访问，同一 ID 的操作由实现串行化
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, id: &str, state: Vec<u8>) -> Result<(), CheckpointError>;

    /// 不存在时返回 Ok(None)
    async fn load(&self, id: &str) -> Result<Option<Vec<u8>>, CheckpointError>;

    /// 删除不存在的 ID 不是错误
    async fn delete(&self, id: &str) -> Result<(), CheckpointError>;
}
