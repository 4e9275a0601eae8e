//! 配置模块，负责加载JSON配置文件

use crate::builder::Options;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 未显式配置时注入的默认行数上限
pub const DEFAULT_LIMIT: i64 = 100;

/// 查询编译器的运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// 允许查询的日志表（RawSQL模式的表白名单）
    pub table_name: String,
    /// 未显式指定LIMIT时注入的默认行数上限
    #[serde(default = "default_limit")]
    pub default_limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl QueryConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(Error::config(format!(
                "配置文件不存在: {}",
                path_ref.display()
            )));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|e| {
            Error::config(format!("无法读取配置文件 {}: {}", path_ref.display(), e))
        })?;

        // 解析JSON
        let config: QueryConfig = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!(
                "无法解析JSON配置文件 {}: {}",
                path_ref.display(),
                e
            ))
        })?;

        if config.table_name.is_empty() {
            return Err(Error::config(format!(
                "配置文件 {} 缺少 table_name",
                path_ref.display()
            )));
        }

        Ok(config)
    }

    /// 生成对应的编译选项
    pub fn options(&self) -> Options {
        Options::new(&self.table_name).with_limit(self.default_limit)
    }
}

impl Default for QueryConfig {
    /// 默认配置（用于测试或fallback）
    fn default() -> Self {
        Self {
            table_name: "default.logs".to_string(),
            default_limit: DEFAULT_LIMIT,
        }
    }
}
