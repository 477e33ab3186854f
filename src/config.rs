// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 计数配置 - 通过JSON文件调整参数

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, info, warn};

use crate::counting::CrossingRule;
use crate::zones::{DEFAULT_VERTEX_CAP, DEFAULT_ZONES_FILE};

/// 计数参数配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    // === 区域 ===
    pub zones_file: String, // 区域持久化文件
    pub vertex_cap: usize,  // 每个区域的顶点数

    // === 计数规则 ===
    pub rules: Vec<CrossingRule>,

    // === 检测过滤 ===
    pub classes: Vec<String>, // 允许的类别 (空 = 全部)
    pub min_confidence: f32,  // 最低置信度

    // === 追踪状态 ===
    pub evict_after_frames: Option<u64>, // 超过N帧未出现的ID被清除 (None = 永不清除)

    // === 流水线 ===
    pub frame_queue: usize, // 检测线程 → 计数线程 队列长度
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            zones_file: DEFAULT_ZONES_FILE.to_string(),
            vertex_cap: DEFAULT_VERTEX_CAP,

            rules: CrossingRule::defaults(),

            classes: Vec::new(),
            min_confidence: 0.0,

            evict_after_frames: None,

            frame_queue: 8,
        }
    }
}

impl CounterConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写入默认配置; 读取或解析失败时使用默认值,不覆盖原文件。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️ 配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path);
                config
            }
            Err(e) => {
                warn!("⚠️ 无法读取配置文件 {}: {}, 使用默认值", path.display(), e);
                Self::default()
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    error!("❌ 保存配置失败: {}", e);
                } else {
                    info!("💾 配置已保存到 {}", path.display());
                }
            }
            Err(e) => error!("❌ 序列化配置失败: {}", e),
        }
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️ 当前计数配置:");
        info!("  区域文件: {}", self.zones_file);
        info!("  区域顶点数: {}", self.vertex_cap);
        for rule in &self.rules {
            info!("  规则: {}", rule);
        }
        if self.classes.is_empty() {
            info!("  类别过滤: 全部");
        } else {
            info!("  类别过滤: {}", self.classes.join(", "));
        }
        info!("  最低置信度: {:.2}", self.min_confidence);
        match self.evict_after_frames {
            Some(n) => info!("  追踪状态清除: {} 帧未出现", n),
            None => info!("  追踪状态清除: 禁用"),
        }
    }
}
