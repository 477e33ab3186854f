// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 区域管理 (Zone Management)
///
/// - PolygonStore: 命名区域存储 + 顶点缓冲区 + JSON持久化
/// - Authoring:    绘制命令与非阻塞命令队列
pub mod authoring;
pub mod store;

pub use authoring::{command_channel, spawn_command_reader, AuthoringCommand};
pub use store::{PolygonStore, Zone, DEFAULT_VERTEX_CAP, DEFAULT_ZONES_FILE};
