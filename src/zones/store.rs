// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 区域存储 (Polygon Store)
//!
//! 保存所有已命名的区域多边形,以及正在绘制中的顶点缓冲区。
//! 持久化为单个JSON文件,区域顺序与顶点顺序原样保存。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ZoneError};
use crate::geometry::{self, Point};

/// 默认持久化文件
pub const DEFAULT_ZONES_FILE: &str = "zones.json";

/// 默认每个区域的顶点数 (四边形)
pub const DEFAULT_VERTEX_CAP: usize = 4;

/// 命名区域 (闭合简单多边形, 至少3个顶点)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    vertices: Vec<Point>,
}

impl Zone {
    pub fn new(name: impl Into<String>, vertices: Vec<Point>) -> Result<Self> {
        let name = name.into();
        if vertices.len() < 3 {
            return Err(ZoneError::InvalidZone {
                name,
                got: vertices.len(),
            });
        }
        Ok(Self { name, vertices })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn contains(&self, point: Point) -> bool {
        geometry::contains(&self.vertices, point)
    }
}

/// 持久化文件格式
#[derive(Debug, Default, Serialize, Deserialize)]
struct ZoneFile {
    zones: Vec<Zone>,
}

pub struct PolygonStore {
    /// 已完成的区域 (按创建顺序)
    zones: Vec<Zone>,

    /// 正在绘制中的顶点
    pending: Vec<Point>,

    /// 每个区域的顶点数上限
    vertex_cap: usize,

    /// 持久化文件路径
    path: PathBuf,
}

impl PolygonStore {
    /// 创建空存储 (不读取文件)
    pub fn new(path: impl Into<PathBuf>, vertex_cap: usize) -> Self {
        Self {
            zones: Vec::new(),
            pending: Vec::with_capacity(vertex_cap),
            vertex_cap: vertex_cap.max(3),
            path: path.into(),
        }
    }

    /// 创建并加载已保存的区域
    pub fn open(path: impl Into<PathBuf>, vertex_cap: usize) -> Result<Self> {
        let mut store = Self::new(path, vertex_cap);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn vertex_cap(&self) -> usize {
        self.vertex_cap
    }

    // ========== 绘制缓冲区 ==========

    /// 添加一个顶点; 缓冲区已满时静默忽略
    pub fn add_point(&mut self, point: Point) -> bool {
        if self.pending.len() >= self.vertex_cap {
            debug!(
                "⚠️ 顶点缓冲区已满 ({}/{}), 忽略点 ({}, {})",
                self.pending.len(),
                self.vertex_cap,
                point.x,
                point.y
            );
            return false;
        }
        self.pending.push(point);
        true
    }

    /// 为缓冲区中的多边形命名并加入存储
    ///
    /// 失败时缓冲区保留,用户可以换个名字重试。
    pub fn finalize(&mut self, name: &str) -> Result<&Zone> {
        if self.pending.len() != self.vertex_cap {
            return Err(ZoneError::IncompleteZone {
                expected: self.vertex_cap,
                got: self.pending.len(),
            });
        }
        let zone = Zone::new(name, self.pending.clone())?;
        self.insert(zone)?;
        self.pending.clear();

        let idx = self.zones.len() - 1;
        info!("✅ 区域 {} 已创建 ({} 个顶点)", name, self.vertex_cap);
        Ok(&self.zones[idx])
    }

    /// 丢弃正在绘制的顶点
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> &[Point] {
        &self.pending
    }

    pub fn is_pending_full(&self) -> bool {
        self.pending.len() == self.vertex_cap
    }

    // ========== 区域查询 ==========

    /// 直接加入一个完整区域 (名称必须唯一)
    pub fn insert(&mut self, zone: Zone) -> Result<()> {
        if self.zone(&zone.name).is_some() {
            return Err(ZoneError::DuplicateName(zone.name));
        }
        self.zones.push(zone);
        Ok(())
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    /// 点是否在指定区域内; 区域不存在时返回 `None`
    pub fn contains(&self, name: &str, point: Point) -> Option<bool> {
        self.zone(name).map(|z| z.contains(point))
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zones.iter().map(|z| z.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    // ========== 持久化 ==========

    /// 清空所有区域和缓冲区,并删除持久化文件
    pub fn clear_all(&mut self) -> Result<()> {
        self.zones.clear();
        self.pending.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => info!("🗑️ 已删除区域文件 {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// 保存所有区域到JSON文件
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = ZoneFile {
            zones: self.zones.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json)?;
        info!(
            "💾 {} 个区域已保存到 {}",
            self.zones.len(),
            self.path.display()
        );
        Ok(())
    }

    /// 从JSON文件加载区域
    ///
    /// 文件不存在时不做任何修改,返回 `Ok(false)`。
    pub fn load(&mut self) -> Result<bool> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("📝 区域文件 {} 不存在", self.path.display());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let file: ZoneFile = serde_json::from_str(&json)?;
        let mut zones: Vec<Zone> = Vec::with_capacity(file.zones.len());
        for zone in file.zones {
            if zone.vertices.len() < 3 {
                return Err(ZoneError::InvalidZone {
                    got: zone.vertices.len(),
                    name: zone.name,
                });
            }
            if zones.iter().any(|z| z.name == zone.name) {
                return Err(ZoneError::DuplicateName(zone.name));
            }
            zones.push(zone);
        }

        self.zones = zones;
        info!(
            "✅ 已从 {} 加载 {} 个区域",
            self.path.display(),
            self.zones.len()
        );
        Ok(true)
    }
}
