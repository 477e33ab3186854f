// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 方向规则: 从入口区域进入、再到达出口区域,记为一个方向的越线。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 越线方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    In,
    Out,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::In,
        Direction::Out,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
            Direction::In => "In",
            Direction::Out => "Out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown direction: {}", s))
    }
}

/// 方向规则 (entry → exit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingRule {
    pub entry: String,
    pub exit: String,
    pub direction: Direction,
}

impl CrossingRule {
    pub fn new(entry: impl Into<String>, exit: impl Into<String>, direction: Direction) -> Self {
        Self {
            entry: entry.into(),
            exit: exit.into(),
            direction,
        }
    }

    /// 默认规则: area1 → area2 向上, area2 → area1 向下
    pub fn defaults() -> Vec<CrossingRule> {
        vec![
            CrossingRule::new("area1", "area2", Direction::Up),
            CrossingRule::new("area2", "area1", Direction::Down),
        ]
    }
}

impl fmt::Display for CrossingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {} ({})", self.entry, self.exit, self.direction)
    }
}

impl FromStr for CrossingRule {
    type Err = String;

    /// 命令行格式: `entry:exit:direction`, 例如 `area1:area2:up`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [entry, exit, direction] if !entry.is_empty() && !exit.is_empty() => {
                Ok(CrossingRule::new(*entry, *exit, direction.parse()?))
            }
            _ => Err(format!("expected entry:exit:direction, got {:?}", s)),
        }
    }
}
