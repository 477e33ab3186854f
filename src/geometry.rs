// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 几何判定 (Geometry)
//!
//! 点在多边形内判定: 射线法 (crossing number),整数精确运算 (i128,覆盖完整 i32 坐标范围)。
//! 边界策略: 落在边或顶点上的点视为在多边形内部 (boundary-inclusive),
//! 避免目标中心点在区域边缘来回抖动。

use serde::{Deserialize, Serialize};

/// 整数像素坐标点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// 判断点是否在闭合多边形内 (含边界)
///
/// 最后一个顶点隐式连接第一个顶点。顶点少于3个时恒为 `false`。
/// 复杂度 O(n),无内部状态。
pub fn contains(polygon: &[Point], point: Point) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let px = point.x as i128;
    let py = point.y as i128;
    let mut inside = false;

    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let (ax, ay) = (a.x as i128, a.y as i128);
        let (bx, by) = (b.x as i128, b.y as i128);

        // 叉积: 点相对边 a→b 的方向
        let cross = (bx - ax) * (py - ay) - (px - ax) * (by - ay);

        if cross == 0 && on_segment(ax, ay, bx, by, px, py) {
            return true;
        }

        // 水平向右射线与边相交 (半开区间,避免顶点重复计数)
        if (ay > py) != (by > py) {
            let crosses = if by > ay { cross > 0 } else { cross < 0 };
            if crosses {
                inside = !inside;
            }
        }
    }

    inside
}

// 共线前提下,点是否在线段包围盒内
fn on_segment(ax: i128, ay: i128, bx: i128, by: i128, px: i128, py: i128) -> bool {
    px >= ax.min(bx) && px <= ax.max(bx) && py >= ay.min(by) && py <= ay.max(by)
}
