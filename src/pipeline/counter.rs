// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 计数器 (Counter)
//! 职责: 执行绘制命令 → 逐帧区域判定 → 越线事件 → 方向计数

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use tracing::{debug, info, warn};

use super::{FrameReport, Highlight, Overlay};
use crate::config::CounterConfig;
use crate::counting::{Counts, CrossingRule, CrossingTracker, Direction};
use crate::detection::{DetectionFilter, DetectionFrame};
use crate::error::Result;
use crate::zones::{AuthoringCommand, PolygonStore};

pub struct CountingPipeline {
    store: PolygonStore,
    tracker: CrossingTracker,
    counts: Counts,
    filter: DetectionFilter,

    /// 超过N帧未出现的追踪ID被清除
    evict_after: Option<u64>,

    /// 最近处理的帧号
    last_frame: Option<u64>,
    frames_processed: u64,
}

impl CountingPipeline {
    /// 按配置创建 (加载已保存的区域)
    pub fn new(config: &CounterConfig) -> Result<Self> {
        let store = PolygonStore::open(&config.zones_file, config.vertex_cap)?;
        let filter = DetectionFilter::new(config.classes.clone(), config.min_confidence);
        Ok(Self::from_parts(
            store,
            config.rules.clone(),
            filter,
            config.evict_after_frames,
        ))
    }

    pub fn from_parts(
        store: PolygonStore,
        rules: Vec<CrossingRule>,
        filter: DetectionFilter,
        evict_after: Option<u64>,
    ) -> Self {
        let counts = Counts::with_directions(rules.iter().map(|r| r.direction));
        let mut tracker = CrossingTracker::new(rules);
        tracker.sync_zones(&store);
        Self {
            store,
            tracker,
            counts,
            filter,
            evict_after,
            last_frame: None,
            frames_processed: 0,
        }
    }

    // ========== 绘制命令 ==========

    /// 执行一条绘制命令; 收到 `Quit` 时返回 `Break`
    ///
    /// 命令失败只记录日志,不影响计数。
    pub fn apply_command(&mut self, cmd: AuthoringCommand) -> ControlFlow<()> {
        match cmd {
            AuthoringCommand::AddPoint(p) => {
                if self.store.add_point(p) {
                    debug!(
                        "📍 顶点 ({}, {}) [{}/{}]",
                        p.x,
                        p.y,
                        self.store.pending().len(),
                        self.store.vertex_cap()
                    );
                    if self.store.is_pending_full() {
                        info!("✏️ 顶点已满,请为区域命名");
                    }
                }
            }
            AuthoringCommand::Finalize(name) => {
                if let Err(e) = self.store.finalize(&name) {
                    warn!("⚠️ 无法创建区域 {}: {}", name, e);
                }
            }
            AuthoringCommand::Discard => {
                self.store.discard_pending();
                info!("🧹 已丢弃未完成的顶点");
            }
            AuthoringCommand::Save => {
                if let Err(e) = self.store.save() {
                    warn!("❌ 保存区域失败: {}", e);
                }
            }
            AuthoringCommand::ClearAll => {
                match self.store.clear_all() {
                    Ok(()) => info!("🗑️ 所有区域已清空"),
                    Err(e) => warn!("❌ 清空区域失败: {}", e),
                }
            }
            AuthoringCommand::Quit => {
                info!("🛑 收到退出命令");
                return ControlFlow::Break(());
            }
        }
        self.tracker.sync_zones(&self.store);
        ControlFlow::Continue(())
    }

    // ========== 逐帧计数 ==========

    /// 处理一帧检测结果
    pub fn process_frame(&mut self, frame: &DetectionFrame) -> FrameReport {
        let index = frame
            .frame
            .unwrap_or_else(|| self.last_frame.map_or(0, |f| f + 1));
        self.last_frame = Some(index);
        self.frames_processed += 1;

        let mut report = FrameReport {
            frame: index,
            ..Default::default()
        };

        for det in frame.detections.iter().filter(|d| self.filter.accepts(d)) {
            let obs = self
                .tracker
                .observe(&self.store, det.track_id, det.center(), index);

            for direction in obs.exiting {
                report.highlights.push(Highlight {
                    track_id: det.track_id,
                    class_label: det.class_label.clone(),
                    bbox: det.bbox,
                    direction,
                });
            }

            // 被清除后重新出现的ID会再次产生事件,只上报首次计数
            for event in obs.events {
                if !self.counts.record(&event) {
                    continue;
                }
                info!(
                    "🚗 目标 #{} ({}) 越线方向 {} @帧{} → 累计 {}",
                    event.track_id,
                    det.class_label,
                    event.direction,
                    event.observed_at,
                    self.counts.count(event.direction)
                );
                report.events.push(event);
            }
        }

        if let Some(max_idle) = self.evict_after {
            let evicted = self.tracker.evict_stale(index, max_idle);
            if evicted > 0 {
                debug!("🧹 清除 {} 个过期追踪ID", evicted);
            }
        }

        report.counts = self.counts.snapshot();
        report
    }

    // ========== 查询 ==========

    pub fn overlay(&self) -> Overlay {
        Overlay {
            zones: self.store.zones().to_vec(),
            pending: self.store.pending().to_vec(),
            counts: self.counts.snapshot(),
        }
    }

    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.counts.count(direction)
    }

    pub fn count_snapshot(&self) -> BTreeMap<Direction, usize> {
        self.counts.snapshot()
    }

    pub fn store(&self) -> &PolygonStore {
        &self.store
    }

    pub fn tracker(&self) -> &CrossingTracker {
        &self.tracker
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BBox, Detection};
    use crate::geometry::Point;

    fn pipeline(dir: &tempfile::TempDir) -> CountingPipeline {
        let store = PolygonStore::new(dir.path().join("zones.json"), 4);
        CountingPipeline::from_parts(
            store,
            CrossingRule::defaults(),
            DetectionFilter::default(),
            None,
        )
    }

    fn draw(p: &mut CountingPipeline, name: &str, x0: i32, y0: i32, x1: i32, y1: i32) {
        for (x, y) in [(x0, y0), (x1, y0), (x1, y1), (x0, y1)] {
            let _ = p.apply_command(AuthoringCommand::AddPoint(Point::new(x, y)));
        }
        let _ = p.apply_command(AuthoringCommand::Finalize(name.to_string()));
    }

    fn car_at(track_id: i64, cx: i32, cy: i32) -> Detection {
        Detection::new(track_id, "car", BBox::new(cx - 5, cy - 5, cx + 5, cy + 5), 0.9)
    }

    #[test]
    fn test_authoring_then_counting() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(&dir);
        draw(&mut p, "area1", 0, 100, 100, 150);
        draw(&mut p, "area2", 0, 0, 100, 50);
        assert_eq!(p.store().len(), 2);
        assert!(!p.tracker().has_missing_zones());

        p.process_frame(&DetectionFrame::new(1, vec![car_at(1, 50, 125)]));
        let report = p.process_frame(&DetectionFrame::new(2, vec![car_at(1, 50, 25)]));
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.highlights.len(), 1);
        assert_eq!(report.highlights[0].direction, Direction::Up);
        assert_eq!(p.count(Direction::Up), 1);
        assert_eq!(p.count(Direction::Down), 0);
    }

    #[test]
    fn test_quit_breaks() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(&dir);
        assert!(p.apply_command(AuthoringCommand::Quit).is_break());
        assert!(p.apply_command(AuthoringCommand::Save).is_continue());
    }

    #[test]
    fn test_filter_skips_detections() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolygonStore::new(dir.path().join("zones.json"), 4);
        let mut p = CountingPipeline::from_parts(
            store,
            CrossingRule::defaults(),
            DetectionFilter::new(vec!["car".to_string()], 0.0),
            None,
        );
        draw(&mut p, "area1", 0, 100, 100, 150);
        let person = Detection::new(2, "person", BBox::new(45, 120, 55, 130), 0.9);
        p.process_frame(&DetectionFrame::new(1, vec![person]));
        assert!(p.tracker().track(2).is_none());
    }

    #[test]
    fn test_overlay_shows_pending_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(&dir);
        draw(&mut p, "area1", 0, 100, 100, 150);
        let _ = p.apply_command(AuthoringCommand::AddPoint(Point::new(1, 2)));

        let overlay = p.overlay();
        assert_eq!(overlay.zones.len(), 1);
        assert_eq!(overlay.pending, vec![Point::new(1, 2)]);
        assert_eq!(
            overlay.count_lines(),
            vec!["Moving Up: 0".to_string(), "Moving Down: 0".to_string()]
        );
    }

    #[test]
    fn test_frame_index_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(&dir);
        let first = p.process_frame(&DetectionFrame::default());
        let second = p.process_frame(&DetectionFrame::default());
        assert_eq!((first.frame, second.frame), (0, 1));
        assert_eq!(p.frames_processed(), 2);
    }

    #[test]
    fn test_eviction_after_idle_frames() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolygonStore::new(dir.path().join("zones.json"), 4);
        let mut p = CountingPipeline::from_parts(
            store,
            CrossingRule::defaults(),
            DetectionFilter::default(),
            Some(2),
        );
        p.process_frame(&DetectionFrame::new(1, vec![car_at(1, 0, 0)]));
        p.process_frame(&DetectionFrame::new(3, vec![]));
        assert!(p.tracker().track(1).is_some());
        p.process_frame(&DetectionFrame::new(4, vec![]));
        assert!(p.tracker().track(1).is_none());
    }

    #[test]
    fn test_reappearing_identity_reports_event_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolygonStore::new(dir.path().join("zones.json"), 4);
        let mut p = CountingPipeline::from_parts(
            store,
            CrossingRule::defaults(),
            DetectionFilter::default(),
            Some(1),
        );
        draw(&mut p, "area1", 0, 100, 100, 150);
        draw(&mut p, "area2", 0, 0, 100, 50);

        let frames = [
            DetectionFrame::new(1, vec![car_at(7, 50, 125)]),
            DetectionFrame::new(2, vec![car_at(7, 50, 25)]),
            DetectionFrame::new(5, vec![]),
            DetectionFrame::new(6, vec![car_at(7, 50, 125)]),
            DetectionFrame::new(7, vec![car_at(7, 50, 25)]),
        ];
        let mut events = Vec::new();
        for f in &frames {
            let report = p.process_frame(f);
            if f.frame == Some(5) {
                assert!(p.tracker().track(7).is_none());
            }
            events.extend(report.events);
        }

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].observed_at, 2);
        assert_eq!(p.count(Direction::Up), 1);
        assert_eq!(p.count(Direction::Down), 0);
    }

    #[test]
    fn test_clear_all_removes_zones_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(&dir);
        draw(&mut p, "area1", 0, 100, 100, 150);
        let _ = p.apply_command(AuthoringCommand::Save);
        assert!(dir.path().join("zones.json").exists());

        assert!(p.apply_command(AuthoringCommand::ClearAll).is_continue());
        assert!(p.store().is_empty());
        assert!(!dir.path().join("zones.json").exists());
        assert!(p.tracker().has_missing_zones());
    }
}
