// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 流水线运行 (Runner)
//!
//! 来源线程: DetectionSource → DetectionFrame 通道
//! 计数线程: 两帧之间执行绘制命令,然后处理下一帧

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{select, Receiver, Sender};
use serde::Serialize;
use tracing::{error, info};

use super::{CountingPipeline, FrameReport};
use crate::counting::Direction;
use crate::detection::{DetectionFrame, DetectionSource};
use crate::zones::AuthoringCommand;

/// 运行统计
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub events: u64,
    pub fps: f64,
    pub counts: BTreeMap<Direction, usize>,
}

/// 启动来源线程
///
/// 输入结束、出错、停止标志置位或接收方关闭时线程退出,返回发送的帧数。
pub fn spawn_source(
    mut source: Box<dyn DetectionSource>,
    tx: Sender<DetectionFrame>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<anyhow::Result<u64>> {
    std::thread::spawn(move || {
        info!("📹 检测来源线程启动");
        let mut sent = 0u64;
        while !stop.load(Ordering::Relaxed) {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    error!("❌ 读取检测结果失败: {:#}", e);
                    return Err(e);
                }
            };
            if tx.send(frame).is_err() {
                break;
            }
            sent += 1;
        }
        info!("📹 检测来源线程结束 ({} 帧)", sent);
        Ok(sent)
    })
}

enum Next {
    Frame(DetectionFrame),
    Command(AuthoringCommand),
    CommandsClosed,
    FramesClosed,
}

impl CountingPipeline {
    /// 计数线程主循环
    ///
    /// 每帧结果交给 `on_frame`; 回调出错时停止。
    pub fn run<F>(
        &mut self,
        frames: Receiver<DetectionFrame>,
        commands: Option<Receiver<AuthoringCommand>>,
        stop: Arc<AtomicBool>,
        mut on_frame: F,
    ) -> anyhow::Result<RunSummary>
    where
        F: FnMut(&FrameReport) -> anyhow::Result<()>,
    {
        info!("🔢 计数线程启动");
        let start = Instant::now();
        let mut commands = commands;
        let mut frames_done = 0u64;
        let mut events = 0u64;

        while !stop.load(Ordering::Relaxed) {
            let next = match &commands {
                Some(cmds) => select! {
                    recv(frames) -> msg => msg.map_or(Next::FramesClosed, Next::Frame),
                    recv(cmds) -> msg => msg.map_or(Next::CommandsClosed, Next::Command),
                },
                None => frames.recv().map_or(Next::FramesClosed, Next::Frame),
            };

            match next {
                Next::Frame(frame) => {
                    // 先执行已排队的命令,保证本帧看到一致的区域集合
                    if let Some(cmds) = &commands {
                        let pending: Vec<_> = cmds.try_iter().collect();
                        if self.apply_all(pending).is_break() {
                            stop.store(true, Ordering::Relaxed);
                            break;
                        }
                    }
                    let report = self.process_frame(&frame);
                    frames_done += 1;
                    events += report.events.len() as u64;
                    on_frame(&report)?;
                }
                Next::Command(cmd) => {
                    if self.apply_command(cmd).is_break() {
                        stop.store(true, Ordering::Relaxed);
                        break;
                    }
                }
                Next::CommandsClosed => commands = None,
                Next::FramesClosed => {
                    // 输入结束时仍在队列中的命令 (例如 save) 也要执行
                    if let Some(cmds) = &commands {
                        let pending: Vec<_> = cmds.try_iter().collect();
                        if self.apply_all(pending).is_break() {
                            stop.store(true, Ordering::Relaxed);
                        }
                    }
                    break;
                }
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        let summary = RunSummary {
            frames: frames_done,
            events,
            fps: if elapsed > 0.0 {
                frames_done as f64 / elapsed
            } else {
                0.0
            },
            counts: self.count_snapshot(),
        };
        info!(
            "🏁 计数结束: {} 帧, {} 个越线事件, {:.1} FPS",
            summary.frames, summary.events, summary.fps
        );
        for line in self.overlay().count_lines() {
            info!("   {}", line);
        }
        Ok(summary)
    }

    fn apply_all(&mut self, cmds: Vec<AuthoringCommand>) -> ControlFlow<()> {
        for cmd in cmds {
            if self.apply_command(cmd).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::CrossingRule;
    use crate::detection::{BBox, Detection, DetectionFilter};
    use crate::geometry::Point;
    use crate::zones::{command_channel, PolygonStore, Zone};

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    fn frames() -> Vec<DetectionFrame> {
        let at = |cy: i32| Detection::new(7, "car", BBox::new(40, cy - 5, 60, cy + 5), 0.9);
        vec![
            DetectionFrame::new(1, vec![at(125)]),
            DetectionFrame::new(2, vec![at(75)]),
            DetectionFrame::new(3, vec![at(25)]),
        ]
    }

    fn pipeline(dir: &tempfile::TempDir) -> CountingPipeline {
        let mut store = PolygonStore::new(dir.path().join("zones.json"), 4);
        store.insert(Zone::new("area1", rect(0, 100, 100, 150)).unwrap()).unwrap();
        store.insert(Zone::new("area2", rect(0, 0, 100, 50)).unwrap()).unwrap();
        CountingPipeline::from_parts(
            store,
            vec![CrossingRule::new("area1", "area2", Direction::Up)],
            DetectionFilter::default(),
            None,
        )
    }

    #[test]
    fn test_threaded_run_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(&dir);
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::bounded(2);
        let handle = spawn_source(Box::new(frames().into_iter()), tx, stop.clone());

        let mut seen = Vec::new();
        let summary = p
            .run(rx, None, stop, |r| {
                seen.push(r.frame);
                Ok(())
            })
            .unwrap();

        assert_eq!(handle.join().unwrap().unwrap(), 3);
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.events, 1);
        assert_eq!(summary.counts.get(&Direction::Up), Some(&1));
    }

    #[test]
    fn test_quit_command_stops_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(&dir);
        let stop = Arc::new(AtomicBool::new(false));
        let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
        let (cmd_tx, cmd_rx) = command_channel();

        frame_tx.send(frames().remove(0)).unwrap();
        cmd_tx.send(AuthoringCommand::Quit).unwrap();

        let summary = p.run(frame_rx, Some(cmd_rx), stop.clone(), |_| Ok(())).unwrap();
        assert!(stop.load(Ordering::Relaxed));
        assert_eq!(summary.frames, 0);
        assert_eq!(p.frames_processed(), 0);
    }

    #[test]
    fn test_commands_applied_before_frame() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolygonStore::new(dir.path().join("zones.json"), 4);
        let mut p = CountingPipeline::from_parts(
            store,
            vec![CrossingRule::new("area1", "area2", Direction::Up)],
            DetectionFilter::default(),
            None,
        );
        let stop = Arc::new(AtomicBool::new(false));
        let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
        let (cmd_tx, cmd_rx) = command_channel();

        for (name, pts) in [("area1", rect(0, 100, 100, 150)), ("area2", rect(0, 0, 100, 50))] {
            for pt in pts {
                cmd_tx.send(AuthoringCommand::AddPoint(pt)).unwrap();
            }
            cmd_tx.send(AuthoringCommand::Finalize(name.to_string())).unwrap();
        }
        for f in frames() {
            frame_tx.send(f).unwrap();
        }
        drop(cmd_tx);
        drop(frame_tx);

        let summary = p.run(frame_rx, Some(cmd_rx), stop, |_| Ok(())).unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(p.count(Direction::Up), 1);
    }

    #[test]
    fn test_queued_commands_applied_after_input_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.json");
        let mut p = CountingPipeline::from_parts(
            PolygonStore::new(&path, 4),
            vec![CrossingRule::new("area1", "area2", Direction::Up)],
            DetectionFilter::default(),
            None,
        );
        let stop = Arc::new(AtomicBool::new(false));
        let (frame_tx, frame_rx) = crossbeam_channel::unbounded::<DetectionFrame>();
        let (cmd_tx, cmd_rx) = command_channel();

        for pt in rect(0, 100, 100, 150) {
            cmd_tx.send(AuthoringCommand::AddPoint(pt)).unwrap();
        }
        cmd_tx.send(AuthoringCommand::Finalize("area1".to_string())).unwrap();
        cmd_tx.send(AuthoringCommand::Save).unwrap();
        drop(frame_tx);

        // 命令发送端仍然打开 (标准输入未结束)
        let summary = p.run(frame_rx, Some(cmd_rx), stop.clone(), |_| Ok(())).unwrap();
        assert_eq!(summary.frames, 0);
        assert!(!stop.load(Ordering::Relaxed));
        assert!(path.exists());

        let mut reloaded = PolygonStore::new(&path, 4);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.names().collect::<Vec<_>>(), vec!["area1"]);
        drop(cmd_tx);
    }

    #[test]
    fn test_quit_queued_after_input_ends_sets_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(&dir);
        let stop = Arc::new(AtomicBool::new(false));
        let (frame_tx, frame_rx) = crossbeam_channel::unbounded::<DetectionFrame>();
        let (cmd_tx, cmd_rx) = command_channel();

        cmd_tx.send(AuthoringCommand::Discard).unwrap();
        cmd_tx.send(AuthoringCommand::Quit).unwrap();
        drop(frame_tx);

        p.run(frame_rx, Some(cmd_rx), stop.clone(), |_| Ok(())).unwrap();
        assert!(stop.load(Ordering::Relaxed));
        drop(cmd_tx);
    }
}
