// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测结果来源 (Detection sources)
//!
//! 检测与追踪模型不在本库内,所有来源统一实现 `DetectionSource`。
//! 内置实现: JSON Lines 回放 (每行一帧)。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use super::types::{Detection, DetectionFrame};

// ========== 统一接口 ==========

/// 逐帧提供检测结果
///
/// 返回 `Ok(None)` 表示输入结束。
pub trait DetectionSource: Send {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>>;
}

/// 内存中的帧序列 (测试与嵌入调用)
impl DetectionSource for std::vec::IntoIter<DetectionFrame> {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>> {
        Ok(self.next())
    }
}

// ========== JSON Lines 回放 ==========

/// 逐行读取 `{"frame": n, "detections": [...]}`
pub struct JsonLinesSource<R> {
    reader: R,
    line_no: u64,
    last_frame: Option<u64>,
    buf: String,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open detections file {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            last_frame: None,
            buf: String::new(),
        }
    }
}

impl<R: BufRead + Send> DetectionSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_line(&mut self.buf)
                .context("Failed to read detections")?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            let mut frame: DetectionFrame = serde_json::from_str(line)
                .with_context(|| format!("Invalid detection frame on line {}", self.line_no))?;

            // 未给出帧号时按行号补齐; 帧号必须递增
            let index = frame.frame.unwrap_or(self.line_no);
            if let Some(last) = self.last_frame {
                if index <= last {
                    warn!(
                        "⚠️ 第 {} 行帧号 {} 未递增 (上一帧 {}),已跳过",
                        self.line_no, index, last
                    );
                    continue;
                }
            }
            self.last_frame = Some(index);
            frame.frame = Some(index);
            return Ok(Some(frame));
        }
    }
}

// ========== 检测过滤 ==========

/// 按类别与置信度过滤检测结果
#[derive(Clone, Debug, Default)]
pub struct DetectionFilter {
    /// 允许的类别 (为空表示全部允许)
    pub classes: Vec<String>,
    pub min_confidence: f32,
}

impl DetectionFilter {
    pub fn new(classes: Vec<String>, min_confidence: f32) -> Self {
        Self {
            classes,
            min_confidence,
        }
    }

    pub fn accepts(&self, det: &Detection) -> bool {
        if det.confidence < self.min_confidence {
            return false;
        }
        self.classes.is_empty()
            || self
                .classes
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&det.class_label))
    }
}
