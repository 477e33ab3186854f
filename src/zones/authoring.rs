// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 区域绘制命令 (Authoring commands)
//!
//! 输入线程把命令放进队列,计数线程在两帧之间取出执行,
//! 命名等操作不会阻塞逐帧计数。

use std::io::BufRead;
use std::str::FromStr;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{info, warn};

use crate::geometry::Point;

/// 绘制命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthoringCommand {
    /// 点击添加顶点
    AddPoint(Point),
    /// 为已满的顶点缓冲区命名
    Finalize(String),
    /// 丢弃未完成的顶点
    Discard,
    /// 保存所有区域
    Save,
    /// 清空所有区域并删除文件
    ClearAll,
    /// 退出
    Quit,
}

impl FromStr for AuthoringCommand {
    type Err = String;

    /// 文本格式: `point <x> <y>` / `name <zone>` / `discard` / `save` / `clear` / `quit`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().ok_or_else(|| "empty command".to_string())?;

        match cmd.to_lowercase().as_str() {
            "point" | "p" => {
                let x = parse_coord(parts.next(), "x")?;
                let y = parse_coord(parts.next(), "y")?;
                Ok(Self::AddPoint(Point::new(x, y)))
            }
            "name" | "n" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err("name requires a zone name".to_string());
                }
                Ok(Self::Finalize(name))
            }
            "discard" => Ok(Self::Discard),
            "save" | "s" => Ok(Self::Save),
            "clear" | "d" => Ok(Self::ClearAll),
            "quit" | "e" => Ok(Self::Quit),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

fn parse_coord(token: Option<&str>, axis: &str) -> Result<i32, String> {
    let token = token.ok_or_else(|| format!("point requires {}", axis))?;
    token
        .parse::<i32>()
        .map_err(|e| format!("invalid {} coordinate {:?}: {}", axis, token, e))
}

/// 创建命令队列
pub fn command_channel() -> (Sender<AuthoringCommand>, Receiver<AuthoringCommand>) {
    crossbeam_channel::unbounded()
}

/// 启动命令读取线程 (每行一个命令)
///
/// 读到 `quit` 或输入结束时线程退出; 无法解析的行只记录警告。
pub fn spawn_command_reader<R>(reader: R, tx: Sender<AuthoringCommand>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        info!("⌨️ 命令输入线程启动");
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("⚠️ 读取命令失败: {}", e);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<AuthoringCommand>() {
                Ok(cmd) => {
                    let quit = cmd == AuthoringCommand::Quit;
                    if tx.send(cmd).is_err() {
                        break;
                    }
                    if quit {
                        break;
                    }
                }
                Err(e) => warn!("⚠️ 无效命令 {:?}: {}", line, e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "point 10 -20".parse::<AuthoringCommand>().unwrap(),
            AuthoringCommand::AddPoint(Point::new(10, -20))
        );
        assert_eq!(
            "name north gate".parse::<AuthoringCommand>().unwrap(),
            AuthoringCommand::Finalize("north gate".to_string())
        );
        assert_eq!("s".parse::<AuthoringCommand>().unwrap(), AuthoringCommand::Save);
        assert_eq!(
            "CLEAR".parse::<AuthoringCommand>().unwrap(),
            AuthoringCommand::ClearAll
        );
        assert_eq!("quit".parse::<AuthoringCommand>().unwrap(), AuthoringCommand::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!("point 1".parse::<AuthoringCommand>().is_err());
        assert!("point a 2".parse::<AuthoringCommand>().is_err());
        assert!("name".parse::<AuthoringCommand>().is_err());
        assert!("jump".parse::<AuthoringCommand>().is_err());
        assert!("".parse::<AuthoringCommand>().is_err());
    }

    #[test]
    fn test_reader_skips_bad_lines_and_stops_on_quit() {
        let input = "point 1 2\n# comment\nbogus\n\nname a\nquit\nsave\n";
        let (tx, rx) = command_channel();
        spawn_command_reader(Cursor::new(input.to_string()), tx)
            .join()
            .unwrap();

        let cmds: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            cmds,
            vec![
                AuthoringCommand::AddPoint(Point::new(1, 2)),
                AuthoringCommand::Finalize("a".to_string()),
                AuthoringCommand::Quit,
            ]
        );
    }
}
