// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 区域越线计数 (Zone Crossing Counter)
///
/// 系统架构:
/// 1. 来源线程: 回放外部检测/追踪结果 (独立工作线程)
/// 2. 命令线程: 读取绘制命令 (标准输入,不阻塞计数)
/// 3. 主线程:   区域判定与越线计数
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use zone_counter::counting::CrossingRule;
use zone_counter::detection::JsonLinesSource;
use zone_counter::pipeline::{spawn_source, RunSummary};
use zone_counter::zones::{command_channel, spawn_command_reader};
use zone_counter::{gen_time_string, CounterConfig, CountingPipeline, Overlay, Point, PolygonStore, Zone};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// 区域越线计数参数
#[derive(Parser, Debug)]
#[command(author, version, about = "区域越线计数 - Zone crossing counter", long_about = None)]
struct Cli {
    /// 配置文件
    #[arg(short, long, global = true, default_value = "counter.json")]
    config: PathBuf,

    /// 区域文件 (覆盖配置)
    #[arg(short, long, global = true)]
    zones: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 回放检测结果并计数
    Run(RunArgs),

    /// 区域管理
    #[command(subcommand)]
    Zones(ZonesCommand),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// 检测结果文件 (JSON Lines, 每行一帧)
    #[arg(short, long)]
    detections: PathBuf,

    /// 计数规则 entry:exit:direction (可重复, 覆盖配置)
    #[arg(short, long = "rule")]
    rules: Vec<CrossingRule>,

    /// 只统计这些类别 (可重复, 覆盖配置)
    #[arg(long = "class")]
    classes: Vec<String>,

    /// 最低置信度
    #[arg(long)]
    min_conf: Option<f32>,

    /// 超过N帧未出现的追踪ID被清除
    #[arg(long)]
    evict_after: Option<u64>,

    /// 越线事件输出 (JSON Lines)
    #[arg(long)]
    events: Option<PathBuf>,

    /// 不从标准输入读取绘制命令
    #[arg(long, default_value_t = false)]
    no_commands: bool,

    /// 结束时同时输出叠加层数据
    #[arg(long, default_value_t = false)]
    overlay: bool,
}

#[derive(Subcommand, Debug)]
enum ZonesCommand {
    /// 列出已保存的区域
    List,

    /// 添加区域: --name area1 --points "0,0 100,0 100,50 0,50"
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        points: String,
    },

    /// 删除所有区域
    Clear,
}

/// 运行报告 (标准输出)
#[derive(Serialize)]
struct Report {
    generated_at: String,
    #[serde(flatten)]
    summary: RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlay: Option<Overlay>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = CounterConfig::load(&cli.config);
    if let Some(zones) = &cli.zones {
        config.zones_file = zones.display().to_string();
    }

    match cli.command {
        Command::Run(args) => run(config, args),
        Command::Zones(cmd) => zones(&config, cmd),
    }
}

fn run(mut config: CounterConfig, args: RunArgs) -> Result<()> {
    if !args.rules.is_empty() {
        config.rules = args.rules;
    }
    if !args.classes.is_empty() {
        config.classes = args.classes;
    }
    if let Some(conf) = args.min_conf {
        config.min_confidence = conf;
    }
    if args.evict_after.is_some() {
        config.evict_after_frames = args.evict_after;
    }
    config.print_summary();

    tracing::info!("🚀 区域计数系统启动");
    tracing::info!("📦 检测结果: {}", args.detections.display());

    let mut pipeline = CountingPipeline::new(&config)
        .with_context(|| format!("Failed to load zones from {}", config.zones_file))?;

    // ========== 启动来源线程 ==========
    let stop = Arc::new(AtomicBool::new(false));
    let source = JsonLinesSource::open(&args.detections)?;
    let (frame_tx, frame_rx) = crossbeam_channel::bounded(config.frame_queue.max(1));
    let source_handle = spawn_source(Box::new(source), frame_tx, stop.clone());

    // ========== 启动命令线程 ==========
    let commands = if args.no_commands {
        None
    } else {
        let (cmd_tx, cmd_rx) = command_channel();
        let stdin = std::io::BufReader::new(std::io::stdin());
        spawn_command_reader(stdin, cmd_tx);
        Some(cmd_rx)
    };

    // ========== 主线程: 计数 ==========
    let mut events_out = match &args.events {
        Some(path) => Some(open_writer(path)?),
        None => None,
    };

    let summary = pipeline.run(frame_rx, commands, stop, |report| {
        if let Some(out) = events_out.as_mut() {
            for event in &report.events {
                serde_json::to_writer(&mut *out, event)?;
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    })?;

    if let Some(mut out) = events_out {
        out.flush()?;
    }

    match source_handle.join() {
        Ok(result) => {
            result?;
        }
        Err(_) => bail!("detection source thread panicked"),
    }

    let report = Report {
        generated_at: gen_time_string("-"),
        summary,
        overlay: args.overlay.then(|| pipeline.overlay()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn zones(config: &CounterConfig, cmd: ZonesCommand) -> Result<()> {
    let mut store = PolygonStore::open(&config.zones_file, config.vertex_cap)
        .with_context(|| format!("Failed to load zones from {}", config.zones_file))?;

    match cmd {
        ZonesCommand::List => {
            if store.is_empty() {
                println!("(no zones in {})", store.path().display());
            }
            for zone in store.zones() {
                let pts: Vec<String> = zone
                    .vertices()
                    .iter()
                    .map(|p| format!("{},{}", p.x, p.y))
                    .collect();
                println!("{}\t{}", zone.name, pts.join(" "));
            }
        }
        ZonesCommand::Add { name, points } => {
            let vertices = parse_points(&points)?;
            store.insert(Zone::new(name.as_str(), vertices)?)?;
            store.save()?;
        }
        ZonesCommand::Clear => {
            store.clear_all()?;
        }
    }
    Ok(())
}

/// 解析 `x,y x,y ...`
fn parse_points(s: &str) -> Result<Vec<Point>> {
    s.split_whitespace()
        .map(|pair| -> Result<Point> {
            let (x, y) = pair
                .split_once(',')
                .with_context(|| format!("expected x,y but got {:?}", pair))?;
            Ok(Point::new(
                x.trim().parse().with_context(|| format!("invalid x in {:?}", pair))?,
                y.trim().parse().with_context(|| format!("invalid y in {:?}", pair))?,
            ))
        })
        .collect()
}

fn open_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}
