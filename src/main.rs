//! 7 Days to Die 地图转 PNG 工具

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use sdmap::convert::region_dir;
use sdmap::{convert_with_config, inspect, Config, MapFormat, MapInfo, Progress};

/// 7 Days to Die 地图转 PNG 工具
#[derive(Parser)]
#[command(name = "sdmap", version, about)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 把地图文件转换为 PNG
    Convert {
        /// 地图文件（.map，或区域目录中任意一个 .7rm 文件）
        input: PathBuf,
        /// 输出 PNG 路径
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 覆盖已存在的输出文件
        #[arg(long, visible_alias = "override")]
        overwrite: bool,
    },
    /// 查看地图文件头 / 区域目录概况
    Info {
        /// 地图文件
        input: PathBuf,
    },
    /// 生成默认配置文件
    Config {
        /// 输出路径（默认: sdmap.toml）
        #[arg(short, long, default_value = "sdmap.toml")]
        output: PathBuf,
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

/// 在终端上显示进度
#[derive(Default)]
struct ConsoleProgress {
    max: usize,
    percent: Option<usize>,
}

impl ConsoleProgress {
    fn finish_line(&mut self) {
        if self.percent.take().is_some() {
            eprintln!();
        }
    }
}

impl Progress for ConsoleProgress {
    fn on_stage_start(&mut self, max: usize) {
        self.finish_line();
        self.max = max;
    }

    fn on_progress(&mut self, value: usize) {
        if self.max == 0 {
            return;
        }
        let percent = value.min(self.max) * 100 / self.max;
        if self.percent != Some(percent) {
            self.percent = Some(percent);
            eprint!("\r  {:3}%", percent);
            let _ = std::io::stderr().flush();
        }
    }

    fn on_status(&mut self, text: &str) {
        self.finish_line();
        log::info!("{}", text);
    }
}

fn load_config(config_path: Option<PathBuf>) -> Config {
    if let Some(path) = config_path {
        match Config::load_from_file(&path) {
            Ok(config) => {
                log::info!("已加载配置: {}", path.display());
                return config;
            }
            Err(e) => {
                log::warn!("无法加载配置 {}: {}", path.display(), e);
            }
        }
    }
    Config::load()
}

/// 默认输出路径：旧格式为同名 .png；区域格式为区域目录旁的 `<目录名>.png`
fn default_output(input: &Path) -> PathBuf {
    match MapFormat::from_path(input) {
        MapFormat::Legacy => input.with_extension("png"),
        MapFormat::Region => {
            let dir = region_dir(input);
            let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "map".to_string());
            dir.with_file_name(format!("{}.png", name))
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config);

    match cli.command {
        Commands::Convert {
            input,
            output,
            overwrite,
        } => {
            let output_path = output.unwrap_or_else(|| default_output(&input));
            if output_path.exists() && !overwrite {
                anyhow::bail!("输出文件已存在: {:?}\n使用 --overwrite 覆盖", output_path);
            }

            log::info!("地图文件: {:?}", input);
            log::info!("输出文件: {:?}", output_path);
            log::info!("地图尺寸: {}", config.map.size);

            let start = Instant::now();
            let mut progress = ConsoleProgress::default();
            convert_with_config(&input, &output_path, &config, &mut progress)
                .with_context(|| format!("转换失败: {}", input.display()))?;
            log::info!("耗时: {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Info { input } => {
            match inspect(&input).with_context(|| format!("无法读取: {}", input.display()))? {
                MapInfo::Legacy(header) => {
                    println!("格式: 旧版单文件地图");
                    println!("版本: {}", header.version);
                    println!("最大区块数: {}", header.max_chunks);
                    println!("区块数: {}", header.num_chunks);
                }
                MapInfo::Region(Some(summary)) => {
                    println!("格式: 区域分片地图");
                    println!("区域文件数: {}", summary.count);
                    println!(
                        "区域范围: ({}, {}) ~ ({}, {})",
                        summary.min.0, summary.min.1, summary.max.0, summary.max.1
                    );
                }
                MapInfo::Region(None) => {
                    println!("格式: 区域分片地图");
                    println!("区域文件数: 0");
                }
            }
        }

        Commands::Config { output, force } => {
            if output.exists() && !force {
                anyhow::bail!("文件已存在: {:?}\n使用 --force 覆盖", output);
            }

            let default_config = Config::default();
            default_config.save_to_file(&output)?;
            println!("已生成配置文件: {:?}", output);
            println!("\n配置项说明:");
            println!("  [map]");
            println!("    size = {}          # 地图边长（像素）", default_config.map.size);
            println!("  [image]");
            println!("    compression = \"best\"  # fast / default / best");
            println!(
                "    transparent_background = {}  # 未绘制区域输出为透明",
                default_config.image.transparent_background
            );
        }
    }

    Ok(())
}
