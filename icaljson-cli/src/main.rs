//! iCalendar与JSON互转工具
mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "icaljson")]
#[command(about = "iCalendar与JSON互转工具")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 启用详细日志
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 将ICS文件解码为JSON
    Decode {
        /// 输入的ICS文件
        input: PathBuf,

        /// 输出文件路径，缺省输出到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 格式化JSON输出
        #[arg(long)]
        pretty: bool,

        /// 覆盖已存在的输出文件
        #[arg(short, long)]
        force: bool,
    },

    /// 将JSON编码回ICS文件
    Encode {
        /// 输入的JSON文件
        input: PathBuf,

        /// 输出文件路径，缺省输出到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 使用CRLF作为行分隔符
        #[arg(long)]
        crlf: bool,

        /// 所有多值属性都逐行输出（默认只有RDATE）
        #[arg(long)]
        all_repeated: bool,

        /// 覆盖已存在的输出文件
        #[arg(short, long)]
        force: bool,
    },

    /// 列出日历中的事件视图
    Events {
        /// 输入的ICS文件
        input: PathBuf,

        /// 输出文件路径，缺省输出到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 覆盖已存在的输出文件
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 设置日志级别
    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("icaljson_cli={log_level},icaljson_core={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Decode {
            input,
            output,
            pretty,
            force,
        } => {
            commands::decode_command(commands::Target { input, output, force }, pretty).await
        }

        Commands::Encode {
            input,
            output,
            crlf,
            all_repeated,
            force,
        } => {
            commands::encode_command(
                commands::Target { input, output, force },
                commands::encode_options(crlf, all_repeated),
            )
            .await
        }

        Commands::Events {
            input,
            output,
            force,
        } => commands::events_command(commands::Target { input, output, force }).await,
    }
}
