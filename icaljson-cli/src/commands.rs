use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use icaljson_core::prelude::*;
use tokio::{fs, io::AsyncWriteExt};

/// 命令的输入输出参数
pub struct Target {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub force: bool,
}

pub fn encode_options(crlf: bool, all_repeated: bool) -> EncodeOptions {
    EncodeOptions {
        repeated_keys: if all_repeated {
            RepeatedKeys::All
        } else {
            RepeatedKeys::RdateOnly
        },
        line_ending: if crlf { LineEnding::CrLf } else { LineEnding::Lf },
    }
}

/// ICS -> JSON
pub async fn decode_command(target: Target, pretty: bool) -> Result<()> {
    tracing::info!("解码日历: {}", target.input.display());

    let text = read_input(&target.input).await?;
    let root = decode(&text);
    tracing::debug!("根节点包含 {} 个键", root.len());

    let json = root.to_json(pretty)?;
    write_output(&target, &json).await
}

/// JSON -> ICS
pub async fn encode_command(target: Target, options: EncodeOptions) -> Result<()> {
    tracing::info!("编码日历: {}", target.input.display());

    let json = read_input(&target.input).await?;
    let root = IcalNode::from_json(&json)
        .with_context(|| format!("无法解析JSON: {}", target.input.display()))?;

    let text = encode_with(&root, &options);
    write_output(&target, &text).await
}

/// 输出事件视图
pub async fn events_command(target: Target) -> Result<()> {
    tracing::info!("处理日历: {}", target.input.display());

    let text = read_input(&target.input).await?;
    let view = CalendarView::from_node(&decode(&text))
        .with_context(|| format!("无法构建事件视图: {}", target.input.display()))?;

    tracing::info!(
        "日历 {} 共 {} 个事件，模板 {}.{}",
        view.name.as_deref().unwrap_or("(未命名)"),
        view.events.len(),
        view.template,
        view.lang
    );

    let json = serde_json::to_string_pretty(&view)?;
    write_output(&target, &json).await
}

async fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取文件: {}", path.display()))
}

async fn write_output(target: &Target, content: &str) -> Result<()> {
    let Some(ref output) = target.output else {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(content.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        return Ok(());
    };

    if !target.force && fs::try_exists(output).await? {
        bail!(
            "输出文件已存在: {}，使用 --force 覆盖",
            output.display()
        );
    }

    fs::write(output, content)
        .await
        .with_context(|| format!("无法写入文件: {}", output.display()))?;
    tracing::info!("✓ 已保存到: {}", output.display());

    Ok(())
}
