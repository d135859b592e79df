use serde::{Deserialize, Serialize};

use crate::model::{IcalNode, IcalValue};

/// 单个物理行的最大长度（按字符计，非字节）
pub const MAX_LINE_CHARS: usize = 75;

/// 多值属性的编码方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatedKeys {
    /// 只有 `RDATE` 逐行输出，其他多值键按块处理（旧行为）
    #[default]
    RdateOnly,
    /// 所有多值键都逐行输出
    All,
}

/// 行分隔符
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// 分隔符文本
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// 编码选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// 多值属性的编码方式
    pub repeated_keys: RepeatedKeys,
    /// 行分隔符
    pub line_ending: LineEnding,
}

/// 使用默认选项编码
pub fn encode(node: &IcalNode) -> String {
    encode_with(node, &EncodeOptions::default())
}

/// 将节点树编码为iCalendar文本
///
/// 按键的插入顺序输出，末尾不带换行符。
pub fn encode_with(node: &IcalNode, options: &EncodeOptions) -> String {
    let mut lines = Vec::new();
    encode_lines(node, options, &mut lines);
    lines.join(options.line_ending.as_str())
}

fn encode_lines(node: &IcalNode, options: &EncodeOptions, lines: &mut Vec<String>) {
    for (key, value) in node {
        match value {
            // 包括 RDATE 下的子块
            IcalValue::Blocks(children) => {
                for child in children {
                    lines.push(format!("BEGIN:{key}"));
                    encode_lines(child, options, lines);
                    lines.push(format!("END:{key}"));
                }
            }
            // RDATE 不折行
            IcalValue::Texts(values) if key == "RDATE" => {
                lines.extend(values.iter().map(|item| format!("{key}:{item}")));
            }
            IcalValue::Texts(values) if options.repeated_keys == RepeatedKeys::All => {
                for item in values {
                    lines.extend(fold_line(&format!("{key}:{item}")));
                }
            }
            IcalValue::Texts(values) => {
                tracing::warn!("多值属性 {} 将按块输出，解码后无法还原", key);
                for item in values {
                    lines.push(format!("BEGIN:{key}"));
                    for (index, ch) in item.chars().enumerate() {
                        lines.extend(fold_line(&format!("{index}:{ch}")));
                    }
                    lines.push(format!("END:{key}"));
                }
            }
            IcalValue::Text(text) => lines.extend(fold_line(&format!("{key}:{text}"))),
        }
    }
}

/// 按 [`MAX_LINE_CHARS`] 折行
///
/// 续行以一个空格开头，空格计入长度。空行也会输出一行。
pub fn fold_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let (head, mut rest) = chars.split_at(chars.len().min(MAX_LINE_CHARS));

    let mut folded = Vec::with_capacity(1 + rest.len().div_ceil(MAX_LINE_CHARS - 1));
    folded.push(head.iter().collect::<String>());

    while !rest.is_empty() {
        let (chunk, tail) = rest.split_at(rest.len().min(MAX_LINE_CHARS - 1));
        folded.push(std::iter::once(' ').chain(chunk.iter().copied()).collect());
        rest = tail;
    }

    folded
}
