use std::sync::LazyLock;

use regex::Regex;

use crate::model::{IcalNode, IcalValue};

/// 兼容 `\r\n`、`\n` 和单独的 `\r` 三种换行
static NEW_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n|\n|\r").unwrap());

const COLON: char = ':';
const SPACE: char = ' ';

/// 尚未遇到 `END` 的块：块名和正在填充的节点
type OpenBlock = (String, IcalNode);

/// 将iCalendar文本解码为节点树
///
/// 每一行按顺序处理：
/// - 以空格开头的是折行，去掉空格后拼接到上一个键的值上
/// - 其余行在第一个冒号处分成键和值，没有冒号的行被忽略
/// - `BEGIN:X` 打开一个新块，`END:X` 关闭最近打开的块（不校验块名）
/// - 同一层级重复出现的键提升为多值
///
/// 多余的 `END` 不会越过根节点；输入结束时仍未关闭的块按嵌套顺序挂回父节点。
pub fn decode(text: &str) -> IcalNode {
    let mut root = IcalNode::new();
    let mut open: Vec<OpenBlock> = Vec::new();
    let mut current_key = String::new();

    for line in NEW_LINE.split(text) {
        if let Some(rest) = line.strip_prefix(SPACE) {
            append_continuation(current(&mut root, &mut open), &current_key, rest);
            continue;
        }

        let Some((key, value)) = line.split_once(COLON) else {
            if !line.is_empty() {
                tracing::trace!("跳过无法识别的行: {}", line);
            }
            continue;
        };

        current_key = key.to_string();

        match key {
            "BEGIN" => {
                let parent = current(&mut root, &mut open);
                if parent.blocks_entry(value).is_none() {
                    tracing::debug!("块名 {} 已被文本属性占用，该块将被丢弃", value);
                }
                open.push((value.to_string(), IcalNode::new()));
            }
            "END" => match open.pop() {
                Some((name, node)) => attach(current(&mut root, &mut open), &name, node),
                None => tracing::debug!("多余的 END:{}，保持在根节点", value),
            },
            _ => push_property(current(&mut root, &mut open), key, value),
        }
    }

    while let Some((name, node)) = open.pop() {
        tracing::debug!("块 {} 没有对应的 END", name);
        attach(current(&mut root, &mut open), &name, node);
    }

    root
}

fn current<'a>(root: &'a mut IcalNode, open: &'a mut [OpenBlock]) -> &'a mut IcalNode {
    match open.last_mut() {
        Some((_, node)) => node,
        None => root,
    }
}

fn attach(parent: &mut IcalNode, name: &str, node: IcalNode) {
    match parent.blocks_entry(name) {
        Some(blocks) => blocks.push(node),
        None => tracing::debug!("丢弃块 {}: 同名键不是块序列", name),
    }
}

fn push_property(node: &mut IcalNode, key: &str, value: &str) {
    let Some(slot) = node.get_mut(key) else {
        node.insert(key, value);
        return;
    };

    match slot {
        IcalValue::Text(first) => {
            let first = std::mem::take(first);
            *slot = IcalValue::Texts(vec![first, value.to_string()]);
        }
        IcalValue::Texts(values) => values.push(value.to_string()),
        IcalValue::Blocks(_) => {
            tracing::debug!("丢弃属性 {}: 同名键已是块序列", key);
        }
    }
}

/// 折行拼接
///
/// 多值会先以逗号连接成单个文本再拼接。
fn append_continuation(node: &mut IcalNode, key: &str, rest: &str) {
    let Some(slot) = node.get_mut(key) else {
        node.insert(key, rest);
        return;
    };

    match slot {
        IcalValue::Text(text) => text.push_str(rest),
        IcalValue::Texts(values) => {
            let joined = values.join(",") + rest;
            *slot = IcalValue::Text(joined);
        }
        IcalValue::Blocks(_) => {
            tracing::debug!("忽略折行: 键 {} 是块序列", key);
        }
    }
}
