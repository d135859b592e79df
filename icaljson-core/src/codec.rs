//! iCalendar 文本与 [`IcalNode`](crate::model::IcalNode) 树之间的双向转换
//!
//! 解码从不失败：无法识别的行直接跳过，不配对的 `BEGIN`/`END`
//! 尽量保留结构。编码对任何合法的树都是全函数。

mod decoder;
mod encoder;

pub use decoder::decode;
pub use encoder::{
    EncodeOptions, LineEnding, MAX_LINE_CHARS, RepeatedKeys, encode, encode_with, fold_line,
};
