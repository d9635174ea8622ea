//! 上传内容解码
//!
//! 上传的日志不保证是合法 UTF-8。解码永不失败，按三层策略处理：
//! 1. UTF-8 快速路径（去掉 BOM）
//! 2. 少量无效字节时做 lossy 转换，无效字节替换为 U+FFFD
//! 3. 无效字节占比过高时回退到 GBK，再回退到 Windows-1252

use encoding_rs::{GBK, UTF_8, WINDOWS_1252};

/// 无效字节占比超过该值时尝试回退编码
const FALLBACK_INVALID_RATIO: f64 = 0.3;

/// 解码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInput {
    pub text: String,
    /// 实际使用的编码
    pub encoding: &'static str,
    /// 是否包含无效字节
    pub had_errors: bool,
    /// 是否使用了回退编码
    pub fallback_used: bool,
}

/// 解码上传的字节
pub fn decode_input(bytes: &[u8]) -> DecodedInput {
    let (cow, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return DecodedInput {
            text: cow.into_owned(),
            encoding: "UTF-8",
            had_errors: false,
            fallback_used: false,
        };
    }

    let replacements = cow.chars().filter(|&c| c == char::REPLACEMENT_CHARACTER).count();
    let invalid_ratio = replacements as f64 / bytes.len().max(1) as f64;

    if invalid_ratio <= FALLBACK_INVALID_RATIO {
        tracing::debug!(replacements, "Input is not clean UTF-8, decoded lossily");
        return DecodedInput {
            text: cow.into_owned(),
            encoding: "UTF-8-Lossy",
            had_errors: true,
            fallback_used: false,
        };
    }

    let (gbk, _, gbk_errors) = GBK.decode(bytes);
    if !gbk_errors {
        tracing::debug!(invalid_ratio, "Input decoded as GBK");
        return DecodedInput {
            text: gbk.into_owned(),
            encoding: "GBK",
            had_errors: true,
            fallback_used: true,
        };
    }

    // Windows-1252 能映射任意字节
    let (western, _, _) = WINDOWS_1252.decode(bytes);
    tracing::debug!(invalid_ratio, "Input decoded as Windows-1252");
    DecodedInput {
        text: western.into_owned(),
        encoding: "Windows-1252",
        had_errors: true,
        fallback_used: true,
    }
}
