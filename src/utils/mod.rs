//! 通用工具函数模块
//!
//! 提供输入解码和凭据封装。

pub mod credentials;
pub mod encoding;

pub use credentials::ApiKey;
pub use encoding::{decode_input, DecodedInput};
