//! 识别流程：二值化、分割、指纹、匹配

pub mod binarize;
pub mod engine;
pub mod fingerprint;
pub mod matcher;
pub mod segment;
