//! 识别流程的错误类型

use thiserror::Error;

use crate::models::variant::Variant;

#[derive(Debug, Error)]
pub enum DetectionError {
    /// 图片解码失败，来自上游解码能力
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid base64 image: {0}")]
    Base64(#[from] data_encoding::DecodeError),

    /// 空图或无法处理的输入，整个流程直接终止
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("card segmentation failed: {0}")]
    SegmentationFailure(String),

    /// 单个变体的哈希失败，只会丢弃该变体
    #[error("fingerprint of variant {variant} failed: {reason}")]
    FingerprintFailure { variant: Variant, reason: String },

    #[error("no catalog match for any surviving variant")]
    NoMatch,
}

pub type DetectionResult<T> = std::result::Result<T, DetectionError>;
