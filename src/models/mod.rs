//! 定义输入输出和公用结构体

pub mod catalog;
pub mod fingerprint;
pub mod match_result;
pub mod variant;

/// 定义常用结构体
pub mod card{
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
    pub struct CardPoint{
        pub x: f32,
        pub y: f32,
    }

    impl CardPoint {
        pub fn new(x: f32, y: f32) -> Self {
            CardPoint { x, y }
        }
    }

    /// 卡片四个角点，顺序固定为 [lt, rt, rd, ld]
    #[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
    pub struct Quadrilateral{
        pub corners: [CardPoint;4],
    }

    impl Quadrilateral {
        pub fn lt(&self) -> CardPoint { self.corners[0] }
        pub fn rt(&self) -> CardPoint { self.corners[1] }
        pub fn rd(&self) -> CardPoint { self.corners[2] }
        pub fn ld(&self) -> CardPoint { self.corners[3] }

        /// 所有角点乘以同一比例，用于从工作分辨率映射回原图
        pub fn scaled(&self, scale: f32) -> Self {
            let mut corners = self.corners;
            for c in corners.iter_mut() {
                c.x *= scale;
                c.y *= scale;
            }
            Quadrilateral { corners }
        }

        pub fn as_tuples(&self) -> [(f32, f32);4] {
            self.corners.map(|c| (c.x, c.y))
        }
    }
}

/// 识别流程中间图
pub mod engine_rec{
    use image::{GrayImage, RgbImage};

    /// 归一化后的工作图
    #[derive(Clone)]
    pub struct NormalizedImage{
        /// 缩放到工作宽度并做过局部均衡的rgb图
        pub rgb: RgbImage,
        /// 工作图相对原图的缩放比例(工作图宽 / 原图宽)
        pub scale: f32,
    }

    /// 某种策略下的二值图，前景为255
    #[derive(Clone)]
    pub struct BinarizedImage{
        pub gray: GrayImage,
        /// 实际使用的全局阈值，自适应策略没有
        pub threshold: Option<u8>,
    }
}
