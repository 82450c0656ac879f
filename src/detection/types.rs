/// 检测数据结构定义
/// Data structures shared by the detection boundary and the controller

// ========== 数据结构 ==========

/// 检测框 (像素坐标, x1<x2, y1<y2)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// 获取中心点
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// 坐标有限且面积为正
    pub fn is_valid(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x2 > self.x1
            && self.y2 > self.y1
    }
}

/// 单个检测结果, 每帧重新生成, 生成后不再修改
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: u32) -> Self {
        Self {
            bbox: BBox::new(x1, y1, x2, y2),
            confidence,
            class_id,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        self.bbox.center()
    }

    pub fn area(&self) -> f32 {
        self.bbox.area()
    }
}

/// 帧尺寸
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 画面中心 (整数像素, 与取整后的中心线对齐)
    pub fn center(&self) -> (f32, f32) {
        ((self.width / 2) as f32, (self.height / 2) as f32)
    }
}

/// 一帧的检测输出 (检测适配器 → 控制器)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameDetections {
    /// 帧序号 (从1开始)
    pub index: u64,
    /// 帧尺寸, None 时使用配置中的默认尺寸
    pub size: Option<FrameSize>,
    pub detections: Vec<Detection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_geometry() {
        let bbox = BBox::new(10.0, 20.0, 50.0, 100.0);
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.height(), 80.0);
        assert_eq!(bbox.area(), 3200.0);
        assert_eq!(bbox.center(), (30.0, 60.0));
        assert!(bbox.is_valid());
    }

    #[test]
    fn test_degenerate_bbox_invalid() {
        assert!(!BBox::new(10.0, 10.0, 10.0, 20.0).is_valid());
        assert!(!BBox::new(10.0, 30.0, 20.0, 20.0).is_valid());
        assert!(!BBox::new(f32::NAN, 0.0, 10.0, 10.0).is_valid());
    }

    #[test]
    fn test_frame_center() {
        assert_eq!(FrameSize::new(640, 480).center(), (320.0, 240.0));
        assert_eq!(FrameSize::new(641, 481).center(), (320.0, 240.0));
    }
}
