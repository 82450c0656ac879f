//! 目标选择器 (Target Selector)
//!
//! 置信度过滤 → 按置信度排序 → 取面积最大的一个作为跟踪目标。
//! 面积优先: 离镜头最近的目标比"置信度高但很小"的目标更值得跟踪。

use super::types::Detection;

/// 单帧选择结果
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    /// 通过阈值的检测, 按置信度降序 (稳定排序)
    pub targets: Vec<Detection>,
    /// 被选中的目标, None 表示本帧目标不可见
    pub target: Option<Detection>,
}

impl Selection {
    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct TargetSelector {
    confidence_threshold: f32,
    target_class: Option<u32>,
}

impl TargetSelector {
    pub fn new(confidence_threshold: f32, target_class: Option<u32>) -> Self {
        Self {
            confidence_threshold,
            target_class,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// 过滤并排序, 得到本帧的候选集合
    pub fn rank(&self, detections: &[Detection]) -> Vec<Detection> {
        let mut targets: Vec<Detection> = detections
            .iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .filter(|d| self.target_class.map_or(true, |class| d.class_id == class))
            .copied()
            .collect();

        // sort_by 是稳定排序: 置信度相同保持原始输出顺序
        targets.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        targets
    }

    /// 完整的选择流程: rank → pick_largest
    pub fn select(&self, detections: &[Detection]) -> Selection {
        let targets = self.rank(detections);
        let target = pick_largest(&targets);
        Selection { targets, target }
    }
}

/// 面积最大者胜出, 面积相同取先出现的
pub fn pick_largest(targets: &[Detection]) -> Option<Detection> {
    let mut best: Option<&Detection> = None;
    for candidate in targets {
        match best {
            Some(current) if candidate.area() <= current.area() => {}
            _ => best = Some(candidate),
        }
    }
    best.copied()
}
