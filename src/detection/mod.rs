/// 检测系统 (Detection System)
///
/// 检测模型在进程外运行, 这里只处理它的输出:
/// - Source:   检测结果输入 (JSON行 / 读取线程)
/// - Selector: 置信度过滤 + 跟踪目标选择
pub mod selector;
pub mod source;
pub mod types;

pub use selector::{pick_largest, Selection, TargetSelector};
pub use source::{
    parse_frame, spawn_reader, ChannelSource, DetectionSource, JsonLinesSource, SourcePoll,
};
pub use types::{BBox, Detection, FrameDetections, FrameSize};
