//! 关键点几何计算模块
//!
//! 从单帧关键点计算原始姿态通道的纯函数。
//! 世界坐标系 y 轴朝下，因此"向上"为 -y。退化向量返回 0 而不是 NaN。

use crate::constants::MIN_SHOULDER_SPAN;
use crate::posture::landmarks::{DetectionFrame, Landmark, LandmarkIndex, LandmarkSet};
use crate::posture::types::PostureAngles;

const EPSILON: f64 = 1e-9;
const WORLD_UP: [f64; 3] = [0.0, -1.0, 0.0];
const WORLD_DOWN: [f64; 3] = [0.0, 1.0, 0.0];

fn vector(from: &Landmark, to: &Landmark) -> [f64; 3] {
    [to.x - from.x, to.y - from.y, to.z - from.z]
}

/// 两向量夹角（度），任一向量长度为零时返回 0
fn angle_between(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    let len_a = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    let len_b = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
    if len_a < EPSILON || len_b < EPSILON {
        return 0.0;
    }
    (dot / (len_a * len_b)).clamp(-1.0, 1.0).acos().to_degrees()
}

/// 左右连线的有符号倾角（度），正值表示左侧偏低
fn line_tilt(left: &Landmark, right: &Landmark) -> f64 {
    let dy = left.y - right.y;
    let dx = (left.x - right.x).abs();
    if dx < EPSILON && dy.abs() < EPSILON {
        return 0.0;
    }
    dy.atan2(dx).to_degrees()
}

fn ear_mid(lm: &LandmarkSet) -> Landmark {
    lm[LandmarkIndex::LeftEar].midpoint(&lm[LandmarkIndex::RightEar])
}

fn shoulder_mid(lm: &LandmarkSet) -> Landmark {
    lm[LandmarkIndex::LeftShoulder].midpoint(&lm[LandmarkIndex::RightShoulder])
}

fn hip_mid(lm: &LandmarkSet) -> Landmark {
    lm[LandmarkIndex::LeftHip].midpoint(&lm[LandmarkIndex::RightHip])
}

pub fn head_forward_angle(world: &LandmarkSet) -> f64 {
    angle_between(vector(&shoulder_mid(world), &ear_mid(world)), WORLD_UP)
}

pub fn torso_angle(world: &LandmarkSet) -> f64 {
    angle_between(vector(&shoulder_mid(world), &hip_mid(world)), WORLD_DOWN)
}

pub fn head_tilt_angle(world: &LandmarkSet) -> f64 {
    line_tilt(&world[LandmarkIndex::LeftEar], &world[LandmarkIndex::RightEar])
}

pub fn shoulder_diff(world: &LandmarkSet) -> f64 {
    line_tilt(
        &world[LandmarkIndex::LeftShoulder],
        &world[LandmarkIndex::RightShoulder],
    )
}

/// 双耳水平跨度占画面宽度的比例，宽度不可用时返回 0
///
/// 图像关键点已按画面归一化，跨度本身即为比例。
pub fn face_frame_ratio(image: &LandmarkSet, frame_width: f64) -> f64 {
    if !frame_width.is_finite() || frame_width <= 0.0 {
        return 0.0;
    }
    (image[LandmarkIndex::LeftEar].x - image[LandmarkIndex::RightEar].x).abs()
}

/// 鼻尖在图像中的纵向位置（0 = 顶部）
pub fn face_y(image: &LandmarkSet) -> f64 {
    image[LandmarkIndex::Nose].y
}

/// 鼻尖到双耳的平均距离，相对肩宽归一化
///
/// 头部先于躯干靠近摄像头时该值增大。
pub fn nose_to_ear_avg(image: &LandmarkSet) -> f64 {
    let nose = &image[LandmarkIndex::Nose];
    let avg = (nose.distance_2d(&image[LandmarkIndex::LeftEar])
        + nose.distance_2d(&image[LandmarkIndex::RightEar]))
        / 2.0;
    let span = image[LandmarkIndex::LeftShoulder].distance_2d(&image[LandmarkIndex::RightShoulder]);
    let span = if span.is_finite() && span >= MIN_SHOULDER_SPAN {
        span
    } else {
        MIN_SHOULDER_SPAN
    };
    avg / span
}

/// 计算单帧的全部原始通道
pub fn extract_angles(frame: &DetectionFrame) -> PostureAngles {
    let world = &frame.world_landmarks;
    let image = &frame.landmarks;
    PostureAngles {
        head_forward: head_forward_angle(world),
        torso: torso_angle(world),
        head_tilt: head_tilt_angle(world),
        face_frame_ratio: face_frame_ratio(image, frame.frame_width),
        shoulder_diff: shoulder_diff(world),
        face_y: Some(face_y(image)),
        nose_to_ear_avg: Some(nose_to_ear_avg(image)),
    }
}
