pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Subfolders of the results folder that receive the original image.
pub const TARGET_FOLDER: &str = "detection_target";
pub const NON_TARGET_FOLDER: &str = "detection_non_target";

// Attribute keys shared by predictors and the orchestrator.
pub const KEY_RACE: &str = "race";
pub const KEY_GENDER: &str = "gender";
pub const KEY_AGE: &str = "age";
pub const KEY_BOX_COLOR: &str = "box_color";

pub const UNKNOWN: &str = "알 수 없음";
pub const MALE: &str = "남성";
pub const FEMALE: &str = "여성";

/// Race labels in the order the summary lists them.
pub const RACES: [&str; 4] = ["백인", "흑인", "아시아", "중동"];

pub const AGE_BRACKETS: [&str; 9] = [
    "영아", "유아", "10대", "20대", "30대", "40대", "50대", "60대", "70+",
];

pub const MALE_BOX_COLOR: [u8; 3] = [50, 100, 255];
pub const FEMALE_BOX_COLOR: [u8; 3] = [255, 100, 50];
pub const DEFAULT_BOX_COLOR: [u8; 3] = [0, 0, 0];
pub const BOXES_ONLY_COLOR: [u8; 3] = [0, 255, 0];

pub const DEFAULT_TARGET_LABEL: &str = "가카!";

pub const SEETA_MODEL_NAME: &str = "seeta_fd_frontal_v1.0.bin";
pub const SEETA_MODEL_URL: &str =
    "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin";
