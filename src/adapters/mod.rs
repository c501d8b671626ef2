pub mod alert;
pub mod console;
pub mod onnx;
pub mod render;
pub mod storage;
pub mod v4l2;
pub mod window;
