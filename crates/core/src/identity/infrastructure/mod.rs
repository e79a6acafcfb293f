pub mod onnx_arcface_encoder;
