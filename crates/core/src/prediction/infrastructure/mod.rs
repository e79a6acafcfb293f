pub mod onnx_fairface_predictor;
