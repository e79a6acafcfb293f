pub mod shared {
    pub mod config;
    pub mod constants;
    pub mod error;
    pub mod face_box;
    pub mod frame;
    pub mod onnx_session;
}

pub mod detection {
    pub mod domain {
        pub mod detection_aggregator;
        pub mod face_detector;
        pub mod non_max_suppression;
    }
    pub mod infrastructure;
}

pub mod prediction {
    pub mod domain {
        pub mod attribute_predictor;
        pub mod attributes;
        pub mod prediction_aggregator;
    }
    pub mod infrastructure;
}

pub mod identity {
    pub mod domain {
        pub mod face_encoder;
        pub mod identity_gate;
        pub mod target_embeddings;
    }
    pub mod infrastructure;
}

pub mod imaging {
    pub mod domain {
        pub mod image_reader;
    }
    pub mod infrastructure {
        pub mod image_file_reader;
    }
}

pub mod rendering {
    pub mod domain {
        pub mod canvas_transform;
        pub mod face_renderer;
    }
    pub mod infrastructure {
        pub mod overlay_renderer;
    }
}

pub mod persistence {
    pub mod domain {
        pub mod result_persister;
    }
    pub mod infrastructure {
        pub mod exif_stamp;
        pub mod file_result_persister;
    }
}

pub mod pipeline {
    pub mod analyze_image_use_case;
    pub mod batch_executor;
    pub mod face_prediction;
    pub mod pipeline_logger;
    pub mod summary;
    pub mod infrastructure {
        pub mod threaded_batch_executor;
    }
}
