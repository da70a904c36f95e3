//! A thread-safe skin-condition image classifier served over HTTP, built on a
//! pretrained ONNX backbone plus a fine-tuned classification head.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use dermascan::{Classifier, BuiltinBackbone};
//!
//! let classifier = Classifier::builder()
//!     .with_backbone(BuiltinBackbone::Dinov2Base)?
//!     .with_checkpoint("data/classifier_head.safetensors")?
//!     .build()?;
//!
//! let bytes = std::fs::read("lesion.jpg")?;
//! let prediction = classifier.predict_bytes(&bytes)?;
//! println!("class {} ({:.1}%)", prediction.class_index, prediction.confidence * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The classifier is read-only after construction and can be shared across
//! threads using `Arc`:
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use dermascan::{Classifier, BuiltinBackbone};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let classifier = Arc::new(Classifier::builder()
//!     .with_backbone(BuiltinBackbone::Dinov2Base)?
//!     .with_checkpoint("data/classifier_head.safetensors")?
//!     .build()?);
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let classifier = Arc::clone(&classifier);
//!     handles.push(thread::spawn(move || {
//!         let bytes = std::fs::read("lesion.jpg").unwrap();
//!         classifier.predict_bytes(&bytes).unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod model_manager;
pub mod models;
pub mod reference;
mod runtime;
pub mod server;

pub use classifier::{
    Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo, Prediction, Predictor,
};
pub use model_manager::{ModelError, ModelManager};
pub use models::{BackboneCharacteristics, BackboneInfo, BuiltinBackbone};
pub use reference::{ReferenceRow, ReferenceTable, TableError};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
