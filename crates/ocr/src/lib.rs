pub mod capability;
pub mod hash;
pub mod lines;
pub mod preprocess;
pub mod rasterize;
pub mod recognizer;
pub mod types;

pub use capability::{command_available, Capabilities};
pub use hash::{content_digest, sha256_bytes, to_hex};
pub use lines::{group_into_lines, lines_from_text};
pub use preprocess::{prepare_for_ocr_from_bytes, PreprocessError};
pub use rasterize::{PageImages, Pdftoppm, RasterizeError, Rasterizer};
pub use recognizer::{parse_tsv, MockRecognizer, OcrBackend, OcrError, TesseractCli};
pub use types::{BoundingBox, OcrLine, OcrWord};
