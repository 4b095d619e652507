// Acquisition, conditionnement et extraction de features pour passcount.

pub mod decode;
pub mod fft;
pub mod mfcc;
pub mod preprocess;
pub mod source;

pub use mfcc::{MfccExtractor, MfccParams};
pub use preprocess::{PreprocessReport, PreprocessingChain};
pub use source::{SampleSource, StreamSource};
