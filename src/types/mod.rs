pub mod answer;
pub mod chunk;

pub use answer::{
    Answer, Confidence, ConfidenceLevel, CritiqueVerdict, ReflectionOutcome, ReflectionStep,
    StepTimings, Termination, Verdict,
};
pub use chunk::{DocumentChunk, DocumentMetadata, RetrievedChunk, SourceDocument};
