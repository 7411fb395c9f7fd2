pub mod classifier;
pub mod executor;
pub mod pipeline;
pub mod prompts;
pub mod summarizer;
pub mod synth;
