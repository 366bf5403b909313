pub mod contract;
pub mod gemini;
