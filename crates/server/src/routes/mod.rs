pub mod consultations;
pub mod embedding;
pub mod search;
pub mod system;
