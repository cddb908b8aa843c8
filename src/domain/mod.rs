// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that name the core
// concepts of the classifier trainer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain data, traits and the error taxonomy
//
// Reference: Rust Book §5 (Structs), §9 (Error Handling), §10 (Traits)

// A raw labelled text example from the corpus
pub mod labeled_text;

// The error taxonomy shared by the data, ml and infra layers
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
