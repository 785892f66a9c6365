// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits defining the core concepts of
// the system. No burn types, no file I/O, no ML code here —
// this layer says what things ARE, not how they work.

// One indexed unit of the corpus — the classification target
pub mod verse;

// Core abstractions (traits) that other layers implement
pub mod traits;

pub use verse::Verse;
