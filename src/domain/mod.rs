// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types that define what the system talks about.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O beyond loading the vocabulary artifact
//   - Only plain structs, enums, and the error taxonomy
//
// Everything downstream — shard files, batch assembly, the
// orchestrator — is expressed in terms of these types.

// ASTs, batched tree graphs, edge inversion
pub mod tree;

// token / node-type / label id maps and framing specials
pub mod vocabulary;

// The typed failure taxonomy shared by every layer
pub mod error;
