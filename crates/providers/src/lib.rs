//! Model invocation boundary: the provider-agnostic chat trait and an
//! explicitly constructed registry mapping roles to provider instances.
//! Concrete vendor adapters live outside this workspace.

pub mod registry;
pub mod traits;

pub use registry::{ProviderRegistry, ROLE_EXECUTOR, ROLE_SUMMARIZER};
pub use traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
