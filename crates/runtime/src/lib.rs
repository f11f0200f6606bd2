//! `pv-runtime`: the agent execution loop and context window management.
//!
//! | Module        | Responsibility                                            |
//! |---------------|-----------------------------------------------------------|
//! | [`blocks`]    | Partition transcripts into atomic blocks                  |
//! | [`sizing`]    | Approximate message sizes                                 |
//! | [`window`]    | Budget-bounded window selection, newest first             |
//! | [`compaction`]| Tool-output caps and in-loop synopsis folding             |
//! | [`summarizer`]| Synopsis generation through a provider                    |
//! | [`executor`]  | The think/act step loop                                   |
//! | [`rolling`]   | Session epochs and view assembly                          |
//! | [`manager`]   | Per-message orchestration and persistence                 |
//! | [`archive`]   | Background archival into the daily memory category        |

pub mod archive;
pub mod blocks;
pub mod bootstrap;
pub mod compaction;
pub mod executor;
pub mod manager;
pub mod rolling;
pub mod sizing;
pub mod summarizer;
pub mod window;

pub use archive::Archiver;
pub use blocks::{chunk_into_blocks, flatten, validate_tool_pairing, Block, PairingIssue};
pub use bootstrap::{build_memory, build_runtime, build_tools, Runtime};
pub use compaction::{truncate_tool_output, CompactionReport, Compactor};
pub use executor::{AgentExecutor, ExecuteOptions, RunOutcome, RunStatus};
pub use manager::{SessionManager, SessionSummary, TurnReply};
pub use rolling::{assemble_view, RollingSummaryManager};
pub use sizing::{CharHeuristic, ProviderSizer, SizeEstimator};
pub use summarizer::{LlmSummarizer, Summarizer, Synopsis, NO_KEY_FACTS};
pub use window::{build_window, ContextWindow, WindowReport};
