//! Template filling for sing-box style configuration documents.
//!
//! One run goes through five steps:
//! 1. parse invocation [`Parameters`] and fetch nodes from a [`NodeSource`]
//! 2. populate template groups from the rule string ([`populate_groups`])
//! 3. point still-empty groups at the fallback ([`resolve_fallbacks`])
//! 4. prune the top-level selector ([`reconcile_top_selector`])
//! 5. append the routable nodes and serialize the [`Document`]
//!
//! [`Engine::generate`] wraps all of it and always returns a JSON document,
//! either the filled configuration or an error report.

pub mod config;
pub mod document;
pub mod engine;
pub mod fallback;
pub mod params;
pub mod populate;
pub mod selector;
pub mod source;

pub use config::EngineConfig;
pub use document::Document;
pub use engine::{Engine, GenerateOutcome, RunReport};
pub use fallback::{resolve_fallbacks, FallbackReport};
pub use params::{parse_fragment, Parameters};
pub use populate::{populate_groups, PopulateReport};
pub use selector::{reconcile_top_selector, SelectorReport};
pub use source::{
    filter_unsupported, NodeLocator, NodeRequest, NodeSource, StaticNodeSource,
    UNSUPPORTED_PROXY_TYPES,
};
