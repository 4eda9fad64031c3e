//! Purpose: Define the stable public API boundary for the engine.
//! Exports: Engine façade, core binding types, events, and errors.
//! Role: Public, additive-only surface; consumers import from here.
//! Invariants: This module is the only public path feature code should use.
//! Invariants: Internal core modules stay reachable for advanced embedding
//! but carry no stability promise of their own.

mod bridge;
mod engine;

pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::events::{Emitter, Subscription};
pub use crate::core::fingerprint::Fingerprint;
pub use crate::core::graph::{GraphSource, ModuleGraph, ModuleId};
pub use crate::core::hints::HintMap;
pub use crate::core::instance::{InstanceBuilder, LiveInstance};
pub use crate::core::proxy::{ProxyDescriptor, ProxyHandle, ProxyModel};
pub use crate::core::registry::{
    ExportRegistry, ExportState, ExportStatus, RESOLVED_EVENT, ResolveSummary,
};
pub use crate::core::resolve::{ResolveOptions, ResolvedBinding, matching_modules, resolve};
pub use crate::core::value::{
    ClassHandle, DEFAULT_EXPORT, ExportValue, HostFunction, ModuleExports,
};
pub use bridge::EventBridge;
pub use engine::{Engine, EngineBuilder};

pub type ApiResult<T> = Result<T, Error>;
