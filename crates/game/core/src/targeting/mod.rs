//! Target resolution and fan-out.
//!
//! A template's [`TargetingDescriptor`] splits targeting into three optional
//! parts: a query that produces candidates (Resolve), a filter that validates
//! them, and a dispatch that turns each survivor into a child request (Hit).
//! Omitting the query means the effect applies 1:1 to its target.

mod dispatch;
mod filter;
mod resolver;
mod shape;

pub use dispatch::{ContextSlot, DispatchDescriptor, SlotBindings};
pub use filter::{FilterDescriptor, RelationFlags};
pub use resolver::{FanOutReport, ResolvedTargets, dispatch_hits, resolve_targets};
pub use shape::{Facing, QueryShape};

use crate::env::ProgramId;

/// Where Resolve gets its candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryDescriptor {
    /// Geometric query centered on the entity bound to `origin`.
    Spatial {
        shape: QueryShape,
        origin: ContextSlot,
        /// Candidate cap; 0 means the candidate buffer capacity.
        max_candidates: u16,
    },
    /// A graph program writes the candidate list.
    Graph { program: ProgramId },
}

impl QueryDescriptor {
    pub fn circle(radius: i32) -> Self {
        Self::Spatial {
            shape: QueryShape::Circle { radius },
            origin: ContextSlot::Target,
            max_candidates: 0,
        }
    }
}

/// Query, filter and dispatch parts of a template. All optional.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TargetingDescriptor {
    pub query: Option<QueryDescriptor>,
    pub filter: Option<FilterDescriptor>,
    pub dispatch: Option<DispatchDescriptor>,
}

impl TargetingDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: QueryDescriptor) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_filter(mut self, filter: FilterDescriptor) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchDescriptor) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// True when the effect fans out instead of applying 1:1.
    pub fn fans_out(&self) -> bool {
        self.query.is_some()
    }
}
