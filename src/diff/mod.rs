//! Comparison of desired state against current state
//!
//! `structural` compares two JSON trees property by property; `keyed`
//! classifies whole named entities, following renames.

pub mod keyed;
pub mod structural;

pub use keyed::{CurrentEntity, DesiredEntity, KeyedAction, KeyedChange, ReconcileOptions, reconcile};
pub use structural::{DiffAction, DiffOptions, PropertyDiff, diff, diff_with_options, equivalent};
