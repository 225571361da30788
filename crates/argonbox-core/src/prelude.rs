//! Common imports for working with argonbox types.
//!
//! ```
//! use argonbox_core::prelude::*;
//! ```

pub use crate::{
    ArgonError, ArgonResult, Digest, EngineVersion, HashOptions, HashParams, Variant,
    constant_time_eq,
};
