//! Public array-index convention.
//!
//! Every node, case and time-sample index crossing the public API is
//! translated through one [`ArrayOffset`] value held by the caller-facing
//! object. Internally everything is 0-based.

use crate::{CoreError, CoreResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayOffset {
    /// API arrays run from 0 to N-1.
    #[default]
    ZeroBased,
    /// API arrays run from 1 to N.
    OneBased,
}

impl ArrayOffset {
    pub fn label(self) -> &'static str {
        match self {
            ArrayOffset::ZeroBased => "0-based",
            ArrayOffset::OneBased => "1-based",
        }
    }

    /// Translate an API index into a checked internal 0-based index.
    pub fn to_internal(self, index: usize, len: usize, what: &'static str) -> CoreResult<usize> {
        let internal = match self {
            ArrayOffset::ZeroBased => index,
            ArrayOffset::OneBased => {
                if index == 0 {
                    return Err(CoreError::BadOffsetIndex {
                        what,
                        index: 0,
                        convention: self.label(),
                    });
                }
                index - 1
            }
        };
        if internal >= len {
            return Err(CoreError::IndexOob {
                what,
                index,
                len,
            });
        }
        Ok(internal)
    }

    /// Translate an internal 0-based index into its API form.
    pub fn to_external(self, internal: usize) -> usize {
        match self {
            ArrayOffset::ZeroBased => internal,
            ArrayOffset::OneBased => internal + 1,
        }
    }
}
