//! The operation list of a graph.

use std::fmt;

use crate::types::Layout;

/// One step of a graph, executed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<P, R> {
    /// Run the render pass with this id.
    RenderPass(P),
    /// Copy `source` into `dest`.
    Blit {
        source: R,
        dest: R,
        /// Layout `dest` is left in. Inferred by `build`.
        final_layout: Layout,
    },
    /// Resolve multisampled `source` into `dest`.
    ResolveMsaa {
        source: R,
        dest: R,
        /// Layout `dest` is left in. Inferred by `build`.
        final_layout: Layout,
    },
}

impl<P, R> Operation<P, R> {
    pub(crate) fn blit(source: R, dest: R) -> Self {
        Self::Blit {
            source,
            dest,
            final_layout: Layout::Undefined,
        }
    }

    pub(crate) fn resolve_msaa(source: R, dest: R) -> Self {
        Self::ResolveMsaa {
            source,
            dest,
            final_layout: Layout::Undefined,
        }
    }

    /// Pass id of a render pass operation.
    pub fn render_pass(&self) -> Option<&P> {
        match self {
            Self::RenderPass(pass) => Some(pass),
            Self::Blit { .. } | Self::ResolveMsaa { .. } => None,
        }
    }
}

impl<P: fmt::Debug, R: fmt::Debug> fmt::Display for Operation<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenderPass(pass) => write!(f, "RenderPass {pass:?}"),
            Self::Blit {
                source,
                dest,
                final_layout,
            } => write!(f, "Blit {source:?} -> {dest:?}\t{}", final_layout.name()),
            Self::ResolveMsaa {
                source,
                dest,
                final_layout,
            } => write!(
                f,
                "ResolveMSAA {source:?} -> {dest:?}\t{}",
                final_layout.name()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let op: Operation<&str, &str> = Operation::RenderPass("scene");
        assert_eq!(op.to_string(), "RenderPass \"scene\"");

        let op: Operation<&str, &str> = Operation::Blit {
            source: "a",
            dest: "b",
            final_layout: Layout::TransferSrc,
        };
        assert_eq!(op.to_string(), "Blit \"a\" -> \"b\"\tTransferSrc");
    }

    #[test]
    fn test_transfer_starts_undefined() {
        let op: Operation<&str, &str> = Operation::resolve_msaa("msaa", "resolved");
        assert!(op.render_pass().is_none());
        assert!(matches!(
            op,
            Operation::ResolveMsaa {
                final_layout: Layout::Undefined,
                ..
            }
        ));
    }
}
