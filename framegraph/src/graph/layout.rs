//! Automatic render target layout inference.
//!
//! Layouts are decided by one backward fold over the operation list. The
//! table carried between steps maps a rendertarget to the layout the next
//! consumer needs it in:
//!
//! ```text
//!                      seed: present = TransferSrc, external = final layout
//!   op[n-1] ... op[1] op[0]   ◄── fold direction
//!
//!   Blit / ResolveMsaa   final(dest) = table[dest] or TransferDst
//!                        table[source] = TransferSrc
//!   RenderPass (color)   initial = ColorAttachment if Keep, else Undefined
//!                        final   = table[id] or ColorAttachment
//!                        table[id] = initial
//!   RenderPass (input)   table[input] = ShaderRead
//! ```
//!
//! Each step builds a new table from the previous one, so a step can be
//! tested on its own.
//!
//! The fold only looks forward. [`validate_layouts`] then walks the list
//! front to back and checks that every kept attachment and every input finds
//! its target in the layout it expects.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::types::{Layout, MAX_COLOR_RENDERTARGETS, PassBegin};

use super::operation::Operation;
use super::pass::PassDesc;

/// Inferred layouts of one color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLayouts {
    /// Layout the pass expects when it begins.
    pub initial_layout: Layout,
    /// Layout the pass leaves the image in.
    pub final_layout: Layout,
}

/// Inferred layouts of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationLayouts {
    /// Per-slot color attachment layouts.
    RenderPass([Option<AttachmentLayouts>; MAX_COLOR_RENDERTARGETS]),
    /// Final layout of a blit or resolve destination.
    Transfer(Layout),
}

/// A kept attachment or input that finds its target in the wrong layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMismatch<R> {
    /// Index of the operation in the list.
    pub operation: usize,
    /// Rendertarget id.
    pub target: R,
    /// Layout the operation needs.
    pub expected: Layout,
    /// Layout the target is in at that point.
    pub found: Layout,
}

type LayoutTable<R> = HashMap<R, Layout>;

/// Infer the layouts of every operation.
///
/// The result is parallel to `operations`.
///
/// # Panics
///
/// Panics if a render pass would have to leave an attachment in
/// [`Layout::Undefined`] or [`Layout::TransferDst`], which happens when a
/// later operation discards the contents without reading them.
pub fn infer_layouts<'a, P, R>(
    operations: &[Operation<P, R>],
    pass_desc: impl Fn(&P) -> &'a PassDesc<R>,
    present: R,
    external_finals: impl IntoIterator<Item = (R, Layout)>,
) -> Vec<OperationLayouts>
where
    P: Debug,
    R: Copy + Eq + Hash + Debug + 'a,
{
    let mut seed: LayoutTable<R> = external_finals.into_iter().collect();
    seed.insert(present, Layout::TransferSrc);

    let (_, mut layouts) = operations.iter().rev().fold(
        (seed, Vec::with_capacity(operations.len())),
        |(table, mut layouts), op| {
            let (next, op_layouts) = step(&table, op, &pass_desc);
            layouts.push(op_layouts);
            (next, layouts)
        },
    );
    layouts.reverse();
    layouts
}

/// One backward step: the layouts of `op` and the table seen by the
/// operation before it.
fn step<'a, P, R>(
    table: &LayoutTable<R>,
    op: &Operation<P, R>,
    pass_desc: &impl Fn(&P) -> &'a PassDesc<R>,
) -> (LayoutTable<R>, OperationLayouts)
where
    P: Debug,
    R: Copy + Eq + Hash + Debug + 'a,
{
    let mut next = table.clone();
    match op {
        Operation::Blit { source, dest, .. } | Operation::ResolveMsaa { source, dest, .. } => {
            let final_layout = table.get(dest).copied().unwrap_or(Layout::TransferDst);
            next.insert(*source, Layout::TransferSrc);
            (next, OperationLayouts::Transfer(final_layout))
        }
        Operation::RenderPass(pass) => {
            let desc = pass_desc(pass);
            let mut colors = [None; MAX_COLOR_RENDERTARGETS];

            for (slot, color) in desc.colors().iter().enumerate() {
                let Some(color) = color else { continue };

                let initial_layout = match color.pass_begin {
                    PassBegin::Keep => Layout::ColorAttachment,
                    PassBegin::Clear | PassBegin::DontCare => Layout::Undefined,
                };
                let final_layout = table
                    .get(&color.id)
                    .copied()
                    .unwrap_or(Layout::ColorAttachment);
                assert!(
                    !matches!(final_layout, Layout::Undefined | Layout::TransferDst),
                    "pass {pass:?} would leave {:?} in layout {}: a later operation overwrites it unread",
                    color.id,
                    final_layout.name()
                );

                colors[slot] = Some(AttachmentLayouts {
                    initial_layout,
                    final_layout,
                });
                next.insert(color.id, initial_layout);
            }

            for &input in desc.inputs() {
                next.insert(input, Layout::ShaderRead);
            }

            (next, OperationLayouts::RenderPass(colors))
        }
    }
}

/// Check inferred layouts front to back.
///
/// External targets start in their initial layout. An internal target that
/// is first touched by a kept attachment starts in the layout the previous
/// frame left it in. Targets with no known layout are not checked.
pub fn validate_layouts<'a, P, R>(
    operations: &[Operation<P, R>],
    layouts: &[OperationLayouts],
    pass_desc: impl Fn(&P) -> &'a PassDesc<R>,
    external_initials: impl IntoIterator<Item = (R, Layout)>,
) -> Result<(), LayoutMismatch<R>>
where
    R: Copy + Eq + Hash + Debug + 'a,
{
    debug_assert_eq!(operations.len(), layouts.len());

    let mut state = end_of_frame_layouts(operations, layouts, &pass_desc);
    state.extend(external_initials);

    let check = |state: &LayoutTable<R>, operation: usize, target: R, expected: Layout| {
        match state.get(&target) {
            Some(&found) if found != expected => Err(LayoutMismatch {
                operation,
                target,
                expected,
                found,
            }),
            _ => Ok(()),
        }
    };

    for (index, (op, op_layouts)) in operations.iter().zip(layouts).enumerate() {
        match (op, op_layouts) {
            (Operation::RenderPass(pass), OperationLayouts::RenderPass(colors)) => {
                let desc = pass_desc(pass);
                for &input in desc.inputs() {
                    check(&state, index, input, Layout::ShaderRead)?;
                }
                for (color, inferred) in desc.colors().iter().zip(colors) {
                    let (Some(color), Some(inferred)) = (color, inferred) else {
                        continue;
                    };
                    if color.pass_begin == PassBegin::Keep {
                        check(&state, index, color.id, inferred.initial_layout)?;
                    }
                    state.insert(color.id, inferred.final_layout);
                }
            }
            (
                Operation::Blit { dest, .. } | Operation::ResolveMsaa { dest, .. },
                OperationLayouts::Transfer(final_layout),
            ) => {
                state.insert(*dest, *final_layout);
            }
            _ => unreachable!("operation {index} and its inferred layouts disagree"),
        }
    }
    Ok(())
}

/// Layout each written target is left in at the end of a frame.
fn end_of_frame_layouts<'a, P, R>(
    operations: &[Operation<P, R>],
    layouts: &[OperationLayouts],
    pass_desc: &impl Fn(&P) -> &'a PassDesc<R>,
) -> LayoutTable<R>
where
    R: Copy + Eq + Hash + Debug + 'a,
{
    let mut table = LayoutTable::new();
    for (op, op_layouts) in operations.iter().zip(layouts) {
        match (op, op_layouts) {
            (Operation::RenderPass(pass), OperationLayouts::RenderPass(colors)) => {
                for (color, inferred) in pass_desc(pass).colors().iter().zip(colors) {
                    if let (Some(color), Some(inferred)) = (color, inferred) {
                        table.insert(color.id, inferred.final_layout);
                    }
                }
            }
            (
                Operation::Blit { dest, .. } | Operation::ResolveMsaa { dest, .. },
                OperationLayouts::Transfer(final_layout),
            ) => {
                table.insert(*dest, *final_layout);
            }
            _ => {}
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    type Passes = HashMap<&'static str, PassDesc<&'static str>>;

    fn clear(id: &'static str) -> PassDesc<&'static str> {
        PassDesc::new().with_color(0, id, PassBegin::Clear, [0.0; 4])
    }

    fn keep(id: &'static str) -> PassDesc<&'static str> {
        PassDesc::new().with_color(0, id, PassBegin::Keep, [0.0; 4])
    }

    fn run(
        passes: &Passes,
        ops: &[Operation<&'static str, &'static str>],
        present: &'static str,
    ) -> Vec<OperationLayouts> {
        infer_layouts(ops, |p| &passes[p], present, [])
    }

    fn color_layouts(layouts: &OperationLayouts) -> AttachmentLayouts {
        match layouts {
            OperationLayouts::RenderPass(colors) => colors[0].unwrap(),
            OperationLayouts::Transfer(_) => panic!("not a render pass"),
        }
    }

    #[test]
    fn test_input_consumer_makes_final_shader_read() {
        let passes = Passes::from([
            ("p1", clear("a")),
            ("p2", clear("b").with_input("a")),
        ]);
        let ops = [Operation::RenderPass("p1"), Operation::RenderPass("p2")];

        let layouts = run(&passes, &ops, "b");
        assert_eq!(
            color_layouts(&layouts[0]),
            AttachmentLayouts {
                initial_layout: Layout::Undefined,
                final_layout: Layout::ShaderRead,
            }
        );
        assert_eq!(color_layouts(&layouts[1]).final_layout, Layout::TransferSrc);
        assert_eq!(
            validate_layouts(&ops, &layouts, |p| &passes[p], []),
            Ok(())
        );
    }

    #[test]
    fn test_keep_chain() {
        let passes = Passes::from([("opaque", clear("color")), ("gui", keep("color"))]);
        let ops = [Operation::RenderPass("opaque"), Operation::RenderPass("gui")];

        let layouts = run(&passes, &ops, "color");
        assert_eq!(
            color_layouts(&layouts[0]).final_layout,
            Layout::ColorAttachment
        );
        assert_eq!(
            color_layouts(&layouts[1]),
            AttachmentLayouts {
                initial_layout: Layout::ColorAttachment,
                final_layout: Layout::TransferSrc,
            }
        );
        assert!(validate_layouts(&ops, &layouts, |p| &passes[p], []).is_ok());
    }

    #[test]
    fn test_blit_destination_defaults_to_transfer_dst() {
        let passes = Passes::from([("scene", clear("a"))]);
        let ops = [
            Operation::RenderPass("scene"),
            Operation::blit("a", "b"),
            Operation::blit("a", "present"),
        ];

        let layouts = run(&passes, &ops, "present");
        assert_eq!(color_layouts(&layouts[0]).final_layout, Layout::TransferSrc);
        assert_eq!(layouts[1], OperationLayouts::Transfer(Layout::TransferDst));
        assert_eq!(layouts[2], OperationLayouts::Transfer(Layout::TransferSrc));
    }

    #[test]
    fn test_unconsumed_attachment_stays_color_attachment() {
        let passes = Passes::from([("scratch", clear("unused")), ("final", clear("out"))]);
        let ops = [Operation::RenderPass("scratch"), Operation::RenderPass("final")];

        let layouts = run(&passes, &ops, "out");
        assert_eq!(
            color_layouts(&layouts[0]).final_layout,
            Layout::ColorAttachment
        );
    }

    #[test]
    fn test_external_final_layout_seeds_the_fold() {
        let passes = Passes::from([("ui", clear("overlay")), ("final", clear("out"))]);
        let ops = [Operation::RenderPass("ui"), Operation::RenderPass("final")];

        let layouts = infer_layouts(
            &ops,
            |p| &passes[p],
            "out",
            [("overlay", Layout::ShaderRead)],
        );
        assert_eq!(color_layouts(&layouts[0]).final_layout, Layout::ShaderRead);
    }

    #[test]
    fn test_steps_do_not_mutate_their_input() {
        let passes = Passes::from([("p", clear("a").with_input("b"))]);
        let table = LayoutTable::from([("a", Layout::TransferSrc)]);

        let (next, _) = step(&table, &Operation::RenderPass("p"), &|p: &&'static str| &passes[p]);
        assert_eq!(table.len(), 1);
        assert_eq!(next[&"a"], Layout::Undefined);
        assert_eq!(next[&"b"], Layout::ShaderRead);
    }

    #[test]
    fn test_keep_after_shader_read_is_a_mismatch() {
        let passes = Passes::from([
            ("p1", clear("a")),
            ("p2", clear("b").with_input("a")),
            ("p3", keep("a")),
            ("p4", clear("out").with_input("a")),
        ]);
        let ops = [
            Operation::RenderPass("p1"),
            Operation::RenderPass("p2"),
            Operation::RenderPass("p3"),
            Operation::RenderPass("p4"),
        ];

        let layouts = run(&passes, &ops, "out");
        assert_eq!(
            validate_layouts(&ops, &layouts, |p| &passes[p], []),
            Err(LayoutMismatch {
                operation: 2,
                target: "a",
                expected: Layout::ColorAttachment,
                found: Layout::ShaderRead,
            })
        );
    }

    #[test]
    fn test_external_initial_layout_is_checked() {
        let passes = Passes::from([("gui", keep("swap"))]);
        let ops = [Operation::RenderPass("gui")];
        let layouts = infer_layouts(
            &ops,
            |p| &passes[p],
            "swap",
            [("swap", Layout::TransferSrc)],
        );

        let undefined = validate_layouts(
            &ops,
            &layouts,
            |p| &passes[p],
            [("swap", Layout::Undefined)],
        );
        assert_eq!(undefined.unwrap_err().found, Layout::Undefined);

        let attached = validate_layouts(
            &ops,
            &layouts,
            |p| &passes[p],
            [("swap", Layout::ColorAttachment)],
        );
        assert!(attached.is_ok());
    }

    #[test]
    fn test_previous_frame_layout_is_used_for_first_keep() {
        // "history" is kept first and read last, so it enters each frame in
        // ShaderRead.
        let passes = Passes::from([
            ("accumulate", keep("history")),
            ("resolve", clear("out").with_input("history")),
        ]);
        let ops = [
            Operation::RenderPass("accumulate"),
            Operation::RenderPass("resolve"),
        ];

        let layouts = run(&passes, &ops, "out");
        let err = validate_layouts(&ops, &layouts, |p| &passes[p], []).unwrap_err();
        assert_eq!(err.operation, 0);
        assert_eq!(err.found, Layout::ShaderRead);
    }

    #[test]
    #[should_panic(expected = "overwrites it unread")]
    fn test_overwritten_attachment_panics() {
        let passes = Passes::from([("p1", clear("a")), ("p2", clear("a"))]);
        let ops = [Operation::RenderPass("p1"), Operation::RenderPass("p2")];
        run(&passes, &ops, "a");
    }
}
