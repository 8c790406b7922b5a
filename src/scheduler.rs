//! Incremental tree builds.
//!
//! An [`IncrementalBuild`] owns a scratch tree and processes at most one batch
//! per [`IncrementalBuild::step`]. The caller decides when to resume a yielded
//! build, which keeps each batch a discrete unit of work on the host loop.

use log::debug;

use crate::field_order::FieldOrder;
use crate::generation::GenerationGuard;
use crate::grouping::{hint_paths, BuildOptions, GroupingPass};
use crate::track::TrackRef;
use crate::tree::{GroupTree, NodeId, NodePath};

/// Records processed per scheduling quantum unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// Main pass over the search results.
    Running,
    /// Trailing pass over tracks with an empty outermost field.
    DeferredPass,
}

/// Completed tree ready for promotion.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTree {
    pub generation: u64,
    pub keyword: String,
    pub order: FieldOrder,
    pub tree: GroupTree,
    pub expand_hints: Vec<NodePath>,
    /// Placeholder baked into this tree's Unknown groups.
    pub unknown_label: String,
}

impl BuiltTree {
    /// Empty tree shown before the first build completes.
    pub fn empty(unknown_label: String) -> Self {
        Self {
            generation: 0,
            keyword: String::new(),
            order: FieldOrder::default(),
            tree: GroupTree::new(),
            expand_hints: Vec::new(),
            unknown_label,
        }
    }

    pub fn label(&self, id: NodeId) -> Option<String> {
        self.tree.label(id, &self.unknown_label)
    }

    pub fn outline(&self) -> Vec<String> {
        self.tree.outline(&self.unknown_label)
    }
}

/// Outcome of one scheduling quantum.
pub enum BuildStep {
    /// More work remains; resume the returned build at the next opportunity.
    Yield(IncrementalBuild),
    Finished(BuiltTree),
    /// A newer generation started; all work was dropped.
    Aborted { generation: u64 },
}

pub struct IncrementalBuild {
    guard: GenerationGuard,
    order: FieldOrder,
    options: BuildOptions,
    batch_size: usize,
    tree: GroupTree,
    pass: GroupingPass,
    phase: BuildPhase,
    queue: Vec<TrackRef>,
    offset: usize,
    hints: Vec<NodeId>,
}

impl IncrementalBuild {
    pub fn new(
        guard: GenerationGuard,
        tracks: Vec<TrackRef>,
        order: FieldOrder,
        options: BuildOptions,
        batch_size: usize,
    ) -> Self {
        let tree = GroupTree::new();
        let pass = GroupingPass::new(&tree, tree.root(), &order, false, &options);
        Self {
            guard,
            order,
            options,
            batch_size: batch_size.max(1),
            tree,
            pass,
            phase: BuildPhase::Running,
            queue: tracks,
            offset: 0,
            hints: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.guard.generation_id()
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Records left in the current pass.
    pub fn remaining(&self) -> usize {
        self.queue.len() - self.offset
    }

    /// Processes one batch, or drops everything if the generation is stale.
    pub fn step(mut self) -> BuildStep {
        if self.guard.is_stale() {
            debug!(
                "IncrementalBuild: generation {} superseded at offset {} ({:?})",
                self.guard.generation_id(),
                self.offset,
                self.phase
            );
            return BuildStep::Aborted {
                generation: self.guard.generation_id(),
            };
        }

        let end = (self.offset + self.batch_size).min(self.queue.len());
        self.pass
            .append_batch(&mut self.tree, &self.queue[self.offset..end], &mut self.hints);
        self.offset = end;
        if self.offset < self.queue.len() {
            return BuildStep::Yield(self);
        }

        let deferred = self.pass.take_deferred();
        if self.phase == BuildPhase::Running && !deferred.is_empty() {
            debug!(
                "IncrementalBuild: generation {} deferring {} track(s) with unknown {}",
                self.guard.generation_id(),
                deferred.len(),
                self.order
                    .grouping_fields()
                    .first()
                    .map(|field| field.as_str())
                    .unwrap_or("field")
            );
            self.pass = GroupingPass::new(
                &self.tree,
                self.tree.root(),
                &self.order,
                true,
                &self.options,
            );
            self.phase = BuildPhase::DeferredPass;
            self.queue = deferred;
            self.offset = 0;
            return BuildStep::Yield(self);
        }

        let expand_hints = hint_paths(&self.tree, &self.hints);
        BuildStep::Finished(BuiltTree {
            generation: self.guard.generation_id(),
            keyword: self.options.keyword,
            order: self.order,
            tree: self.tree,
            expand_hints,
            unknown_label: self.options.unknown_label,
        })
    }

    /// Steps until the build finishes or aborts. Test and batch-tool helper;
    /// interactive callers should resume between batches instead.
    pub fn run_to_end(self) -> BuildStep {
        let mut build = self;
        loop {
            match build.step() {
                BuildStep::Yield(next) => build = next,
                done => return done,
            }
        }
    }
}
