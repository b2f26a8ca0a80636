use std::sync::Arc;

use godisk_api::{
    BlockReport, DiskReport, InodeReport, InodesReport, JournalRow, LsReport, MbrReport,
    ReportKind, ReportPayload, SuperblockReport, TreeReport,
};
use serde::Serialize;

use crate::block_runs::contiguous_runs;
use crate::tiling::{tile_segments, Tile, DISK_TILE_BUDGET, EXTENDED_TILE_BUDGET};

/// Observer invoked synchronously after every surface mutation.
pub type RedrawHandler = Arc<dyn Fn(&ConsoleSurfaces) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Everything the console displays. Report surfaces stay `None` unless the
/// matching report was requested and came back ready.
pub struct ConsoleSurfaces {
    pub output: String,
    pub busy: bool,
    pub mbr: Option<MbrReport>,
    pub disk: Option<DiskReport>,
    pub disk_tiles: Vec<Tile>,
    pub extended_tiles: Vec<Tile>,
    pub inode: Option<InodeReport>,
    /// Block runs of the `inode` report, or of the explorer selection once
    /// one is made.
    pub inode_runs: Vec<Vec<i64>>,
    pub inodes: Option<InodesReport>,
    pub inode_chain: Vec<InodeReport>,
    /// Root of the inode explorer and the inode currently shown beside it.
    pub inode_root: Option<InodeReport>,
    pub inode_selected: Option<InodeReport>,
    pub blocks: Option<BlockReport>,
    pub bitmap_inode: Option<String>,
    pub bitmap_block: Option<String>,
    pub tree: Option<TreeReport>,
    pub tree_selection: Option<i64>,
    pub superblock: Option<SuperblockReport>,
    pub listing: Option<LsReport>,
    pub journal: Option<Vec<JournalRow>>,
    /// Kinds requested by the last run that stayed empty after polling.
    pub pending: Vec<ReportKind>,
}

impl ConsoleSurfaces {
    /// Clears output and every report surface. `busy` is left alone.
    pub fn clear(&mut self) {
        let busy = self.busy;
        *self = Self {
            busy,
            ..Self::default()
        };
    }

    /// Output with each line prefixed by `> `.
    pub fn prefixed_output(&self) -> String {
        self.output
            .lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_reports(&self) -> bool {
        self.mbr.is_some()
            || self.disk.is_some()
            || self.inode.is_some()
            || self.inodes.is_some()
            || self.blocks.is_some()
            || self.bitmap_inode.is_some()
            || self.bitmap_block.is_some()
            || self.tree.is_some()
            || self.superblock.is_some()
            || self.listing.is_some()
            || self.journal.is_some()
    }

    /// Installs a ready payload on its surface, deriving tiles, block runs,
    /// block ordering and the initial tree selection.
    pub fn apply_report(&mut self, payload: ReportPayload) {
        match payload {
            ReportPayload::Mbr(report) => self.mbr = Some(report),
            ReportPayload::Disk(report) => {
                self.disk_tiles = tile_segments(&report.segments, DISK_TILE_BUDGET);
                self.extended_tiles = report
                    .extended
                    .as_ref()
                    .filter(|extended| !extended.segments.is_empty())
                    .map(|extended| tile_segments(&extended.segments, EXTENDED_TILE_BUDGET))
                    .unwrap_or_default();
                self.disk = Some(report);
            }
            ReportPayload::Inode(report) => {
                self.inode_runs = contiguous_runs(&report.blocks);
                self.inode = Some(report);
            }
            ReportPayload::Inodes(report) => self.inodes = Some(report),
            ReportPayload::Block(mut report) => {
                report.blocks.sort_by_key(|block| block.index);
                self.blocks = Some(report);
            }
            ReportPayload::BitmapInode(text) => self.bitmap_inode = Some(text),
            ReportPayload::BitmapBlock(text) => self.bitmap_block = Some(text),
            ReportPayload::Tree(report) => {
                self.tree_selection = report.initial_selection();
                self.tree = Some(report);
            }
            ReportPayload::Superblock(report) => self.superblock = Some(report),
            ReportPayload::Listing(report) => self.listing = Some(report),
            ReportPayload::Journaling(rows) => self.journal = Some(rows),
            // Opened through the content opener, never displayed inline.
            ReportPayload::File(_) => {}
        }
    }

    /// Closes one report surface and its derived state.
    pub fn dismiss(&mut self, kind: ReportKind) {
        match kind {
            ReportKind::Mbr => self.mbr = None,
            ReportKind::Disk => {
                self.disk = None;
                self.disk_tiles.clear();
                self.extended_tiles.clear();
            }
            ReportKind::Inode => {
                self.inode = None;
                self.inode_runs.clear();
            }
            ReportKind::Inodes => {
                self.inodes = None;
                self.inode_runs.clear();
                self.inode_chain.clear();
                self.inode_root = None;
                self.inode_selected = None;
            }
            ReportKind::Block => self.blocks = None,
            ReportKind::BitmapInode => self.bitmap_inode = None,
            ReportKind::BitmapBlock => self.bitmap_block = None,
            ReportKind::Tree => {
                self.tree = None;
                self.tree_selection = None;
            }
            ReportKind::Superblock => self.superblock = None,
            ReportKind::Listing => self.listing = None,
            ReportKind::Journaling => self.journal = None,
            ReportKind::File => {}
        }
        self.pending.retain(|pending| *pending != kind);
    }
}
