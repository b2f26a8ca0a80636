use crate::types::{
    BlockReport, DiskReport, InodeReport, InodesReport, JournalRow, LsReport, MbrReport,
    ReportPayload, SuperblockReport, TreeReport,
};

/// Kind-specific check separating a materialized report from one the backend
/// has not finished computing.
pub trait ReportReadiness {
    fn is_ready(&self) -> bool;
}

pub fn text_is_ready(text: &str) -> bool {
    !text.trim().is_empty()
}

impl ReportReadiness for MbrReport {
    fn is_ready(&self) -> bool {
        !self.partitions.is_empty()
    }
}

impl ReportReadiness for DiskReport {
    fn is_ready(&self) -> bool {
        !self.segments.is_empty()
    }
}

impl ReportReadiness for InodeReport {
    fn is_ready(&self) -> bool {
        self.blocks_used > 0
    }
}

impl ReportReadiness for InodesReport {
    fn is_ready(&self) -> bool {
        !self.items.is_empty()
    }
}

impl ReportReadiness for BlockReport {
    fn is_ready(&self) -> bool {
        !self.blocks.is_empty()
    }
}

impl ReportReadiness for TreeReport {
    fn is_ready(&self) -> bool {
        !self.nodes.is_empty()
    }
}

impl ReportReadiness for SuperblockReport {
    fn is_ready(&self) -> bool {
        self.kind == "sb"
    }
}

impl ReportReadiness for LsReport {
    // An empty directory is a valid answer; only a missing array is not.
    fn is_ready(&self) -> bool {
        self.items.is_some()
    }
}

impl ReportReadiness for Vec<JournalRow> {
    fn is_ready(&self) -> bool {
        !self.is_empty()
    }
}

impl ReportReadiness for ReportPayload {
    fn is_ready(&self) -> bool {
        match self {
            ReportPayload::Mbr(report) => report.is_ready(),
            ReportPayload::Disk(report) => report.is_ready(),
            ReportPayload::Inode(report) => report.is_ready(),
            ReportPayload::Inodes(report) => report.is_ready(),
            ReportPayload::Block(report) => report.is_ready(),
            ReportPayload::BitmapInode(text)
            | ReportPayload::BitmapBlock(text)
            | ReportPayload::File(text) => text_is_ready(text),
            ReportPayload::Tree(report) => report.is_ready(),
            ReportPayload::Superblock(report) => report.is_ready(),
            ReportPayload::Listing(report) => report.is_ready(),
            ReportPayload::Journaling(rows) => rows.is_ready(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{text_is_ready, ReportReadiness};
    use crate::types::{
        InodeReport, LsReport, MbrPartition, MbrReport, ReportPayload, SuperblockReport,
    };

    #[test]
    fn unit_text_readiness_ignores_whitespace_only_bodies() {
        assert!(!text_is_ready(""));
        assert!(!text_is_ready(" \n\t"));
        assert!(text_is_ready("0101"));
    }

    #[test]
    fn unit_mbr_and_inode_readiness_follow_structural_content() {
        let mut mbr = MbrReport::default();
        assert!(!mbr.is_ready());
        mbr.partitions.push(MbrPartition::default());
        assert!(mbr.is_ready());

        let mut inode = InodeReport::default();
        assert!(!inode.is_ready());
        inode.blocks_used = 1;
        assert!(inode.is_ready());
    }

    #[test]
    fn regression_ls_readiness_accepts_empty_directory_but_not_missing_items() {
        let missing = LsReport::default();
        assert!(!missing.is_ready());
        let empty = LsReport {
            items: Some(Vec::new()),
            ..LsReport::default()
        };
        assert!(empty.is_ready());
    }

    #[test]
    fn functional_payload_readiness_dispatches_per_kind() {
        let sb = SuperblockReport {
            kind: "sb".to_string(),
            ..SuperblockReport::default()
        };
        assert!(ReportPayload::Superblock(sb).is_ready());
        assert!(!ReportPayload::Superblock(SuperblockReport::default()).is_ready());
        assert!(!ReportPayload::BitmapBlock("   ".to_string()).is_ready());
        assert!(!ReportPayload::Journaling(Vec::new()).is_ready());
    }
}
