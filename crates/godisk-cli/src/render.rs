use std::collections::BTreeSet;
use std::fmt::Write as _;

use godisk_api::{
    BlockItem, DirectoryListing, JournalRow, LsItem, MountRecord, SuperblockReport, TreeReport,
};
use godisk_console::{
    contiguous_runs, format_runs, ConsoleSurfaces, Tile, FREE_TILE_KIND, NO_MOUNTS_PLACEHOLDER,
};

const TILE_ROW_WIDTH: usize = 50;

fn tile_glyph(kind: &str) -> char {
    match kind.to_ascii_uppercase().as_str() {
        "MBR" => 'M',
        "P" | "PRIMARY" => 'P',
        "E" | "EXTENDED" => 'E',
        "L" | "LOGICAL" => 'L',
        "EBR" => 'B',
        FREE_TILE_KIND => '.',
        _ => '?',
    }
}

fn render_tiles(out: &mut String, title: &str, tiles: &[Tile]) {
    let _ = writeln!(out, "{title}");
    let glyphs = tiles
        .iter()
        .map(|tile| tile_glyph(&tile.kind))
        .collect::<Vec<_>>();
    for row in glyphs.chunks(TILE_ROW_WIDTH) {
        let _ = writeln!(out, "  {}", row.iter().collect::<String>());
    }
    let mut seen = BTreeSet::new();
    for tile in tiles {
        if seen.insert(tile.tip.as_str()) {
            let _ = writeln!(out, "  {} {}", tile_glyph(&tile.kind), tile.tip);
        }
    }
}

fn render_block(out: &mut String, block: &BlockItem) {
    let _ = writeln!(
        out,
        "  #{:<5} {:<8} refs={}",
        block.index, block.block_type, block.ref_count
    );
    if let Some(dir) = &block.dir {
        for entry in &dir.entries {
            let _ = writeln!(out, "      {:<14} -> inode {}", entry.name, entry.inode);
        }
    }
    if let Some(file) = &block.file {
        let _ = writeln!(out, "      {} bytes: {:?}", file.size, file.preview);
    }
    if let Some(ptr) = &block.ptr {
        let pointers = ptr
            .pointers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "      pointers: {pointers}");
    }
}

fn render_tree(out: &mut String, tree: &TreeReport, selection: Option<i64>) {
    let _ = writeln!(
        out,
        "TREE {}  inodes={} blocks={} block_size={}",
        tree.disk_path, tree.inodes, tree.blocks, tree.block_size
    );
    let Some(node) = selection.and_then(|index| tree.node(index)) else {
        return;
    };
    let _ = writeln!(
        out,
        "  selected #{} {} size={} uid={} gid={} perm={}",
        node.index, node.inode_type, node.size, node.uid, node.gid, node.perm
    );
    let _ = writeln!(out, "  blocks: {}", format_runs(&contiguous_runs(&node.blocks_flat)));
    for edge in tree.edges_from(node.index) {
        let _ = writeln!(out, "    {} -> #{}", edge.name, edge.child);
    }
}

fn render_superblock(out: &mut String, sb: &SuperblockReport) {
    let _ = writeln!(out, "SUPERBLOCK {} ({})", sb.disk_path, sb.id);
    let rows = [
        ("block_size", sb.block_size),
        ("inodes_count", sb.inodes_count),
        ("blocks_count", sb.blocks_count),
        ("free_inodes", sb.free_inodes),
        ("free_blocks", sb.free_blocks),
        ("inode_size", sb.inode_size),
        ("bm_inode_start", sb.bm_inode_start),
        ("bm_block_start", sb.bm_block_start),
        ("inode_table_start", sb.inode_table_start),
        ("block_start", sb.block_start),
        ("bitmap_used_inodes", sb.bitmap_used_inodes),
        ("bitmap_free_inodes", sb.bitmap_free_inodes),
        ("bitmap_used_blocks", sb.bitmap_used_blocks),
        ("bitmap_free_blocks", sb.bitmap_free_blocks),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "  {label:<20} {value}");
    }
}

pub(crate) fn render_ls_items(out: &mut String, items: &[LsItem]) {
    if items.is_empty() {
        let _ = writeln!(out, "  (vacío)");
        return;
    }
    for item in items {
        let owner = item.owner.clone().unwrap_or_else(|| item.uid.to_string());
        let group = item.group.clone().unwrap_or_else(|| item.gid.to_string());
        let _ = writeln!(
            out,
            "  {:<4} {:<4} {:<8} {:<8} {:>8} {:<20} {}",
            item.item_type, item.perm, owner, group, item.size, item.mtime, item.name
        );
    }
}

fn render_journal(out: &mut String, rows: &[JournalRow]) {
    let _ = writeln!(out, "JOURNAL");
    if rows.is_empty() {
        let _ = writeln!(out, "  (sin entradas)");
    }
    for row in rows {
        let _ = writeln!(
            out,
            "  {:>3} {:<10} {:<24} {:<20} {}",
            row.count, row.operation, row.path, row.date, row.content
        );
    }
}

/// Plain-text rendering of every populated surface, output first.
pub(crate) fn render_surfaces(surfaces: &ConsoleSurfaces) -> String {
    let mut out = String::new();
    if !surfaces.output.is_empty() {
        let _ = writeln!(out, "{}", surfaces.prefixed_output());
    }

    if let Some(mbr) = &surfaces.mbr {
        let _ = writeln!(
            out,
            "MBR {}  size={} signature={} fit={} created={}",
            mbr.disk_path, mbr.size_bytes, mbr.signature, mbr.fit, mbr.created
        );
        for partition in &mbr.partitions {
            let _ = writeln!(
                out,
                "  #{} {:<2} {:<3} {:<8} start={:<10} size={:<10} {} {}",
                partition.index,
                partition.part_type,
                partition.fit,
                partition.status,
                partition.start,
                partition.size,
                partition.name,
                partition.id.as_deref().unwrap_or("-")
            );
        }
    }

    if let Some(disk) = &surfaces.disk {
        render_tiles(
            &mut out,
            &format!("DISK {}  size={}", disk.disk_path, disk.size_bytes),
            &surfaces.disk_tiles,
        );
        if !surfaces.extended_tiles.is_empty() {
            render_tiles(&mut out, "EXTENDED", &surfaces.extended_tiles);
        }
    }

    if let Some(inode) = &surfaces.inode {
        let _ = writeln!(
            out,
            "INODE #{} {} size={} uid={} gid={} perm={} blocks_used={}",
            inode.index,
            inode.inode_type,
            inode.size,
            inode.uid,
            inode.gid,
            inode.perm,
            inode.blocks_used
        );
        let _ = writeln!(out, "  blocks: {}", format_runs(&surfaces.inode_runs));
        let _ = writeln!(
            out,
            "  atime={} mtime={} ctime={}",
            inode.atime, inode.mtime, inode.ctime
        );
    }

    if let Some(inodes) = &surfaces.inodes {
        let _ = writeln!(out, "INODES {} ({} in use)", inodes.disk_path, inodes.count);
        for item in &inodes.items {
            let _ = writeln!(
                out,
                "  #{:<5} {:<6} size={:<8} blocks_used={}",
                item.index, item.inode_type, item.size, item.blocks_used
            );
        }
        if !surfaces.inode_chain.is_empty() {
            let chain = surfaces
                .inode_chain
                .iter()
                .map(|inode| format!("#{}", inode.index))
                .collect::<Vec<_>>()
                .join(" -> ");
            let _ = writeln!(out, "  chain: {chain}");
        }
        for (label, inode) in [
            ("root", &surfaces.inode_root),
            ("selected", &surfaces.inode_selected),
        ] {
            if let Some(inode) = inode {
                let _ = writeln!(
                    out,
                    "  {label}: #{} {} size={}",
                    inode.index, inode.inode_type, inode.size
                );
            }
        }
        if surfaces.inode_selected.is_some() && !surfaces.inode_runs.is_empty() {
            let _ = writeln!(out, "  selected blocks: {}", format_runs(&surfaces.inode_runs));
        }
    }

    if let Some(blocks) = &surfaces.blocks {
        let _ = writeln!(
            out,
            "BLOCKS {}  used={}/{} block_size={}",
            blocks.disk_path, blocks.used, blocks.count, blocks.block_size
        );
        for block in &blocks.blocks {
            render_block(&mut out, block);
        }
    }

    for (title, bitmap) in [
        ("BITMAP INODES", &surfaces.bitmap_inode),
        ("BITMAP BLOCKS", &surfaces.bitmap_block),
    ] {
        if let Some(bitmap) = bitmap {
            let _ = writeln!(out, "{title}");
            let _ = writeln!(out, "{}", bitmap.trim_end());
        }
    }

    if let Some(tree) = &surfaces.tree {
        render_tree(&mut out, tree, surfaces.tree_selection);
    }

    if let Some(sb) = &surfaces.superblock {
        render_superblock(&mut out, sb);
    }

    if let Some(listing) = &surfaces.listing {
        let _ = writeln!(out, "LS {} {}", listing.id, listing.dir);
        render_ls_items(&mut out, &listing.sorted_items());
    }

    if let Some(rows) = &surfaces.journal {
        render_journal(&mut out, rows);
    }

    if !surfaces.pending.is_empty() {
        let kinds = surfaces
            .pending
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "(sin datos aún: {kinds})");
    }
    out
}

pub(crate) fn render_mounts(mounts: &[MountRecord]) -> String {
    if mounts.is_empty() {
        return format!("{NO_MOUNTS_PLACEHOLDER}\n");
    }
    let mut out = String::new();
    for mount in mounts {
        let _ = writeln!(
            out,
            "{:<8} {:<12} {:<16} start={} size={}",
            mount.id,
            mount.name.as_deref().unwrap_or("-"),
            mount.disk_base_name(),
            mount
                .start
                .map(|start| start.to_string())
                .unwrap_or_else(|| "-".to_string()),
            mount
                .size
                .map(|size| size.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    out
}

pub(crate) fn render_directory(listing: &DirectoryListing) -> String {
    let mut out = String::new();
    let crumbs = godisk_api::path_breadcrumbs(&listing.ruta)
        .into_iter()
        .map(|crumb| crumb.label)
        .collect::<Vec<_>>();
    let _ = writeln!(out, "{}", crumbs.join(" › "));
    for dir in &listing.dirs {
        let _ = writeln!(out, "  {dir}/");
    }
    for file in &listing.files {
        let _ = writeln!(out, "  {file}");
    }
    if listing.dirs.is_empty() && listing.files.is_empty() {
        let _ = writeln!(out, "  (vacío)");
    }
    out
}
