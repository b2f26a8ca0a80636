use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::listing::{DirectoryListing, FindQuery};
use crate::mounts::MountRecord;

/// Literal shown when no error detail survives the fallback chain.
pub const UNKNOWN_ERROR_MESSAGE: &str = "desconocido";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates the report kinds the backend can render.
pub enum ReportKind {
    Mbr,
    Disk,
    Inode,
    Inodes,
    Block,
    #[serde(rename = "bm_inode")]
    BitmapInode,
    #[serde(rename = "bm_block")]
    BitmapBlock,
    Tree,
    #[serde(rename = "sb")]
    Superblock,
    #[serde(rename = "ls")]
    Listing,
    File,
    Journaling,
}

impl ReportKind {
    pub const ALL: [ReportKind; 12] = [
        ReportKind::Mbr,
        ReportKind::Disk,
        ReportKind::Inode,
        ReportKind::Inodes,
        ReportKind::Block,
        ReportKind::BitmapInode,
        ReportKind::BitmapBlock,
        ReportKind::Tree,
        ReportKind::Superblock,
        ReportKind::Listing,
        ReportKind::File,
        ReportKind::Journaling,
    ];

    /// Directive and endpoint name (`rep -name=<name>`, `/reports/<name>`).
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Mbr => "mbr",
            ReportKind::Disk => "disk",
            ReportKind::Inode => "inode",
            ReportKind::Inodes => "inodes",
            ReportKind::Block => "block",
            ReportKind::BitmapInode => "bm_inode",
            ReportKind::BitmapBlock => "bm_block",
            ReportKind::Tree => "tree",
            ReportKind::Superblock => "sb",
            ReportKind::Listing => "ls",
            ReportKind::File => "file",
            ReportKind::Journaling => "journaling",
        }
    }

    pub fn from_name(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }

    /// True for kinds the backend answers with raw text instead of JSON.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            ReportKind::BitmapInode | ReportKind::BitmapBlock | ReportKind::File
        )
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Parameters of one report fetch.
pub struct ReportRequest {
    pub kind: ReportKind,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl ReportRequest {
    pub fn new(kind: ReportKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            ruta: None,
            max: None,
        }
    }

    pub fn with_ruta(mut self, ruta: impl Into<String>) -> Self {
        self.ruta = Some(ruta.into());
        self
    }

    pub fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Response body of `POST /exec`.
pub struct ExecResponse {
    #[serde(default)]
    pub output: String,
    /// Structured success flag; preferred over output sniffing when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MbrPartition {
    pub index: i64,
    pub status: String,
    #[serde(rename = "type")]
    pub part_type: String,
    pub fit: String,
    pub raw_status: i64,
    pub raw_type: i64,
    pub raw_fit: i64,
    pub start: i64,
    pub size: i64,
    pub name: String,
    pub usable: bool,
    pub id: Option<String>,
    pub correlative: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MbrReport {
    pub kind: String,
    pub disk_path: String,
    pub created: String,
    pub size_bytes: i64,
    pub signature: i64,
    pub fit: String,
    pub raw_fit: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub partitions: Vec<MbrPartition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// One proportioned slice of a disk (`MBR`, `P`, `E`, `L`, `EBR` or `FREE`).
pub struct DiskSegment {
    pub kind: String,
    pub label: String,
    pub start: i64,
    pub size: i64,
    pub end: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedView {
    pub start: i64,
    pub size: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub segments: Vec<DiskSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiskReport {
    pub kind: String,
    pub disk_path: String,
    pub size_bytes: i64,
    pub mbr_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub segments: Vec<DiskSegment>,
    pub extended: Option<ExtendedView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InodeReport {
    pub kind: String,
    pub disk_path: String,
    pub id: String,
    pub index: i64,
    #[serde(rename = "type")]
    pub inode_type: String,
    pub raw_type: i64,
    pub size: i64,
    pub uid: i64,
    pub gid: i64,
    pub perm: String,
    /// Raw permission bytes, base64-encoded by the backend.
    #[serde(deserialize_with = "null_as_default")]
    pub perm_raw: String,
    pub atime: String,
    pub mtime: String,
    pub ctime: String,
    pub blocks_used: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub blocks: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InodeSummary {
    pub index: i64,
    #[serde(rename = "type")]
    pub inode_type: String,
    pub raw_type: i64,
    pub size: i64,
    pub blocks_used: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InodesReport {
    pub kind: String,
    pub disk_path: String,
    pub id: String,
    pub count: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<InodeSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirEntry {
    pub name: String,
    pub inode: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirBlockView {
    #[serde(deserialize_with = "null_as_default")]
    pub entries: Vec<DirEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBlockView {
    pub size: i64,
    pub preview: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerBlockView {
    #[serde(deserialize_with = "null_as_default")]
    pub pointers: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockItem {
    pub index: i64,
    #[serde(rename = "type")]
    pub block_type: String,
    pub ref_count: i64,
    pub dir: Option<DirBlockView>,
    pub file: Option<FileBlockView>,
    pub ptr: Option<PointerBlockView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockReport {
    pub kind: String,
    pub disk_path: String,
    pub id: String,
    pub block_size: i64,
    pub count: i64,
    pub used: i64,
    #[serde(alias = "items", deserialize_with = "null_as_default")]
    pub blocks: Vec<BlockItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerLevel {
    pub block: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pointers: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerLevel2 {
    pub block: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub groups: Vec<PointerLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlocksView {
    #[serde(deserialize_with = "null_as_default")]
    pub direct: Vec<i64>,
    pub indirect: Option<PointerLevel>,
    pub double_indirect: Option<PointerLevel2>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeBlockCard {
    pub index: i64,
    #[serde(rename = "type")]
    pub block_type: String,
    pub dir: Option<DirBlockView>,
    pub file: Option<FileBlockView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeInode {
    pub index: i64,
    #[serde(rename = "type")]
    pub inode_type: String,
    pub raw_type: i64,
    pub size: i64,
    pub uid: i64,
    pub gid: i64,
    pub perm: String,
    pub blocks: BlocksView,
    #[serde(deserialize_with = "null_as_default")]
    pub blocks_flat: Vec<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub direct_cards: Vec<TreeBlockCard>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeEdge {
    pub parent: i64,
    pub name: String,
    pub child: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeReport {
    pub kind: String,
    pub disk_path: String,
    pub id: String,
    pub block_size: i64,
    pub inodes: i64,
    pub blocks: i64,
    pub used_inodes: i64,
    pub used_blocks: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub blocks_used: Vec<i64>,
    pub root: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub nodes: Vec<TreeInode>,
    #[serde(deserialize_with = "null_as_default")]
    pub edges: Vec<TreeEdge>,
}

impl TreeReport {
    /// Initial selection: the declared root, else the first node.
    pub fn initial_selection(&self) -> Option<i64> {
        self.root.or_else(|| self.nodes.first().map(|node| node.index))
    }

    pub fn node(&self, index: i64) -> Option<&TreeInode> {
        self.nodes.iter().find(|node| node.index == index)
    }

    pub fn edges_from(&self, index: i64) -> impl Iterator<Item = &TreeEdge> {
        self.edges.iter().filter(move |edge| edge.parent == index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuperblockReport {
    pub kind: String,
    pub disk_path: String,
    pub id: String,
    pub block_size: i64,
    pub inodes_count: i64,
    pub blocks_count: i64,
    pub free_inodes: i64,
    pub free_blocks: i64,
    pub inode_size: i64,
    pub bm_inode_start: i64,
    pub bm_block_start: i64,
    pub inode_table_start: i64,
    pub block_start: i64,
    pub bitmap_used_inodes: i64,
    pub bitmap_free_inodes: i64,
    pub bitmap_used_blocks: i64,
    pub bitmap_free_blocks: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LsItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub raw_type: i64,
    pub inode: i64,
    pub size: i64,
    pub perm: String,
    pub uid: i64,
    pub gid: i64,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mtime: String,
    pub atime: String,
    pub ctime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LsReport {
    pub kind: String,
    pub disk_path: String,
    pub id: String,
    pub dir: String,
    /// `None` when the backend omitted the array entirely.
    pub items: Option<Vec<LsItem>>,
}

impl LsReport {
    /// Directories first, then files, then anything else; each group by name.
    pub fn sorted_items(&self) -> Vec<LsItem> {
        fn type_rank(item_type: &str) -> u8 {
            match item_type {
                "dir" => 0,
                "file" => 1,
                _ => 2,
            }
        }
        let mut items = self.items.clone().unwrap_or_default();
        items.sort_by(|left, right| {
            type_rank(&left.item_type)
                .cmp(&type_rank(&right.item_type))
                .then_with(|| left.name.cmp(&right.name))
        });
        items
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalRow {
    pub count: i64,
    pub operation: String,
    pub path: String,
    pub content: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq)]
/// A fetched report tagged by kind.
pub enum ReportPayload {
    Mbr(MbrReport),
    Disk(DiskReport),
    Inode(InodeReport),
    Inodes(InodesReport),
    Block(BlockReport),
    BitmapInode(String),
    BitmapBlock(String),
    Tree(TreeReport),
    Superblock(SuperblockReport),
    Listing(LsReport),
    File(String),
    Journaling(Vec<JournalRow>),
}

impl ReportPayload {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportPayload::Mbr(_) => ReportKind::Mbr,
            ReportPayload::Disk(_) => ReportKind::Disk,
            ReportPayload::Inode(_) => ReportKind::Inode,
            ReportPayload::Inodes(_) => ReportKind::Inodes,
            ReportPayload::Block(_) => ReportKind::Block,
            ReportPayload::BitmapInode(_) => ReportKind::BitmapInode,
            ReportPayload::BitmapBlock(_) => ReportKind::BitmapBlock,
            ReportPayload::Tree(_) => ReportKind::Tree,
            ReportPayload::Superblock(_) => ReportKind::Superblock,
            ReportPayload::Listing(_) => ReportKind::Listing,
            ReportPayload::File(_) => ReportKind::File,
            ReportPayload::Journaling(_) => ReportKind::Journaling,
        }
    }

    /// Decodes a JSON body for `kind`. Text kinds take the body verbatim.
    pub fn decode(kind: ReportKind, raw: &str) -> Result<Self, GoDiskApiError> {
        let payload = match kind {
            ReportKind::BitmapInode => ReportPayload::BitmapInode(raw.to_string()),
            ReportKind::BitmapBlock => ReportPayload::BitmapBlock(raw.to_string()),
            ReportKind::File => ReportPayload::File(raw.to_string()),
            ReportKind::Mbr => ReportPayload::Mbr(decode_json_or_default(raw)?),
            ReportKind::Disk => ReportPayload::Disk(decode_json_or_default(raw)?),
            ReportKind::Inode => ReportPayload::Inode(decode_json_or_default(raw)?),
            ReportKind::Inodes => ReportPayload::Inodes(decode_json_or_default(raw)?),
            ReportKind::Block => ReportPayload::Block(decode_json_or_default(raw)?),
            ReportKind::Tree => ReportPayload::Tree(decode_json_or_default(raw)?),
            ReportKind::Superblock => ReportPayload::Superblock(decode_json_or_default(raw)?),
            ReportKind::Listing => ReportPayload::Listing(decode_json_or_default(raw)?),
            ReportKind::Journaling => ReportPayload::Journaling(decode_json_or_default(raw)?),
        };
        Ok(payload)
    }
}

// `null` and empty bodies decode to the structurally empty value so the
// readiness predicate, not the decoder, decides whether to poll again.
fn decode_json_or_default<T>(raw: &str) -> Result<T, GoDiskApiError>
where
    T: serde::de::DeserializeOwned + Default,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(trimmed)?)
}

// The backend encodes nil slices as `null` inside otherwise valid reports.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Error)]
/// Enumerates supported `GoDiskApiError` values.
pub enum GoDiskApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("operation '{0}' is not supported by this backend")]
    Unsupported(&'static str),
}

impl GoDiskApiError {
    /// Most specific human-readable detail: structured `error` field of the
    /// body, then the raw string body, then the error message, then
    /// [`UNKNOWN_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        if let GoDiskApiError::HttpStatus { body, .. } = self {
            if let Some(structured) = structured_error_field(body) {
                return structured;
            }
            let trimmed = body.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('{') {
                return godisk_core::truncate_for_error(trimmed, 800);
            }
        }
        let message = self.to_string();
        if message.trim().is_empty() {
            return UNKNOWN_ERROR_MESSAGE.to_string();
        }
        message
    }
}

fn structured_error_field(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body.trim()).ok()?;
    let message = value.get("error")?.as_str()?.trim();
    if message.is_empty() {
        return None;
    }
    Some(message.to_string())
}

#[async_trait]
/// Trait contract for the GoDisk HTTP API consumed by the console.
pub trait ConsoleBackend: Send + Sync {
    async fn execute(&self, script: &str) -> Result<ExecResponse, GoDiskApiError>;

    async fn fetch_report(&self, request: &ReportRequest)
        -> Result<ReportPayload, GoDiskApiError>;

    async fn list_mounts(&self) -> Result<Vec<MountRecord>, GoDiskApiError> {
        Err(GoDiskApiError::Unsupported("list_mounts"))
    }

    async fn find(&self, query: &FindQuery) -> Result<DirectoryListing, GoDiskApiError> {
        let _ = query;
        Err(GoDiskApiError::Unsupported("find"))
    }

    async fn list_directory(&self, id: &str, ruta: &str) -> Result<LsReport, GoDiskApiError> {
        let _ = (id, ruta);
        Err(GoDiskApiError::Unsupported("list_directory"))
    }

    /// Location a viewer can open to show the `file` report outside the console.
    fn file_location(&self, id: &str, ruta: &str) -> String {
        format!("reports/file?id={id}&ruta={ruta}")
    }
}
