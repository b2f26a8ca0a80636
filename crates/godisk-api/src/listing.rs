use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Query for `/fs/find`. With `id` the backend answers pre-split `dirs`/`files`;
/// without it, a flat list of matching paths under `ruta`.
pub struct FindQuery {
    pub id: Option<String>,
    pub ruta: String,
    pub name: Option<String>,
}

impl FindQuery {
    pub fn for_mount(id: impl Into<String>, ruta: &str) -> Self {
        Self {
            id: Some(id.into()),
            ruta: normalize_path(ruta),
            name: None,
        }
    }

    pub fn by_name(ruta: &str, name: impl Into<String>) -> Self {
        Self {
            id: None,
            ruta: normalize_path(ruta),
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Immediate children of one directory, names only.
pub struct DirectoryListing {
    pub ruta: String,
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

impl DirectoryListing {
    pub fn dir_paths(&self) -> Vec<String> {
        self.dirs
            .iter()
            .map(|name| join_path(&self.ruta, name))
            .collect()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|name| join_path(&self.ruta, name))
            .collect()
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let rows = value?.as_array()?;
    Some(
        rows.iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
    )
}

/// Normalizes either `/fs/find` response shape into a [`DirectoryListing`].
///
/// The flat shape lists every matching descendant path; only immediate
/// children of `ruta` are kept, and a child counts as a directory when some
/// other listed path lies beneath it.
pub fn normalize_find_response(ruta: &str, value: &Value) -> DirectoryListing {
    let ruta = normalize_path(ruta);
    if let (Some(dirs), Some(files)) = (
        string_list(value.get("dirs")),
        string_list(value.get("files")),
    ) {
        return DirectoryListing { ruta, dirs, files };
    }

    let items = string_list(value.get("items")).unwrap_or_default();
    let prefix = if ruta == "/" {
        "/".to_string()
    } else {
        format!("{ruta}/")
    };
    let mut children = BTreeSet::new();
    let mut dirs = BTreeSet::new();
    for item in items {
        let item = normalize_path(&item);
        let Some(rest) = item.strip_prefix(prefix.as_str()) else {
            continue;
        };
        match rest.split_once('/') {
            Some((head, _)) if !head.is_empty() => {
                dirs.insert(head.to_string());
                children.insert(head.to_string());
            }
            None if !rest.is_empty() => {
                children.insert(rest.to_string());
            }
            _ => {}
        }
    }
    let files = children
        .iter()
        .filter(|name| !dirs.contains(*name))
        .cloned()
        .collect();
    DirectoryListing {
        ruta,
        dirs: dirs.into_iter().collect(),
        files,
    }
}

/// Canonical absolute path: `\` becomes `/`, repeated `/` collapse, a leading
/// `/` is enforced and a trailing one dropped.
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }
    let segments = trimmed
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    format!("/{}", segments.join("/"))
}

pub fn join_path(dir: &str, name: &str) -> String {
    let dir = normalize_path(dir);
    let name = name.trim_start_matches('/');
    if dir == "/" {
        normalize_path(&format!("/{name}"))
    } else {
        normalize_path(&format!("{dir}/{name}"))
    }
}

pub fn parent_path(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent.to_string(),
        _ => "/".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    pub abs: String,
}

pub fn path_breadcrumbs(path: &str) -> Vec<Breadcrumb> {
    let normalized = normalize_path(path);
    let mut crumbs = vec![Breadcrumb {
        label: "/".to_string(),
        abs: "/".to_string(),
    }];
    let mut acc = String::new();
    for segment in normalized.split('/').filter(|segment| !segment.is_empty()) {
        acc.push('/');
        acc.push_str(segment);
        crumbs.push(Breadcrumb {
            label: segment.to_string(),
            abs: acc.clone(),
        });
    }
    crumbs
}
