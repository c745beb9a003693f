//! Flattening of the bookmark tree into URL records

use crate::types::{BookmarkId, BookmarkNode, BookmarkRecord, NodeKind};

/// Collect every URL bookmark below `roots` in document order.
///
/// Folders are not emitted; their titles become the `path` of the
/// records below them. Untitled folders (the invisible root) add no
/// path segment.
pub fn flatten(roots: &[BookmarkNode]) -> Vec<BookmarkRecord> {
    let mut records = Vec::new();
    let mut path = Vec::new();
    for root in roots {
        flatten_node(root, &mut path, &mut records);
    }
    records
}

fn flatten_node(node: &BookmarkNode, path: &mut Vec<String>, out: &mut Vec<BookmarkRecord>) {
    match &node.kind {
        NodeKind::Url { url, date_last_used } => out.push(BookmarkRecord {
            id: node.id.clone(),
            title: node.title.clone(),
            url: url.clone(),
            path: path.clone(),
            date_added: node.date_added,
            date_last_used: *date_last_used,
        }),
        NodeKind::Folder { children, .. } => {
            let named = !node.title.is_empty();
            if named {
                path.push(node.title.clone());
            }
            for child in children {
                flatten_node(child, path, out);
            }
            if named {
                path.pop();
            }
        }
    }
}

/// Ids of every folder below `roots`, roots included
pub fn folder_ids(roots: &[BookmarkNode]) -> Vec<BookmarkId> {
    let mut ids = Vec::new();
    let mut stack: Vec<&BookmarkNode> = roots.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if let NodeKind::Folder { children, .. } = &node.kind {
            ids.push(node.id.clone());
            stack.extend(children.iter().rev());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(id: &str, title: &str, url: &str) -> BookmarkNode {
        BookmarkNode {
            id: BookmarkId::from(id),
            parent_id: None,
            index: 0,
            title: title.to_string(),
            date_added: Some(1_700_000_000_000),
            kind: NodeKind::Url {
                url: url.to_string(),
                date_last_used: None,
            },
        }
    }

    fn folder(id: &str, title: &str, children: Vec<BookmarkNode>) -> BookmarkNode {
        BookmarkNode {
            id: BookmarkId::from(id),
            parent_id: None,
            index: 0,
            title: title.to_string(),
            date_added: None,
            kind: NodeKind::Folder {
                children,
                date_group_modified: None,
            },
        }
    }

    #[test]
    fn test_flatten_preserves_document_order_and_paths() {
        let tree = folder(
            "0",
            "",
            vec![
                folder(
                    "1",
                    "Bookmarks bar",
                    vec![
                        url("10", "Rust", "https://rust-lang.org"),
                        folder("11", "Docs", vec![url("12", "docs.rs", "https://docs.rs")]),
                    ],
                ),
                folder("2", "Other bookmarks", vec![url("20", "Crates", "https://crates.io")]),
            ],
        );

        let records = flatten(&[tree]);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "12", "20"]);
        assert_eq!(records[0].path, vec!["Bookmarks bar"]);
        assert_eq!(records[1].path, vec!["Bookmarks bar", "Docs"]);
        assert_eq!(records[2].display_path(), "Other bookmarks");
        assert_eq!(records[0].date_added, Some(1_700_000_000_000));
    }

    #[test]
    fn test_flatten_empty_folders() {
        let tree = folder("0", "", vec![folder("1", "Empty", vec![])]);
        assert!(flatten(&[tree]).is_empty());
    }

    #[test]
    fn test_folder_ids_in_document_order() {
        let tree = folder(
            "0",
            "",
            vec![
                folder("1", "Bookmarks bar", vec![folder("11", "Docs", vec![])]),
                url("10", "Rust", "https://rust-lang.org"),
                folder("2", "Other bookmarks", vec![]),
            ],
        );

        let ids: Vec<_> = folder_ids(&[tree]).into_iter().map(|id| id.0).collect();
        assert_eq!(ids, vec!["0", "1", "11", "2"]);
    }
}
