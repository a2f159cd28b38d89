// Comment extraction from SourceCodeInfo
//
// The frontend records a location for every element of a file, addressed
// by a path of alternating field numbers and indexes. Leading comments are
// indexed here under that path so declarations can carry their original
// documentation into the generated source.

use std::collections::HashMap;

use crate::codegen::printer::Printer;
use crate::descriptor::FileDescriptorProto;

// Field numbers in FileDescriptorProto, the roots of location paths.
pub const PACKAGE_PATH: i32 = 2;
pub const MESSAGE_PATH: i32 = 4;
pub const ENUM_PATH: i32 = 5;

// Field numbers within DescriptorProto.
pub const MESSAGE_FIELD_PATH: i32 = 2;
pub const MESSAGE_MESSAGE_PATH: i32 = 3;
pub const MESSAGE_ENUM_PATH: i32 = 4;
pub const MESSAGE_ONEOF_PATH: i32 = 8;

// Field numbers within EnumDescriptorProto.
pub const ENUM_VALUE_PATH: i32 = 2;

/// Renders a location path as a lookup key: `[4, 2, 3, 0]` to `"4,2,3,0"`.
pub fn path_key(path: &[i32]) -> String {
    let parts: Vec<String> = path.iter().map(|n| n.to_string()).collect();
    parts.join(",")
}

/// Appends one field-number/index pair to an existing key.
pub fn child_key(parent: &str, field: i32, index: usize) -> String {
    format!("{parent},{field},{index}")
}

/// Collects the leading comments of a file, keyed by location path.
pub fn extract(file: &FileDescriptorProto) -> HashMap<String, String> {
    let mut comments = HashMap::new();

    let Some(info) = &file.source_code_info else {
        return comments;
    };

    for location in &info.location {
        let Some(text) = &location.leading_comments else {
            continue;
        };
        comments.insert(path_key(&location.path), text.clone());
    }

    comments
}

/// Writes the comment stored under `path`, if any, as `//` lines. One
/// leading space per line is dropped since proto comments usually arrive
/// as `" text"`.
pub fn print(w: &mut Printer, comments: &HashMap<String, String>, path: &str) -> bool {
    let Some(text) = comments.get(path) else {
        return false;
    };
    for line in text.trim_end_matches('\n').split('\n') {
        let line = line.strip_prefix(' ').unwrap_or(line);
        if line.is_empty() {
            w.line("//");
        } else {
            w.line(format!("// {line}"));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Location, SourceCodeInfo};

    fn file_with_comments() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("commented.proto".to_string()),
            source_code_info: Some(SourceCodeInfo {
                location: vec![
                    Location {
                        path: vec![MESSAGE_PATH, 0],
                        leading_comments: Some(" A message.\n And more.\n".to_string()),
                        ..Default::default()
                    },
                    Location {
                        path: vec![MESSAGE_PATH, 0, MESSAGE_FIELD_PATH, 1],
                        leading_comments: Some(" The second field.\n".to_string()),
                        ..Default::default()
                    },
                    Location {
                        // Trailing only, should not be indexed.
                        path: vec![ENUM_PATH, 0],
                        trailing_comments: Some(" trailing".to_string()),
                        ..Default::default()
                    },
                ],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_keys_by_path() {
        let comments = extract(&file_with_comments());
        assert_eq!(comments.len(), 2);
        assert_eq!(comments["4,0"], " A message.\n And more.\n");
        assert_eq!(comments["4,0,2,1"], " The second field.\n");
        assert!(!comments.contains_key("5,0"));
    }

    #[test]
    fn test_print_strips_one_leading_space() {
        let comments = extract(&file_with_comments());
        let mut w = Printer::new();
        assert!(print(&mut w, &comments, "4,0"));
        assert_eq!(w.as_str(), "// A message.\n// And more.\n");
        assert!(!print(&mut w, &comments, "4,9"));
    }

    #[test]
    fn test_child_key() {
        assert_eq!(child_key("4,0", MESSAGE_MESSAGE_PATH, 2), "4,0,3,2");
        assert_eq!(path_key(&[MESSAGE_PATH, 1]), "4,1");
    }
}
