// Identifier construction and collision handling for generated Go.

use std::collections::HashSet;

/// Go keywords that may not be used as package names.
const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Method names every generated message's struct already carries. Field
/// identifiers must be allocated around these.
pub const RESERVED_METHODS: &[&str] = &[
    "Reset",
    "String",
    "ProtoMessage",
    "Marshal",
    "Unmarshal",
    "ExtensionRangeArray",
    "ExtensionMap",
    "Descriptor",
];

pub fn is_go_keyword(name: &str) -> bool {
    GO_KEYWORDS.contains(&name)
}

/// Replaces every character that cannot appear in an identifier with an
/// underscore.
pub fn sanitize_package_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphabetic() || c.is_numeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The file name stripped of directory and trailing extension:
/// `dir/foo.proto` becomes `foo`.
pub fn base_name(name: &str) -> &str {
    let name = match name.rfind('/') {
        Some(i) => &name[i + 1..],
        None => name,
    };
    match name.rfind('.') {
        Some(i) => &name[..i],
        None => name,
    }
}

/// Converts a proto identifier to the exported Go form.
///
/// A leading underscore becomes `X` so the result stays exported. An
/// interior underscore followed by a lowercase letter is dropped and the
/// letter capitalized; any other underscore is kept. There is no complete
/// solution here since `foo_bar` and `fooBar` still collide, but the cases
/// that matter in practice come out readable.
pub fn camel_case(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let s = name.as_bytes();
    let mut t = Vec::with_capacity(s.len());
    let mut i = 0;
    if s[0] == b'_' {
        // Keep the result exported.
        t.push(b'X');
        i = 1;
    }
    while i < s.len() {
        let c = s[i];
        if c == b'_' && i + 1 < s.len() && s[i + 1].is_ascii_lowercase() {
            // Skip the underscore in the name.
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            t.push(c);
            i += 1;
            continue;
        }
        // Assume we have a letter; upper it if lowercase, then absorb the
        // run of lowercase letters that follows.
        t.push(if c.is_ascii_lowercase() { c ^ b' ' } else { c });
        i += 1;
        while i < s.len() && s[i].is_ascii_lowercase() {
            t.push(s[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&t).into_owned()
}

/// Camel-cases a qualified name, treating the separators as underscores:
/// `["Outer", "inner"]` becomes `Outer_Inner`.
pub fn camel_case_slice(elems: &[String]) -> String {
    camel_case(&elems.join("_"))
}

/// The Go package name derived from an import path given on the command
/// line: the last path element, cleaned up and guarded against keywords and
/// leading digits.
pub fn default_package_name(import_path: &str) -> String {
    let elem = match import_path.rfind('/') {
        Some(i) => &import_path[i + 1..],
        None => import_path,
    };
    if elem.is_empty() {
        return String::new();
    }
    let mut name = sanitize_package_name(elem);
    if is_go_keyword(&name) {
        name.insert(0, '_');
    }
    if name.chars().next().is_some_and(|c| c.is_numeric()) {
        name.insert(0, '_');
    }
    name
}

/// Allocates unique package names for the whole compilation. Colliding
/// candidates are disambiguated with a numeric suffix, in registration
/// order.
#[derive(Default)]
pub struct PackageRegistry {
    in_use: HashSet<String>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique(&mut self, candidate: &str) -> String {
        let base = sanitize_package_name(candidate);
        let mut name = base.clone();
        let mut i = 1;
        while self.in_use.contains(&name) {
            name = format!("{base}{i}");
            i += 1;
        }
        self.in_use.insert(name.clone());
        name
    }
}

/// The declaration namespace of one generated struct.
///
/// A field claims its struct member and getter names as one batch: if any
/// candidate is taken, every name in the batch grows a trailing underscore
/// and the whole batch is retried, so related identifiers stay in sync.
pub struct IdentSet {
    used: HashSet<String>,
}

impl IdentSet {
    pub fn for_message() -> Self {
        Self {
            used: RESERVED_METHODS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn alloc(&mut self, candidates: &[String]) -> Vec<String> {
        let mut names = candidates.to_vec();
        loop {
            if names.iter().any(|n| self.used.contains(n)) {
                for n in &mut names {
                    n.push('_');
                }
                continue;
            }
            for n in &names {
                self.used.insert(n.clone());
            }
            return names;
        }
    }

    pub fn alloc_one(&mut self, candidate: &str) -> String {
        self.alloc(&[candidate.to_string()]).swap_remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        for (input, want) in [
            ("", ""),
            ("one", "One"),
            ("one_two", "OneTwo"),
            ("_my_field_name_2", "XMyFieldName_2"),
            ("Something_Capped", "Something_Capped"),
            ("my_Name", "My_Name"),
            ("OneTwo", "OneTwo"),
            ("_", "X"),
            ("_a_", "XA_"),
            ("a_1", "A_1"),
        ] {
            assert_eq!(camel_case(input), want, "camel_case({input:?})");
        }
    }

    #[test]
    fn test_camel_case_slice() {
        let elems = vec!["Outer".to_string(), "inner_most".to_string()];
        assert_eq!(camel_case_slice(&elems), "Outer_InnerMost");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("dir/sub/file.proto"), "file");
        assert_eq!(base_name("file.pb.proto"), "file.pb");
        assert_eq!(base_name("bare"), "bare");
    }

    #[test]
    fn test_sanitize_package_name() {
        assert_eq!(sanitize_package_name("my-pkg.v1"), "my_pkg_v1");
        assert_eq!(sanitize_package_name("ok_name"), "ok_name");
    }

    #[test]
    fn test_default_package_name() {
        assert_eq!(default_package_name("github.com/acme/widget"), "widget");
        assert_eq!(default_package_name("vendor/import"), "_import");
        assert_eq!(default_package_name("a/1st"), "_1st");
        assert_eq!(default_package_name(""), "");
    }

    #[test]
    fn test_package_registry_suffixes_collisions() {
        let mut reg = PackageRegistry::new();
        assert_eq!(reg.unique("proto"), "proto");
        assert_eq!(reg.unique("web-app"), "web_app");
        assert_eq!(reg.unique("proto"), "proto1");
        assert_eq!(reg.unique("proto"), "proto2");
        // A candidate that sanitizes onto an occupied name also moves on.
        assert_eq!(reg.unique("web.app"), "web_app1");
    }

    #[test]
    fn test_ident_set_renames_batch_together() {
        let mut idents = IdentSet::for_message();
        // "String" is already reserved for the method set, so the member
        // and its getter both pick up the underscore.
        let names = idents.alloc(&["String".to_string(), "GetString".to_string()]);
        assert_eq!(names, vec!["String_".to_string(), "GetString_".to_string()]);
        // A second field named string_ collides with the renamed member.
        let names = idents.alloc(&["String_".to_string(), "GetString_".to_string()]);
        assert_eq!(
            names,
            vec!["String__".to_string(), "GetString__".to_string()]
        );
    }

    #[test]
    fn test_ident_set_plain_allocation() {
        let mut idents = IdentSet::for_message();
        assert_eq!(idents.alloc_one("Value"), "Value");
        assert_eq!(idents.alloc_one("Value"), "Value_");
    }
}
