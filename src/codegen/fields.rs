// Field typing and struct tags
//
// Maps descriptor field kinds onto Go types and wire-format names, and
// renders the backtick struct tags the runtime parses at registration
// time. Default values ride in the tag in their original textual form;
// bytes defaults additionally need their C escaping undone before they can
// become Go literals.

use anyhow::{Result, bail};

use crate::codegen::model::{FileId, MessageNode, ObjectId};
use crate::codegen::{Generator, enums, names};
use crate::descriptor::{FieldDescriptorProto, FieldType};

/// Scalar types as far as packed encoding is concerned: everything with a
/// fixed-size or varint wire form, enums included.
pub fn is_scalar(field: &FieldDescriptorProto) -> bool {
    matches!(
        field.field_type(),
        FieldType::Double
            | FieldType::Float
            | FieldType::Int64
            | FieldType::Uint64
            | FieldType::Int32
            | FieldType::Fixed64
            | FieldType::Fixed32
            | FieldType::Bool
            | FieldType::Uint32
            | FieldType::Enum
            | FieldType::Sfixed32
            | FieldType::Sfixed64
            | FieldType::Sint32
            | FieldType::Sint64
    )
}

/// Whether the singular Go form of this type is already a reference and
/// needs no pointer for optionality.
pub fn needs_star(typ: FieldType) -> bool {
    !matches!(typ, FieldType::Group | FieldType::Message | FieldType::Bytes)
}

/// Packed encoding applies when asked for explicitly, and by default to
/// repeated scalars in proto3 files.
pub fn is_packed(field: &FieldDescriptorProto, proto3: bool) -> bool {
    let explicit = field.options.as_ref().and_then(|o| o.packed);
    if explicit == Some(true) {
        return true;
    }
    proto3 && explicit.is_none() && field.is_repeated() && is_scalar(field)
}

/// The Go type for a field together with its wire-format name. `message`
/// is the containing message, or the extended message for an extension;
/// its file decides proto3 pointer rules.
pub fn go_type(
    g: &Generator,
    from: FileId,
    message: Option<&MessageNode>,
    field: &FieldDescriptorProto,
) -> Result<(String, String)> {
    let (mut typ, wire) = match field.field_type() {
        FieldType::Double => ("float64".to_string(), "fixed64"),
        FieldType::Float => ("float32".to_string(), "fixed32"),
        FieldType::Int64 => ("int64".to_string(), "varint"),
        FieldType::Uint64 => ("uint64".to_string(), "varint"),
        FieldType::Int32 => ("int32".to_string(), "varint"),
        FieldType::Uint32 => ("uint32".to_string(), "varint"),
        FieldType::Fixed64 => ("uint64".to_string(), "fixed64"),
        FieldType::Fixed32 => ("uint32".to_string(), "fixed32"),
        FieldType::Bool => ("bool".to_string(), "varint"),
        FieldType::String => ("string".to_string(), "bytes"),
        FieldType::Group => {
            let r = g.resolve(from, field.type_name())?;
            (format!("*{}", g.type_name(&r)), "group")
        }
        FieldType::Message => {
            let r = g.resolve(from, field.type_name())?;
            (format!("*{}", g.type_name(&r)), "bytes")
        }
        FieldType::Bytes => ("[]byte".to_string(), "bytes"),
        FieldType::Enum => {
            let r = g.resolve(from, field.type_name())?;
            (g.type_name(&r), "varint")
        }
        FieldType::Sfixed32 => ("int32".to_string(), "fixed32"),
        FieldType::Sfixed64 => ("int64".to_string(), "fixed64"),
        FieldType::Sint32 => ("int32".to_string(), "zigzag32"),
        FieldType::Sint64 => ("int64".to_string(), "zigzag64"),
    };
    let proto3 = message.is_some_and(|m| g.model.file(m.file).proto3);
    if field.is_repeated() {
        typ = format!("[]{typ}");
    } else if proto3 {
        // Singular proto3 fields are bare values.
    } else if field.oneof_index.is_some() && message.is_some() {
        // Oneof members live behind the wrapper struct instead.
    } else if needs_star(field.field_type()) {
        typ = format!("*{typ}");
    }
    Ok((typ, wire.to_string()))
}

/// Renders the protobuf struct tag for a field, Go-quoted.
pub fn go_tag(
    g: &Generator,
    from: FileId,
    message: &MessageNode,
    field: &FieldDescriptorProto,
    wiretype: &str,
) -> Result<String> {
    let optrepreq = if field.is_optional() {
        "opt"
    } else if field.is_required() {
        "req"
    } else if field.is_repeated() {
        "rep"
    } else {
        ""
    };

    let mut default_part = String::new();
    if let Some(dv) = &field.default_value {
        // A set default means an explicit one. Some types need tweaking.
        let dv = match field.field_type() {
            FieldType::Bool => if dv == "true" { "1" } else { "0" }.to_string(),
            // Nothing to do for strings or bytes; quoting is done for the
            // whole tag.
            FieldType::String | FieldType::Bytes => dv.clone(),
            FieldType::Enum => {
                // The tag wants the integer constant, not the value name.
                let r = g.resolve(from, field.type_name())?;
                let ObjectId::Enum(e) = r.object else {
                    bail!("unknown enum type {}", field.type_name());
                };
                enums::integer_value_as_string(g.model.enum_def(e), dv)?
            }
            _ => dv.clone(),
        };
        default_part = format!(",def={dv}");
    }

    let mut enum_part = String::new();
    if field.field_type() == FieldType::Enum {
        // The runtime wants the original proto-world package here, not the
        // generated Go package.
        let r = g.resolve(from, field.type_name())?;
        let def_file = g.model.file_of(r.object);
        enum_part.push_str(",enum=");
        let pkg = g.model.file(def_file).proto.package();
        if !pkg.is_empty() {
            enum_part.push_str(pkg);
            enum_part.push('.');
        }
        enum_part.push_str(&names::camel_case_slice(g.model.type_name_of(r.object)));
    }

    let proto3 = g.model.file(message.file).proto3;
    let packed = if is_packed(field, proto3) { ",packed" } else { "" };

    let mut name = field.name().to_string();
    if field.field_type() == FieldType::Group {
        // Use the type name for groups instead of the field name, to
        // preserve capitalization. Only the local part is wanted.
        let tn = field.type_name();
        name = match tn.rfind('.') {
            Some(i) => tn[i + 1..].to_string(),
            None => tn.to_string(),
        };
    }
    let json = field.json_name();
    if !json.is_empty() && json != name {
        name.push_str(",json=");
        name.push_str(json);
    }
    let mut name_part = format!(",name={name}");
    if proto3 && field.field_type() == FieldType::Bytes {
        // Only []byte needs the extra syntax marker; no need to add noise
        // for the others.
        name_part.push_str(",proto3");
    }

    let oneof = if field.oneof_index.is_some() { ",oneof" } else { "" };

    Ok(go_quote(&format!(
        "{wiretype},{},{optrepreq}{packed}{name_part}{enum_part}{oneof}{default_part}",
        field.number(),
    )))
}

/// Reverses the "C" escaping the frontend applies to default values of
/// bytes fields. Best effort: seemingly invalid escape sequences are
/// conveyed, unmodified, into the decoded result.
pub fn unescape(s: &str) -> Vec<u8> {
    fn simple_escape(c: u8) -> Option<u8> {
        Some(match c {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            b'\\' => b'\\',
            b'"' => b'"',
            b'\'' => b'\'',
            b'?' => b'?',
            _ => return None,
        })
    }

    let mut s = s.as_bytes();
    let mut out = Vec::with_capacity(s.len());
    while !s.is_empty() {
        if s[0] != b'\\' || s.len() < 2 {
            // Regular character, or too short to be a valid escape.
            out.push(s[0]);
            s = &s[1..];
        } else if let Some(c) = simple_escape(s[1]) {
            out.push(c);
            s = &s[2..];
        } else if s[1] == b'x' || s[1] == b'X' {
            // Hex escape with exactly two digits, e.g. "\x80".
            if s.len() < 4 {
                out.extend_from_slice(&s[..2]);
                s = &s[2..];
                continue;
            }
            match u8::from_str_radix(&String::from_utf8_lossy(&s[2..4]), 16) {
                Ok(v) => out.push(v),
                Err(_) => out.extend_from_slice(&s[..4]),
            }
            s = &s[4..];
        } else if (b'0'..=b'7').contains(&s[1]) {
            // Octal escape, one to three digits: "\0", "\40", "\164".
            let n = s[1..]
                .iter()
                .take(3)
                .take_while(|c| (b'0'..=b'7').contains(c))
                .count();
            match u8::from_str_radix(&String::from_utf8_lossy(&s[1..1 + n]), 8) {
                Ok(v) => out.push(v),
                Err(_) => out.extend_from_slice(&s[..1 + n]),
            }
            s = &s[1 + n..];
        } else {
            // Bad escape, just propagate the slash as-is.
            out.push(s[0]);
            s = &s[1..];
        }
    }
    out
}

/// Quotes a string as a Go source literal.
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Quotes arbitrary bytes as a Go string literal, hex-escaping everything
/// outside printable ASCII.
pub fn go_quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('"');
    out
}
