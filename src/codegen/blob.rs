// Descriptor blob
//
// Each generated file embeds its own FileDescriptorProto, re-encoded to
// the binary wire format and gzipped, and registers it with the runtime
// so reflection and extension handling can get at the raw descriptor.
// Source info is stripped first; it is comment data the runtime has no
// use for, and it dwarfs the rest of the descriptor.

use std::io::Write as _;

use anyhow::Result;
use flate2::{Compression, write::GzEncoder};

use crate::codegen::{FileEmit, fields};
use crate::descriptor::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, ExtensionRange,
    FieldDescriptorProto, FieldOptions, FileDescriptorProto, FileOptions, MessageOptions,
    MethodDescriptorProto, OneofDescriptorProto, ReservedRange, ServiceDescriptorProto,
};

pub fn generate_file_descriptor(e: &mut FileEmit) -> Result<()> {
    let g = e.g;
    let proto = &g.model.file(e.file).proto;
    let plain = encode_file(proto);
    let mut w = GzEncoder::new(Vec::new(), Compression::best());
    w.write_all(&plain)?;
    let b = w.finish()?;

    let v = e.var_name();
    e.p("");
    e.p(format!(
        "func init() {{ {}.RegisterFile({}, {v}) }}",
        e.proto_pkg(),
        fields::go_quote(proto.name())
    ));
    e.p("");
    e.p(format!("var {v} = []byte{{"));
    e.indent();
    e.p(format!("// {} bytes of a gzipped FileDescriptorProto", b.len()));
    for chunk in b.chunks(16) {
        let line: Vec<String> = chunk.iter().map(|c| format!("0x{c:02x},")).collect();
        e.p(line.join(" "));
    }
    e.outdent();
    e.p("}");
    Ok(())
}

fn put_varint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push(v as u8 | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn put_tag(out: &mut Vec<u8>, field: u32, wire: u8) {
    put_varint(out, u64::from(field << 3 | u32::from(wire)));
}

// Negative values sign-extend to ten bytes, like any proto2 int32.
fn put_int(out: &mut Vec<u8>, field: u32, v: i32) {
    put_tag(out, field, 0);
    put_varint(out, v as i64 as u64);
}

fn put_bool(out: &mut Vec<u8>, field: u32, v: bool) {
    put_tag(out, field, 0);
    put_varint(out, u64::from(v));
}

fn put_str(out: &mut Vec<u8>, field: u32, s: &str) {
    put_tag(out, field, 2);
    put_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn put_message(out: &mut Vec<u8>, field: u32, body: &[u8]) {
    put_tag(out, field, 2);
    put_varint(out, body.len() as u64);
    out.extend_from_slice(body);
}

pub fn encode_file(f: &FileDescriptorProto) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(name) = &f.name {
        put_str(&mut out, 1, name);
    }
    if let Some(package) = &f.package {
        put_str(&mut out, 2, package);
    }
    for dep in &f.dependency {
        put_str(&mut out, 3, dep);
    }
    for m in &f.message_type {
        put_message(&mut out, 4, &encode_message(m));
    }
    for en in &f.enum_type {
        put_message(&mut out, 5, &encode_enum(en));
    }
    for s in &f.service {
        put_message(&mut out, 6, &encode_service(s));
    }
    for x in &f.extension {
        put_message(&mut out, 7, &encode_field(x));
    }
    if let Some(o) = &f.options {
        put_message(&mut out, 8, &encode_file_options(o));
    }
    // Field 9 is source_code_info, deliberately dropped.
    for &i in &f.public_dependency {
        put_int(&mut out, 10, i);
    }
    for &i in &f.weak_dependency {
        put_int(&mut out, 11, i);
    }
    if let Some(s) = &f.syntax {
        put_str(&mut out, 12, s);
    }
    out
}

fn encode_message(m: &DescriptorProto) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(name) = &m.name {
        put_str(&mut out, 1, name);
    }
    for x in &m.field {
        put_message(&mut out, 2, &encode_field(x));
    }
    for n in &m.nested_type {
        put_message(&mut out, 3, &encode_message(n));
    }
    for en in &m.enum_type {
        put_message(&mut out, 4, &encode_enum(en));
    }
    for r in &m.extension_range {
        put_message(&mut out, 5, &encode_extension_range(r));
    }
    for x in &m.extension {
        put_message(&mut out, 6, &encode_field(x));
    }
    if let Some(o) = &m.options {
        put_message(&mut out, 7, &encode_message_options(o));
    }
    for o in &m.oneof_decl {
        put_message(&mut out, 8, &encode_oneof(o));
    }
    for r in &m.reserved_range {
        put_message(&mut out, 9, &encode_reserved_range(r));
    }
    for n in &m.reserved_name {
        put_str(&mut out, 10, n);
    }
    out
}

fn encode_field(x: &FieldDescriptorProto) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(name) = &x.name {
        put_str(&mut out, 1, name);
    }
    if let Some(extendee) = &x.extendee {
        put_str(&mut out, 2, extendee);
    }
    if let Some(n) = x.number {
        put_int(&mut out, 3, n);
    }
    if let Some(l) = x.label {
        put_int(&mut out, 4, l.number());
    }
    if let Some(t) = x.r#type {
        put_int(&mut out, 5, t.number());
    }
    if let Some(tn) = &x.type_name {
        put_str(&mut out, 6, tn);
    }
    if let Some(dv) = &x.default_value {
        put_str(&mut out, 7, dv);
    }
    if let Some(o) = &x.options {
        put_message(&mut out, 8, &encode_field_options(o));
    }
    if let Some(oi) = x.oneof_index {
        put_int(&mut out, 9, oi);
    }
    if let Some(jn) = &x.json_name {
        put_str(&mut out, 10, jn);
    }
    out
}

fn encode_enum(en: &EnumDescriptorProto) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(name) = &en.name {
        put_str(&mut out, 1, name);
    }
    for v in &en.value {
        put_message(&mut out, 2, &encode_enum_value(v));
    }
    out
}

fn encode_enum_value(v: &EnumValueDescriptorProto) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(name) = &v.name {
        put_str(&mut out, 1, name);
    }
    if let Some(n) = v.number {
        put_int(&mut out, 2, n);
    }
    out
}

fn encode_service(s: &ServiceDescriptorProto) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(name) = &s.name {
        put_str(&mut out, 1, name);
    }
    for m in &s.method {
        put_message(&mut out, 2, &encode_method(m));
    }
    out
}

fn encode_method(m: &MethodDescriptorProto) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(name) = &m.name {
        put_str(&mut out, 1, name);
    }
    if let Some(t) = &m.input_type {
        put_str(&mut out, 2, t);
    }
    if let Some(t) = &m.output_type {
        put_str(&mut out, 3, t);
    }
    if let Some(b) = m.client_streaming {
        put_bool(&mut out, 5, b);
    }
    if let Some(b) = m.server_streaming {
        put_bool(&mut out, 6, b);
    }
    out
}

fn encode_oneof(o: &OneofDescriptorProto) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(name) = &o.name {
        put_str(&mut out, 1, name);
    }
    out
}

fn encode_extension_range(r: &ExtensionRange) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(s) = r.start {
        put_int(&mut out, 1, s);
    }
    if let Some(e) = r.end {
        put_int(&mut out, 2, e);
    }
    out
}

fn encode_reserved_range(r: &ReservedRange) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(s) = r.start {
        put_int(&mut out, 1, s);
    }
    if let Some(e) = r.end {
        put_int(&mut out, 2, e);
    }
    out
}

fn encode_file_options(o: &FileOptions) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(p) = &o.go_package {
        put_str(&mut out, 11, p);
    }
    out
}

fn encode_message_options(o: &MessageOptions) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(b) = o.message_set_wire_format {
        put_bool(&mut out, 1, b);
    }
    if let Some(b) = o.map_entry {
        put_bool(&mut out, 7, b);
    }
    out
}

fn encode_field_options(o: &FieldOptions) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(b) = o.packed {
        put_bool(&mut out, 2, b);
    }
    if let Some(b) = o.weak {
        put_bool(&mut out, 10, b);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use flate2::read::GzDecoder;

    use super::*;
    use crate::descriptor::{FieldLabel, FieldType, Location, SourceCodeInfo};

    #[test]
    fn test_encode_minimal_file() {
        let f = FileDescriptorProto {
            name: Some("t.proto".to_string()),
            package: Some("t".to_string()),
            syntax: Some("proto3".to_string()),
            ..Default::default()
        };
        let mut want = vec![0x0a, 0x07];
        want.extend_from_slice(b"t.proto");
        want.extend_from_slice(&[0x12, 0x01]);
        want.extend_from_slice(b"t");
        want.extend_from_slice(&[0x62, 0x06]);
        want.extend_from_slice(b"proto3");
        assert_eq!(encode_file(&f), want);
    }

    #[test]
    fn test_encode_field_varints() {
        let x = FieldDescriptorProto {
            name: Some("x".to_string()),
            number: Some(300),
            label: Some(FieldLabel::Optional),
            r#type: Some(FieldType::Int32),
            ..Default::default()
        };
        let want = vec![
            0x0a, 0x01, b'x', // name
            0x18, 0xac, 0x02, // number, two-byte varint
            0x20, 0x01, // label
            0x28, 0x05, // type
        ];
        assert_eq!(encode_field(&x), want);
    }

    #[test]
    fn test_source_info_is_dropped() {
        let mut f = FileDescriptorProto {
            name: Some("t.proto".to_string()),
            ..Default::default()
        };
        let bare = encode_file(&f);
        f.source_code_info = Some(SourceCodeInfo {
            location: vec![Location {
                path: vec![2],
                leading_comments: Some("package comment".to_string()),
                ..Default::default()
            }],
        });
        assert_eq!(encode_file(&f), bare);
    }

    #[test]
    fn test_gzip_round_trip() {
        let f = FileDescriptorProto {
            name: Some("t.proto".to_string()),
            package: Some("t".to_string()),
            ..Default::default()
        };
        let plain = encode_file(&f);
        let mut w = GzEncoder::new(Vec::new(), Compression::best());
        w.write_all(&plain).unwrap();
        let gz = w.finish().unwrap();
        assert_eq!(&gz[..2], &[0x1f, 0x8b]);
        let mut back = Vec::new();
        GzDecoder::new(gz.as_slice()).read_to_end(&mut back).unwrap();
        assert_eq!(back, plain);
    }
}
