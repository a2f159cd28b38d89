// Oneof support
//
// Each oneof becomes an unexported interface field whose concrete values
// are one-field wrapper structs, one per member. The runtime cannot
// reflect over that shape, so every message with a oneof also carries
// hand-rolled marshal, unmarshal and size functions hooked up through
// XXX_OneofFuncs.

use anyhow::{Result, bail};

use crate::codegen::message::{FieldInfo, OneofInfo};
use crate::codegen::model::MessageNode;
use crate::codegen::{FileEmit, fields};
use crate::descriptor::{FieldDescriptorProto, FieldType};

pub fn generate_decls(
    e: &mut FileEmit,
    msg: &MessageNode,
    cc: &str,
    infos: &[FieldInfo],
    oneofs: &[OneofInfo],
) -> Result<()> {
    let g = e.g;
    for oneof in oneofs {
        e.p(format!("type {} interface {{", oneof.disc));
        e.indent();
        e.p(format!("{}()", oneof.disc));
        e.outdent();
        e.p("}");
    }
    e.p("");

    for (i, field) in msg.proto.field.iter().enumerate() {
        if field.oneof_index.is_none() {
            continue;
        }
        let info = &infos[i];
        let wrapper = wrapper_of(info, field)?;
        let tag = format!(
            "protobuf:{}",
            fields::go_tag(g, e.file, msg, field, &info.wire)?
        );
        e.p(format!("type {wrapper} struct {{"));
        e.indent();
        e.p(format!("{} {} `{tag}`", info.name, info.typ));
        e.outdent();
        e.p("}");
        e.record_type_use(field.type_name())?;
    }
    e.p("");

    for (i, field) in msg.proto.field.iter().enumerate() {
        let Some(oi) = field.oneof_index else {
            continue;
        };
        let wrapper = wrapper_of(&infos[i], field)?;
        e.p(format!("func (*{wrapper}) {}() {{}}", oneofs[oi as usize].disc));
    }
    e.p("");

    for oneof in oneofs {
        e.p(format!("func (m *{cc}) Get{}() {} {{", oneof.name, oneof.disc));
        e.indent();
        e.p("if m != nil {");
        e.indent();
        e.p(format!("return m.{}", oneof.name));
        e.outdent();
        e.p("}");
        e.p("return nil");
        e.outdent();
        e.p("}");
        e.p("");
    }
    Ok(())
}

pub fn generate_funcs(
    e: &mut FileEmit,
    msg: &MessageNode,
    cc: &str,
    infos: &[FieldInfo],
    oneofs: &[OneofInfo],
) -> Result<()> {
    let proto_pkg = e.proto_pkg().to_string();
    let fmt_pkg = e.fmt_pkg().to_string();
    let math_pkg = e.math_pkg().to_string();
    let enc = format!("_{cc}_OneofMarshaler");
    let dec = format!("_{cc}_OneofUnmarshaler");
    let size = format!("_{cc}_OneofSizer");

    e.p("// XXX_OneofFuncs is for the internal use of the proto package.");
    e.p(format!(
        "func (*{cc}) XXX_OneofFuncs() (func(msg {proto_pkg}.Message, b *{proto_pkg}.Buffer) error, func(msg {proto_pkg}.Message, tag, wire int, b *{proto_pkg}.Buffer) (bool, error), func(msg {proto_pkg}.Message) (n int), []interface{{}}) {{"
    ));
    e.indent();
    e.p(format!("return {enc}, {dec}, {size}, []interface{{}}{{"));
    e.indent();
    for (i, field) in msg.proto.field.iter().enumerate() {
        if field.oneof_index.is_none() {
            continue;
        }
        e.p(format!("(*{})(nil),", wrapper_of(&infos[i], field)?));
    }
    e.outdent();
    e.p("}");
    e.outdent();
    e.p("}");
    e.p("");

    // Marshaler.
    e.p(format!(
        "func {enc}(msg {proto_pkg}.Message, b *{proto_pkg}.Buffer) error {{"
    ));
    e.indent();
    e.p(format!("m := msg.(*{cc})"));
    for (oi, oneof) in oneofs.iter().enumerate() {
        e.p(format!("// {}", msg.proto.oneof_decl[oi].name()));
        e.p(format!("switch x := m.{}.(type) {{", oneof.name));
        for (i, field) in members(msg, oi) {
            let info = &infos[i];
            e.p(format!("case *{}:", wrapper_of(info, field)?));
            e.indent();
            let t = field.field_type();
            let mut val = format!("x.{}", info.name);
            let (pre, post, can_fail) = match t {
                FieldType::Double => (
                    format!("b.EncodeFixed64({math_pkg}.Float64bits("),
                    "))",
                    false,
                ),
                FieldType::Float => (
                    format!("b.EncodeFixed32(uint64({math_pkg}.Float32bits("),
                    ")))",
                    false,
                ),
                FieldType::Int64
                | FieldType::Uint64
                | FieldType::Int32
                | FieldType::Uint32
                | FieldType::Enum => ("b.EncodeVarint(uint64(".to_string(), "))", false),
                FieldType::Fixed64 | FieldType::Sfixed64 => {
                    ("b.EncodeFixed64(uint64(".to_string(), "))", false)
                }
                FieldType::Fixed32 | FieldType::Sfixed32 => {
                    ("b.EncodeFixed32(uint64(".to_string(), "))", false)
                }
                FieldType::Bool => ("b.EncodeVarint(".to_string(), ")", false),
                FieldType::String => ("b.EncodeStringBytes(".to_string(), ")", false),
                FieldType::Group => ("b.Marshal(".to_string(), ")", true),
                FieldType::Message => ("b.EncodeMessage(".to_string(), ")", true),
                FieldType::Bytes => ("b.EncodeRawBytes(".to_string(), ")", false),
                FieldType::Sint32 => ("b.EncodeZigzag32(uint64(".to_string(), "))", false),
                FieldType::Sint64 => ("b.EncodeZigzag64(uint64(".to_string(), "))", false),
            };
            if t == FieldType::Bool {
                e.p("t := uint64(0)");
                e.p(format!("if {val} {{"));
                e.indent();
                e.p("t = 1");
                e.outdent();
                e.p("}");
                val = "t".to_string();
            }
            e.p(format!(
                "b.EncodeVarint({}<<3 | {proto_pkg}.{})",
                field.number(),
                wire_const(t)
            ));
            if can_fail {
                e.p(format!("if err := {pre}{val}{post}; err != nil {{"));
                e.indent();
                e.p("return err");
                e.outdent();
                e.p("}");
            } else {
                e.p(format!("{pre}{val}{post}"));
            }
            if t == FieldType::Group {
                e.p(format!(
                    "b.EncodeVarint({}<<3 | {proto_pkg}.WireEndGroup)",
                    field.number()
                ));
            }
            e.outdent();
        }
        e.p("case nil:");
        e.p("default:");
        e.indent();
        e.p(format!(
            "return {fmt_pkg}.Errorf(\"{cc}.{} has unexpected type %T\", x)",
            oneof.name
        ));
        e.outdent();
        e.p("}");
    }
    e.p("return nil");
    e.outdent();
    e.p("}");
    e.p("");

    // Unmarshaler.
    e.p(format!(
        "func {dec}(msg {proto_pkg}.Message, tag, wire int, b *{proto_pkg}.Buffer) (bool, error) {{"
    ));
    e.indent();
    e.p(format!("m := msg.(*{cc})"));
    e.p("switch tag {");
    for (i, field) in msg.proto.field.iter().enumerate() {
        let Some(oi) = field.oneof_index else {
            continue;
        };
        let info = &infos[i];
        let wrapper = wrapper_of(info, field)?;
        let t = field.field_type();
        e.p(format!(
            "case {}: // {}.{}",
            field.number(),
            msg.proto.oneof_decl[oi as usize].name(),
            field.name()
        ));
        e.indent();
        e.p(format!("if wire != {proto_pkg}.{} {{", wire_const(t)));
        e.indent();
        e.p(format!("return true, {proto_pkg}.ErrInternalBadWireType"));
        e.outdent();
        e.p("}");
        let (dec_call, cast, cast2): (String, &str, String) = match t {
            FieldType::Double => (
                "b.DecodeFixed64()".to_string(),
                "",
                format!("{math_pkg}.Float64frombits"),
            ),
            FieldType::Float => (
                "b.DecodeFixed32()".to_string(),
                "uint32",
                format!("{math_pkg}.Float32frombits"),
            ),
            FieldType::Int64 => ("b.DecodeVarint()".to_string(), "int64", String::new()),
            FieldType::Uint64 => ("b.DecodeVarint()".to_string(), "", String::new()),
            FieldType::Int32 => ("b.DecodeVarint()".to_string(), "int32", String::new()),
            FieldType::Fixed64 => ("b.DecodeFixed64()".to_string(), "", String::new()),
            FieldType::Fixed32 => ("b.DecodeFixed32()".to_string(), "uint32", String::new()),
            FieldType::Bool => ("b.DecodeVarint()".to_string(), "", String::new()),
            FieldType::String => ("b.DecodeStringBytes()".to_string(), "", String::new()),
            FieldType::Group => ("b.DecodeGroup(msg)".to_string(), "", String::new()),
            FieldType::Message => ("b.DecodeMessage(msg)".to_string(), "", String::new()),
            FieldType::Bytes => ("b.DecodeRawBytes(true)".to_string(), "", String::new()),
            FieldType::Uint32 => ("b.DecodeVarint()".to_string(), "uint32", String::new()),
            FieldType::Enum => ("b.DecodeVarint()".to_string(), &info.typ, String::new()),
            FieldType::Sfixed32 => ("b.DecodeFixed32()".to_string(), "int32", String::new()),
            FieldType::Sfixed64 => ("b.DecodeFixed64()".to_string(), "int64", String::new()),
            FieldType::Sint32 => ("b.DecodeZigzag32()".to_string(), "int32", String::new()),
            FieldType::Sint64 => ("b.DecodeZigzag64()".to_string(), "int64", String::new()),
        };
        let mut lhs = "x, err";
        if matches!(t, FieldType::Group | FieldType::Message) {
            e.p(format!("msg := new({})", info.typ.trim_start_matches('*')));
            lhs = "err";
        }
        e.p(format!("{lhs} := {dec_call}"));
        let mut val = "x".to_string();
        if !cast.is_empty() {
            val = format!("{cast}({val})");
        }
        if !cast2.is_empty() {
            val = format!("{cast2}({val})");
        }
        match t {
            FieldType::Bool => val.push_str(" != 0"),
            FieldType::Group | FieldType::Message => val = "msg".to_string(),
            _ => {}
        }
        e.p(format!("m.{} = &{wrapper}{{{val}}}", oneofs[oi as usize].name));
        e.p("return true, err");
        e.outdent();
    }
    e.p("default:");
    e.indent();
    e.p("return false, nil");
    e.outdent();
    e.p("}");
    e.outdent();
    e.p("}");
    e.p("");

    // Sizer.
    e.p(format!("func {size}(msg {proto_pkg}.Message) (n int) {{"));
    e.indent();
    e.p(format!("m := msg.(*{cc})"));
    for (oi, oneof) in oneofs.iter().enumerate() {
        e.p(format!("// {}", msg.proto.oneof_decl[oi].name()));
        e.p(format!("switch x := m.{}.(type) {{", oneof.name));
        for (i, field) in members(msg, oi) {
            let info = &infos[i];
            e.p(format!("case *{}:", wrapper_of(info, field)?));
            e.indent();
            let t = field.field_type();
            let val = format!("x.{}", info.name);
            let (varint, fixed) = match t {
                FieldType::Double => (String::new(), "8".to_string()),
                FieldType::Float => (String::new(), "4".to_string()),
                FieldType::Int64
                | FieldType::Uint64
                | FieldType::Int32
                | FieldType::Uint32
                | FieldType::Enum => (val.clone(), String::new()),
                FieldType::Fixed64 | FieldType::Sfixed64 => (String::new(), "8".to_string()),
                FieldType::Fixed32 | FieldType::Sfixed32 => (String::new(), "4".to_string()),
                FieldType::Bool => (String::new(), "1".to_string()),
                FieldType::String => (format!("len({val})"), format!("len({val})")),
                FieldType::Group => (String::new(), format!("{proto_pkg}.Size({val})")),
                FieldType::Message => {
                    e.p(format!("s := {proto_pkg}.Size({val})"));
                    ("s".to_string(), "s".to_string())
                }
                FieldType::Bytes => (format!("len({val})"), format!("len({val})")),
                FieldType::Sint32 => (
                    format!("(uint32({val}) << 1) ^ uint32((int32({val}) >> 31))"),
                    String::new(),
                ),
                FieldType::Sint64 => (
                    format!("uint64({val} << 1) ^ uint64((int64({val}) >> 63))"),
                    String::new(),
                ),
            };
            e.p(format!(
                "n += {proto_pkg}.SizeVarint({}<<3 | {proto_pkg}.{})",
                field.number(),
                wire_const(t)
            ));
            if !varint.is_empty() {
                e.p(format!("n += {proto_pkg}.SizeVarint(uint64({varint}))"));
            }
            if !fixed.is_empty() {
                e.p(format!("n += {fixed}"));
            }
            if t == FieldType::Group {
                e.p(format!(
                    "n += {proto_pkg}.SizeVarint({}<<3 | {proto_pkg}.WireEndGroup)",
                    field.number()
                ));
            }
            e.outdent();
        }
        e.p("case nil:");
        e.p("default:");
        e.indent();
        e.p(format!(
            "panic({fmt_pkg}.Sprintf(\"proto: unexpected type %T in oneof\", x))"
        ));
        e.outdent();
        e.p("}");
    }
    e.p("return n");
    e.outdent();
    e.p("}");
    e.p("");
    Ok(())
}

fn members(msg: &MessageNode, oi: usize) -> impl Iterator<Item = (usize, &FieldDescriptorProto)> {
    msg.proto
        .field
        .iter()
        .enumerate()
        .filter(move |(_, f)| f.oneof_index == Some(oi as i32))
}

fn wrapper_of<'a>(info: &'a FieldInfo, field: &FieldDescriptorProto) -> Result<&'a str> {
    match &info.wrapper {
        Some(w) => Ok(w),
        None => bail!("oneof member {} has no wrapper type", field.name()),
    }
}

fn wire_const(t: FieldType) -> &'static str {
    match t {
        FieldType::Double | FieldType::Fixed64 | FieldType::Sfixed64 => "WireFixed64",
        FieldType::Float | FieldType::Fixed32 | FieldType::Sfixed32 => "WireFixed32",
        FieldType::Int64
        | FieldType::Uint64
        | FieldType::Int32
        | FieldType::Uint32
        | FieldType::Bool
        | FieldType::Enum
        | FieldType::Sint32
        | FieldType::Sint64 => "WireVarint",
        FieldType::String | FieldType::Message | FieldType::Bytes => "WireBytes",
        FieldType::Group => "WireStartGroup",
    }
}
