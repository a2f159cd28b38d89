// Message type generation
//
// A message becomes a struct plus its accessor methods, default-value
// declarations, extension-range table, and the runtime registration hook.
// Field and getter names are allocated in pairs so that a collision
// renames both halves together. Oneof members move out of the struct into
// wrapper types handled by the oneof module.

use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::codegen::model::{
    ConstOrVarSymbol, DeclKind, GetterSymbol, MessageId, MessageSymbol, ObjectId, Symbol,
};
use crate::codegen::{FileEmit, Generator, comments, enums, extensions, fields, names, oneof};
use crate::descriptor::FieldType;

// Messages in the `google.protobuf` package the runtime knows by their
// short name.
const WELL_KNOWN_TYPES: &[&str] = &[
    "Any",
    "Duration",
    "Empty",
    "Struct",
    "Timestamp",
    "Value",
    "ListValue",
    "DoubleValue",
    "FloatValue",
    "Int64Value",
    "UInt64Value",
    "Int32Value",
    "UInt32Value",
    "BoolValue",
    "StringValue",
    "BytesValue",
];

/// Everything the emitter needs to know about one field, computed up
/// front so the oneof codecs can reuse it.
#[derive(Clone)]
pub struct FieldInfo {
    /// Allocated struct field name.
    pub name: String,
    /// Allocated getter method name.
    pub getter: String,
    /// The field's type, in map form for map fields.
    pub typ: String,
    /// Wire style for the tag, "varint" and friends.
    pub wire: String,
    /// Struct tag body, backticks not included.
    pub tag: String,
    /// Wrapper type for a oneof member, without the star.
    pub wrapper: Option<String>,
}

#[derive(Clone)]
pub struct OneofInfo {
    /// Allocated union field name.
    pub name: String,
    /// Name of the discriminator interface and its marker method.
    pub disc: String,
}

pub fn generate_message(e: &mut FileEmit, id: MessageId) -> Result<()> {
    let g = e.g;
    let msg = g.model.message(id);
    let file = e.file;
    // The full type name, CamelCased.
    let cc = names::camel_case_slice(&msg.type_name);
    let proto3 = g.model.file(msg.file).proto3;
    let proto_pkg = e.proto_pkg().to_string();

    // Allocate every name before emitting anything. The order matters: a
    // oneof's union field is named right after the first member that
    // mentions it, so renames stay stable under field reordering within
    // the group.
    let mut used = names::IdentSet::for_message();
    let mut infos: Vec<FieldInfo> = Vec::with_capacity(msg.proto.field.len());
    let mut oneofs: Vec<Option<OneofInfo>> = vec![None; msg.proto.oneof_decl.len()];
    for field in &msg.proto.field {
        let base = names::camel_case(field.name());
        let mut ns = used.alloc(&[base.clone(), format!("Get{base}")]);
        let getter = ns.pop().unwrap_or_default();
        let name = ns.pop().unwrap_or_default();

        if let Some(oi) = field.oneof_index {
            let oi = oi as usize;
            let Some(odecl) = msg.proto.oneof_decl.get(oi) else {
                bail!("field {} has oneof index {oi} out of range", field.name());
            };
            if oneofs[oi].is_none() {
                let fname = used.alloc_one(&names::camel_case(odecl.name()));
                let disc = format!("is{cc}_{fname}");
                oneofs[oi] = Some(OneofInfo { name: fname, disc });
            }
        }

        let (mut typ, wire) = fields::go_type(g, file, Some(msg), field)?;
        let mut tag = format!(
            "protobuf:{} json:{}",
            fields::go_tag(g, file, msg, field, &wire)?,
            fields::go_quote(&format!("{},omitempty", field.name()))
        );

        if field.field_type() == FieldType::Message {
            // A message field whose type is a synthetic map entry becomes
            // a real map; the entry message itself is never emitted.
            let r = g.resolve(file, field.type_name())?;
            if let ObjectId::Message(m) = r.object {
                let entry = g.model.message(m);
                if entry.proto.is_map_entry() {
                    let (key_field, val_field) = match entry.proto.field.as_slice() {
                        [k, v] => (k, v),
                        _ => bail!(
                            "map entry {} does not have exactly two fields",
                            entry.proto.name()
                        ),
                    };
                    let (key_type, key_wire) = fields::go_type(g, file, Some(entry), key_field)?;
                    let (val_type, val_wire) = fields::go_type(g, file, Some(entry), val_field)?;
                    let key_tag = fields::go_tag(g, file, entry, key_field, &key_wire)?;
                    let val_tag = fields::go_tag(g, file, entry, val_field, &val_wire)?;

                    // No stars except for message-typed values. Messages
                    // and enums are the only possibly foreign types here,
                    // so record their use; they cannot be map keys.
                    let key_type = key_type.trim_start_matches('*').to_string();
                    let val_type = match val_field.field_type() {
                        FieldType::Enum => {
                            e.record_type_use(val_field.type_name())?;
                            val_type.trim_start_matches('*').to_string()
                        }
                        FieldType::Message => {
                            e.record_type_use(val_field.type_name())?;
                            val_type
                        }
                        _ => val_type.trim_start_matches('*').to_string(),
                    };

                    typ = format!("map[{key_type}]{val_type}");
                    tag.push_str(&format!(" protobuf_key:{key_tag} protobuf_val:{val_tag}"));
                }
            }
        }

        let wrapper = if field.oneof_index.is_some() {
            Some(wrapper_type_name(g, id, &cc, &name))
        } else {
            None
        };
        infos.push(FieldInfo {
            name,
            getter,
            typ,
            wire,
            tag,
            wrapper,
        });
    }
    let oneofs: Vec<OneofInfo> = {
        let mut out = Vec::with_capacity(oneofs.len());
        for (oi, info) in oneofs.into_iter().enumerate() {
            let Some(info) = info else {
                bail!(
                    "oneof {} in {} has no fields",
                    msg.proto.oneof_decl[oi].name(),
                    cc
                );
            };
            out.push(info);
        }
        out
    };

    // The struct itself. Wrapper-type doc lines for each union field are
    // filled in afterwards, once every wrapper name is known.
    e.print_comments(&msg.path);
    e.p(format!("type {cc} struct {{"));
    e.indent();
    let mut union_marks = Vec::new();
    let mut seen_oneof = vec![false; oneofs.len()];
    for (i, field) in msg.proto.field.iter().enumerate() {
        if let Some(oi) = field.oneof_index {
            let oi = oi as usize;
            if !seen_oneof[oi] {
                seen_oneof[oi] = true;
                let key = comments::child_key(&msg.path, comments::MESSAGE_ONEOF_PATH, oi);
                if e.print_comments(&key) {
                    e.p("//");
                }
                let info = &oneofs[oi];
                e.p(format!("// Types that are valid to be assigned to {}:", info.name));
                union_marks.push((oi, e.mark()));
                e.p(format!(
                    "{} {} `protobuf_oneof:{}`",
                    info.name,
                    info.disc,
                    fields::go_quote(msg.proto.oneof_decl[oi].name())
                ));
            }
            continue;
        }
        e.print_comments(&comments::child_key(&msg.path, comments::MESSAGE_FIELD_PATH, i));
        let info = &infos[i];
        e.p(format!("{} {} `{}`", info.name, info.typ, info.tag));
        e.record_type_use(field.type_name())?;
    }
    let has_extensions = !msg.proto.extension_range.is_empty();
    if has_extensions {
        e.p(format!("{proto_pkg}.XXX_InternalExtensions `json:\"-\"`"));
    }
    if !proto3 {
        e.p("XXX_unrecognized []byte `json:\"-\"`");
    }
    e.outdent();
    e.p("}");
    e.p("");

    // Backfill the wrapper lists, back to front so earlier offsets stay
    // valid.
    for &(oi, mark) in union_marks.iter().rev() {
        for (i, field) in msg.proto.field.iter().enumerate().rev() {
            if field.oneof_index != Some(oi as i32) {
                continue;
            }
            if let Some(wrapper) = &infos[i].wrapper {
                e.insert_line(mark, &format!("//\t*{wrapper}"));
            }
        }
    }

    e.p(format!("func (m *{cc}) Reset() {{ *m = {cc}{{}} }}"));
    e.p(format!(
        "func (m *{cc}) String() string {{ return {proto_pkg}.CompactTextString(m) }}"
    ));
    e.p(format!("func (*{cc}) ProtoMessage() {{}}"));
    let indexes: Vec<String> = g
        .model
        .index_path(id)
        .into_iter()
        .map(|i| i.to_string())
        .collect();
    e.p(format!(
        "func (*{cc}) Descriptor() ([]byte, []int) {{ return {}, []int{{{}}} }}",
        e.var_name(),
        indexes.join(", ")
    ));
    if g.model.file(msg.file).proto.package() == "google.protobuf"
        && WELL_KNOWN_TYPES.contains(&msg.proto.name())
    {
        e.p(format!(
            "func (*{cc}) XXX_WellKnownType() string {{ return \"{}\" }}",
            msg.proto.name()
        ));
    }
    e.p("");

    let mut is_message_set = false;
    if has_extensions {
        // message_set_wire_format only makes sense when extensions are
        // defined.
        if msg.proto.is_message_set() {
            is_message_set = true;
            e.p(format!("func (m *{cc}) Marshal() ([]byte, error) {{"));
            e.indent();
            e.p(format!(
                "return {proto_pkg}.MarshalMessageSet(&m.XXX_InternalExtensions)"
            ));
            e.outdent();
            e.p("}");
            e.p(format!("func (m *{cc}) Unmarshal(buf []byte) error {{"));
            e.indent();
            e.p(format!(
                "return {proto_pkg}.UnmarshalMessageSet(buf, &m.XXX_InternalExtensions)"
            ));
            e.outdent();
            e.p("}");
            e.p(format!("func (m *{cc}) MarshalJSON() ([]byte, error) {{"));
            e.indent();
            e.p(format!(
                "return {proto_pkg}.MarshalMessageSetJSON(&m.XXX_InternalExtensions)"
            ));
            e.outdent();
            e.p("}");
            e.p(format!("func (m *{cc}) UnmarshalJSON(buf []byte) error {{"));
            e.indent();
            e.p(format!(
                "return {proto_pkg}.UnmarshalMessageSetJSON(buf, &m.XXX_InternalExtensions)"
            ));
            e.outdent();
            e.p("}");
            e.p(format!(
                "// ensure {cc} satisfies proto.Marshaler and proto.Unmarshaler"
            ));
            e.p(format!("var _ {proto_pkg}.Marshaler = (*{cc})(nil)"));
            e.p(format!("var _ {proto_pkg}.Unmarshaler = (*{cc})(nil)"));
            e.p("");
        }

        e.p(format!("var extRange_{cc} = []{proto_pkg}.ExtensionRange{{"));
        e.indent();
        for r in &msg.proto.extension_range {
            let (Some(start), Some(end)) = (r.start, r.end) else {
                bail!(
                    "internal error: extension range in {} is missing a bound",
                    msg.type_name.join(".")
                );
            };
            // The descriptor range is half open; the runtime wants both
            // ends inclusive.
            e.p(format!("{{{}, {}}},", start, end - 1));
        }
        e.outdent();
        e.p("}");
        e.p(format!(
            "func (*{cc}) ExtensionRangeArray() []{proto_pkg}.ExtensionRange {{"
        ));
        e.indent();
        e.p(format!("return extRange_{cc}"));
        e.outdent();
        e.p("}");
        e.p("");
    }

    // Default constants.
    let mut def_names: HashMap<usize, String> = HashMap::new();
    let mut any_default = false;
    for (i, field) in msg.proto.field.iter().enumerate() {
        let Some(dv) = &field.default_value else {
            continue;
        };
        let def_name = format!("Default_{cc}_{}", names::camel_case(field.name()));
        def_names.insert(i, def_name.clone());
        let (typ, _) = fields::go_type(g, file, Some(msg), field)?;
        let typ = typ.trim_start_matches('*');
        let mut kind = DeclKind::Const;
        let def = match field.field_type() {
            FieldType::String => fields::go_quote(dv),
            FieldType::Bytes => {
                kind = DeclKind::Var;
                format!("[]byte({})", fields::go_quote_bytes(&fields::unescape(dv)))
            }
            FieldType::Float | FieldType::Double
                if matches!(dv.as_str(), "inf" | "-inf" | "nan") =>
            {
                // These names are known to, and defined by, the protocol
                // language.
                kind = DeclKind::Var;
                let def = match dv.as_str() {
                    "inf" => "math.Inf(1)",
                    "-inf" => "math.Inf(-1)",
                    _ => "math.NaN()",
                };
                if field.field_type() == FieldType::Float {
                    format!("float32({def})")
                } else {
                    def.to_string()
                }
            }
            FieldType::Enum => {
                // Construct the prefixed constant name.
                let r = g.resolve(file, field.type_name())?;
                let ObjectId::Enum(en) = r.object else {
                    bail!("default for {def_name} does not name an enum value");
                };
                format!(
                    "{}{}{dv}",
                    g.qualifier(&r),
                    enums::prefix(g.model.enum_def(en))
                )
            }
            _ => dv.clone(),
        };
        e.p(format!("{} {def_name} {typ} = {def}", kind.keyword()));
        e.add_export(
            ObjectId::Message(id),
            Symbol::ConstOrVar(ConstOrVarSymbol {
                sym: def_name,
                kind,
                cast: String::new(),
            }),
        );
        any_default = true;
    }
    if any_default {
        e.p("");
    }

    if !oneofs.is_empty() {
        oneof::generate_decls(e, msg, &cc, &infos, &oneofs)?;
    }

    // Field getters.
    let mut getters = Vec::new();
    for (i, field) in msg.proto.field.iter().enumerate() {
        let info = &infos[i];
        let is_oneof = field.oneof_index.is_some();
        let mut typ = info.typ.clone();
        let mut star = "";
        if fields::needs_star(field.field_type()) && typ.starts_with('*') {
            typ.remove(0);
            star = "*";
        }

        // Getter symbols only exist for basic types and for messages and
        // enums of this same package. A foreign type cannot ride a public
        // import because the re-exporting file's consumer does not import
        // the defining file.
        let mut gen_type = false;
        let exported = match field.field_type() {
            FieldType::Group => false,
            FieldType::Message | FieldType::Enum => {
                gen_type = true;
                let r = g.resolve(file, field.type_name())?;
                g.unique_package(r.via) == g.unique_package(msg.file)
            }
            _ => true,
        };
        if exported {
            getters.push(GetterSymbol {
                name: info.getter.clone(),
                typ: typ.clone(),
                type_name: field.type_name().to_string(),
                gen_type,
            });
        }

        e.p(format!("func (m *{cc}) {}() {typ} {{", info.getter));
        e.indent();
        let def = def_names.get(&i);
        // Whether this field type's default is a literal nil unless
        // overridden.
        let type_default_is_nil = match field.field_type() {
            FieldType::Bytes => def.is_none(),
            FieldType::Group | FieldType::Message => true,
            _ => false,
        } || field.is_repeated();
        if type_default_is_nil && !is_oneof {
            e.p("if m != nil {");
            e.indent();
            e.p(format!("return m.{}", info.name));
            e.outdent();
            e.p("}");
            e.p("return nil");
            e.outdent();
            e.p("}");
            e.p("");
            continue;
        }
        if !is_oneof {
            if proto3 {
                e.p("if m != nil {");
            } else {
                e.p(format!("if m != nil && m.{} != nil {{", info.name));
            }
            e.indent();
            e.p(format!("return {star}m.{}", info.name));
            e.outdent();
            e.p("}");
        } else {
            let oi = field.oneof_index.unwrap_or_default() as usize;
            let Some(wrapper) = &info.wrapper else {
                bail!("oneof member {} has no wrapper type", field.name());
            };
            e.p(format!(
                "if x, ok := m.Get{}().(*{wrapper}); ok {{",
                oneofs[oi].name
            ));
            e.indent();
            e.p(format!("return x.{}", info.name));
            e.outdent();
            e.p("}");
        }
        if let Some(def) = def {
            if field.field_type() == FieldType::Bytes {
                // The default is a []byte var; return a copy.
                e.p(format!("return append([]byte(nil), {def}...)"));
            } else {
                e.p(format!("return {def}"));
            }
        } else {
            match field.field_type() {
                FieldType::Bool => e.p("return false"),
                FieldType::String => e.p("return \"\""),
                // Only possible for oneof members.
                FieldType::Group | FieldType::Message | FieldType::Bytes => e.p("return nil"),
                FieldType::Enum => {
                    // The default default for an enum is its first value,
                    // not zero.
                    let r = g.resolve(file, field.type_name())?;
                    let ObjectId::Enum(en) = r.object else {
                        bail!("field {} does not name an enum", field.name());
                    };
                    let node = g.model.enum_def(en);
                    match node.proto.value.first() {
                        None => e.p("return 0 // empty enum"),
                        Some(first) => e.p(format!(
                            "return {}{}{}",
                            g.qualifier(&r),
                            enums::prefix(node),
                            first.name()
                        )),
                    }
                }
                _ => e.p("return 0"),
            }
        }
        e.outdent();
        e.p("}");
        e.p("");
    }

    if !msg.group {
        e.add_export(
            ObjectId::Message(id),
            Symbol::Message(MessageSymbol {
                sym: cc.clone(),
                has_extensions,
                is_message_set,
                has_oneof: !oneofs.is_empty(),
                getters,
            }),
        );
    }

    if !oneofs.is_empty() {
        oneof::generate_funcs(e, msg, &cc, &infos, &oneofs)?;
    }

    for &ext in &msg.extensions {
        extensions::generate_extension(e, ext)?;
    }

    let mut full_name = msg.type_name.join(".");
    let pkg = g.model.file(msg.file).proto.package();
    if !pkg.is_empty() {
        full_name = format!("{pkg}.{full_name}");
    }
    e.add_init(format!(
        "{proto_pkg}.RegisterType((*{cc})(nil), {})",
        fields::go_quote(&full_name)
    ));
    Ok(())
}

/// A oneof wrapper type may collide with a nested message or enum; keep
/// suffixing until it does not.
fn wrapper_type_name(g: &Generator, id: MessageId, cc: &str, field_name: &str) -> String {
    let msg = g.model.message(id);
    let mut tname = format!("{cc}_{field_name}");
    loop {
        let nested_clash = msg
            .nested
            .iter()
            .any(|&n| names::camel_case_slice(&g.model.message(n).type_name) == tname);
        let enum_clash = g
            .model
            .enums
            .iter()
            .any(|en| en.parent == Some(id) && names::camel_case_slice(&en.type_name) == tname);
        if !nested_clash && !enum_clash {
            return tname;
        }
        tname.push('_');
    }
}
