// Import block and public-import replays
//
// The import block always pulls in the proto runtime, fmt and math, and
// anchors them with blank-identifier references so the file compiles even
// when nothing else uses them. Every dependency is imported as well, under
// "_" when unreferenced, because tools expect the full transitive closure
// of types to be linked in.
//
// A public import re-exports another file's types: for each of them the
// importing file gets a local defined type plus forwarding methods, all
// delegating through the package of the direct dependency they arrived by.

use anyhow::{Result, bail};

use crate::codegen::model::{
    ConstOrVarSymbol, EnumSymbol, Hoisted, MessageSymbol, Symbol,
};
use crate::codegen::{FileEmit, fields};

pub fn generate_imports(e: &mut FileEmit) -> Result<()> {
    let g = e.g;
    let file = g.model.file(e.file);
    let proto_path = format!("{}github.com/golang/protobuf/proto", g.import_prefix);
    e.p(format!(
        "import {} {}",
        e.proto_pkg(),
        fields::go_quote(&proto_path)
    ));
    e.p(format!("import {} \"fmt\"", e.fmt_pkg()));
    e.p(format!("import {} \"math\"", e.math_pkg()));
    for (i, dep_name) in file.proto.dependency.iter().enumerate() {
        let Some(dep) = g.model.file_by_name(dep_name) else {
            bail!("{}: unknown dependency {dep_name}", file.name());
        };
        // Do not import our own package.
        let pkg = g.unique_package(dep);
        if pkg == g.package_name {
            continue;
        }
        let filename = g.model.file(dep).go_file_name();
        let mut import_path = go_path_dir(&filename).to_string();
        if let Some(substitution) = g.import_map.get(dep_name) {
            import_path = substitution.clone();
        }
        let import_path = format!("{}{import_path}", g.import_prefix);
        if file.proto.weak_dependency.contains(&(i as i32)) {
            e.p(format!(
                "// skipping weak import {pkg} {}",
                fields::go_quote(&import_path)
            ));
            continue;
        }
        let pname = if e.used_packages.contains(pkg) {
            pkg
        } else {
            "_"
        };
        e.p(format!("import {pname} {}", fields::go_quote(&import_path)));
    }
    e.p("");
    e.p("// Reference imports to suppress errors if they are not otherwise used.");
    e.p(format!("var _ = {}.Marshal", e.proto_pkg()));
    e.p(format!("var _ = {}.Errorf", e.fmt_pkg()));
    e.p(format!("var _ = {}.Inf", e.math_pkg()));
    e.p("");
    Ok(())
}

/// The directory part of a slash-separated path, "." when there is none.
fn go_path_dir(p: &str) -> &str {
    match p.rfind('/') {
        Some(0) => "/",
        Some(i) => &p[..i],
        None => ".",
    }
}

pub fn generate_imported(e: &mut FileEmit, h: Hoisted) -> Result<()> {
    let g = e.g;
    let tn = g.model.type_name_of(h.object);
    let Some(sn) = tn.last() else {
        bail!("public import carries an unnamed object");
    };
    let def = g.model.file_of(h.object);
    let df = g.model.file(def);
    if df.gen_index.is_some() {
        // The defining file is in this same output, so its symbols will
        // already be in this package.
        e.p(format!("// Ignoring public import of {sn} from {}", df.name()));
        e.p("");
        return Ok(());
    }
    e.p(format!("// {sn} from public import {}", df.name()));
    let pkg = g.unique_package(h.via).to_string();
    e.used_packages.insert(pkg.clone());
    if let Some(symbols) = df.exports.get(&h.object) {
        for symbol in symbols {
            generate_alias(e, symbol, &pkg)?;
        }
    }
    e.p("");
    Ok(())
}

fn generate_alias(e: &mut FileEmit, symbol: &Symbol, pkg: &str) -> Result<()> {
    match symbol {
        Symbol::Message(ms) => alias_message(e, ms, pkg)?,
        Symbol::Enum(es) => alias_enum(e, es, pkg),
        Symbol::ConstOrVar(cs) => alias_const_or_var(e, cs, pkg),
    }
    Ok(())
}

fn alias_message(e: &mut FileEmit, ms: &MessageSymbol, pkg: &str) -> Result<()> {
    let proto_pkg = e.proto_pkg().to_string();
    let sym = ms.sym.clone();
    let remote = format!("{pkg}.{sym}");

    e.p(format!("type {sym} {remote}"));
    e.p(format!("func (m *{sym}) Reset() {{ (*{remote})(m).Reset() }}"));
    e.p(format!(
        "func (m *{sym}) String() string {{ return (*{remote})(m).String() }}"
    ));
    e.p(format!("func (*{sym}) ProtoMessage() {{}}"));
    if ms.has_extensions {
        e.p(format!(
            "func (*{sym}) ExtensionRangeArray() []{proto_pkg}.ExtensionRange {{ return (*{remote})(nil).ExtensionRangeArray() }}"
        ));
        if ms.is_message_set {
            e.p(format!(
                "func (m *{sym}) Marshal() ([]byte, error) {{ return (*{remote})(m).Marshal() }}"
            ));
            e.p(format!(
                "func (m *{sym}) Unmarshal(buf []byte) error {{ return (*{remote})(m).Unmarshal(buf) }}"
            ));
        }
    }
    if ms.has_oneof {
        // Oneofs and public imports do not mix well: the binary format
        // works, text and JSON break.
        let enc = format!("_{sym}_OneofMarshaler");
        let dec = format!("_{sym}_OneofUnmarshaler");
        let size = format!("_{sym}_OneofSizer");
        let enc_sig = format!("(msg {proto_pkg}.Message, b *{proto_pkg}.Buffer) error");
        let dec_sig =
            format!("(msg {proto_pkg}.Message, tag, wire int, b *{proto_pkg}.Buffer) (bool, error)");
        let size_sig = format!("(msg {proto_pkg}.Message) int");
        e.p(format!(
            "func (m *{sym}) XXX_OneofFuncs() (func{enc_sig}, func{dec_sig}, func{size_sig}, []interface{{}}) {{"
        ));
        e.indent();
        e.p(format!("return {enc}, {dec}, {size}, nil"));
        e.outdent();
        e.p("}");
        e.p(format!("func {enc}{enc_sig} {{"));
        e.indent();
        e.p(format!("m := msg.(*{sym})"));
        e.p(format!("m0 := (*{remote})(m)"));
        e.p("enc, _, _, _ := m0.XXX_OneofFuncs()");
        e.p("return enc(m0, b)");
        e.outdent();
        e.p("}");
        e.p(format!("func {dec}{dec_sig} {{"));
        e.indent();
        e.p(format!("m := msg.(*{sym})"));
        e.p(format!("m0 := (*{remote})(m)"));
        e.p("_, dec, _, _ := m0.XXX_OneofFuncs()");
        e.p("return dec(m0, tag, wire, b)");
        e.outdent();
        e.p("}");
        e.p(format!("func {size}{size_sig} {{"));
        e.indent();
        e.p(format!("m := msg.(*{sym})"));
        e.p(format!("m0 := (*{remote})(m)"));
        e.p("_, _, size, _ := m0.XXX_OneofFuncs()");
        e.p("return size(m0)");
        e.outdent();
        e.p("}");
    }
    for get in &ms.getters {
        if !get.type_name.is_empty() {
            e.record_type_use(&get.type_name)?;
        }
        let mut typ = get.typ.clone();
        let mut val = format!("(*{remote})(m).{}()", get.name);
        if get.gen_type {
            // typ is "*pkg.T" or "pkg.T" or "map[t]*pkg.T", possibly with
            // a "[]" prefix, or the same shapes unqualified when the
            // origin file referred to its own package. Drop the qualifier,
            // since the type has been hoisted into this package.
            let rep = typ.starts_with("[]");
            if rep {
                typ.drain(..2);
            }
            let is_map = typ.starts_with("map[");
            let star = typ.starts_with('*');
            if star {
                typ.remove(0);
            }
            if !is_map {
                if let Some(i) = typ.find('.') {
                    typ.drain(..=i);
                }
            }
            if star {
                typ.insert(0, '*');
            }
            if rep {
                // Go does not convert between slice types with named
                // element types, so spell out the copy.
                let ctyp = if star {
                    format!("({typ})")
                } else {
                    typ.clone()
                };
                e.p(format!("func (m *{sym}) {}() []{typ} {{", get.name));
                e.indent();
                e.p(format!("o := {val}"));
                e.p("if o == nil {");
                e.indent();
                e.p("return nil");
                e.outdent();
                e.p("}");
                e.p(format!("s := make([]{typ}, len(o))"));
                e.p("for i, x := range o {");
                e.indent();
                e.p(format!("s[i] = {ctyp}(x)"));
                e.outdent();
                e.p("}");
                e.p("return s");
                e.outdent();
                e.p("}");
                continue;
            }
            if is_map {
                // Split map[keyTyp]valTyp; only the value type may be
                // foreign.
                let (Some(bra), Some(ket)) = (typ.find('['), typ.find(']')) else {
                    bail!("getter {} has malformed map type {typ}", get.name);
                };
                let key_typ = typ[bra + 1..ket].to_string();
                let mut val_typ = typ[ket + 1..].to_string();
                let star = val_typ.starts_with('*');
                if star {
                    val_typ.remove(0);
                }
                if let Some(i) = val_typ.find('.') {
                    val_typ.drain(..=i);
                }
                if star {
                    val_typ.insert(0, '*');
                }
                let typ = format!("map[{key_typ}]{val_typ}");
                e.p(format!("func (m *{sym}) {}() {typ} {{", get.name));
                e.indent();
                e.p(format!("o := {val}"));
                e.p("if o == nil {");
                e.indent();
                e.p("return nil");
                e.outdent();
                e.p("}");
                e.p(format!("s := make({typ}, len(o))"));
                e.p("for k, v := range o {");
                e.indent();
                e.p(format!("s[k] = ({val_typ})(v)"));
                e.outdent();
                e.p("}");
                e.p("return s");
                e.outdent();
                e.p("}");
                continue;
            }
            // Convert the imported type into the forwarding type.
            val = format!("({typ})({val})");
        }
        e.p(format!(
            "func (m *{sym}) {}() {typ} {{ return {val} }}",
            get.name
        ));
    }
    Ok(())
}

fn alias_enum(e: &mut FileEmit, es: &EnumSymbol, pkg: &str) {
    let s = es.name.clone();
    e.p(format!("type {s} {pkg}.{s}"));
    e.p(format!("var {s}_name = {pkg}.{s}_name"));
    e.p(format!("var {s}_value = {pkg}.{s}_value"));
    e.p(format!(
        "func (x {s}) String() string {{ return ({pkg}.{s})(x).String() }}"
    ));
    if !es.proto3 {
        e.p(format!(
            "func (x {s}) Enum() *{s} {{ return (*{s})(({pkg}.{s})(x).Enum()) }}"
        ));
        e.p(format!(
            "func (x *{s}) UnmarshalJSON(data []byte) error {{ return (*{pkg}.{s})(x).UnmarshalJSON(data) }}"
        ));
    }
}

fn alias_const_or_var(e: &mut FileEmit, cs: &ConstOrVarSymbol, pkg: &str) {
    let mut v = format!("{pkg}.{}", cs.sym);
    if !cs.cast.is_empty() {
        v = format!("{}({v})", cs.cast);
    }
    e.p(format!("{} {} = {v}", cs.kind.keyword(), cs.sym));
}
