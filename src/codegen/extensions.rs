// Extension generation
//
// An extension becomes a package-level *proto.ExtensionDesc var named
// after its scope chain, which user code passes to proto.SetExtension
// and friends.

use anyhow::{Result, bail};

use crate::codegen::model::{ConstOrVarSymbol, DeclKind, ExtensionId, ExtensionNode, ObjectId, Symbol};
use crate::codegen::{FileEmit, fields, names};

/// The var name: each scope component CamelCased, joined with "_" under an
/// "E_" prefix, so nested extensions cannot collide with top-level ones.
pub fn desc_name(ext: &ExtensionNode) -> String {
    let parts: Vec<String> = ext.type_name.iter().map(|s| names::camel_case(s)).collect();
    format!("E_{}", parts.join("_"))
}

pub fn generate_extension(e: &mut FileEmit, id: ExtensionId) -> Result<()> {
    let g = e.g;
    let ext = g.model.extension(id);
    let field = &ext.field;
    let cc_type_name = desc_name(ext);
    let proto_pkg = e.proto_pkg().to_string();

    let r = g.resolve(e.file, field.extendee())?;
    let ObjectId::Message(em) = r.object else {
        bail!("extendee {} is not a message", field.extendee());
    };
    let extended = g.model.message(em);
    let extended_type = format!("*{}", g.type_name(&r));
    let parent = ext.parent.map(|p| g.model.message(p));
    let (field_type, wire) = fields::go_type(g, e.file, parent, field)?;
    let tag = fields::go_tag(g, e.file, extended, field, &wire)?;
    e.record_type_use(field.extendee())?;
    if !field.type_name().is_empty() {
        e.record_type_use(field.type_name())?;
    }

    // Earlier proto2 message sets register the extension under the
    // extension's parent message instead.
    let mut type_name = ext.type_name.clone();
    let mut mset = false;
    if extended_type == "*proto2_bridge.MessageSet"
        && type_name.last().map(String::as_str) == Some("message_set_extension")
    {
        type_name.pop();
        mset = true;
    }
    // The name the runtime sees must be what the proto file declares,
    // whatever the go_package option says.
    let mut ext_name = type_name.join(".");
    let pkg = g.model.file(ext.file).proto.package();
    if !pkg.is_empty() {
        ext_name = format!("{pkg}.{ext_name}");
    }

    e.p(format!("var {cc_type_name} = &{proto_pkg}.ExtensionDesc{{"));
    e.indent();
    e.p(format!("ExtendedType: ({extended_type})(nil),"));
    e.p(format!("ExtensionType: ({field_type})(nil),"));
    e.p(format!("Field: {},", field.number()));
    e.p(format!("Name: {},", fields::go_quote(&ext_name)));
    e.p(format!("Tag: {tag},"));
    e.p(format!(
        "Filename: {},",
        fields::go_quote(g.model.file(e.file).proto.name())
    ));
    e.outdent();
    e.p("}");
    e.p("");

    if mset {
        e.add_init(format!(
            "{proto_pkg}.RegisterMessageSetType(({field_type})(nil), {}, {})",
            field.number(),
            fields::go_quote(&ext_name)
        ));
    }

    e.add_export(
        ObjectId::Extension(id),
        Symbol::ConstOrVar(ConstOrVarSymbol {
            sym: cc_type_name,
            kind: DeclKind::Var,
            cast: String::new(),
        }),
    );
    Ok(())
}

pub fn generate_registration(e: &mut FileEmit, id: ExtensionId) {
    let name = desc_name(e.g.model.extension(id));
    e.add_init(format!("{}.RegisterExtension({name})", e.proto_pkg()));
}
