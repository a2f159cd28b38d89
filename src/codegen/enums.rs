// Enum type generation
//
// Each enum becomes a named int32 type with prefixed constants, the
// name/value lookup maps the runtime registers, and the JSON and
// descriptor hooks. Values of a nested enum take the parent message's
// prefix only, so values of Foo.Bar come out as Foo_VALUE.

use anyhow::{Result, bail};

use crate::codegen::model::{ConstOrVarSymbol, DeclKind, EnumId, EnumNode, EnumSymbol, ObjectId, Symbol};
use crate::codegen::{FileEmit, comments, fields, names};

/// Constant-name prefix for an enum's values.
pub fn prefix(node: &EnumNode) -> String {
    if node.parent.is_none() {
        // If the enum is not part of a message, the prefix is just the
        // type name.
        return format!("{}_", names::camel_case(node.proto.name()));
    }
    format!(
        "{}_",
        names::camel_case_slice(&node.type_name[..node.type_name.len() - 1])
    )
}

/// The integer value of the named constant in this enumerated type.
pub fn integer_value_as_string(node: &EnumNode, name: &str) -> Result<String> {
    for value in &node.proto.value {
        if value.name() == name {
            return Ok(value.number().to_string());
        }
    }
    bail!("cannot find value for enum constant {name}")
}

pub fn generate_enum(e: &mut FileEmit, id: EnumId) -> Result<()> {
    let g = e.g;
    let node = g.model.enum_def(id);
    let proto3 = g.model.file(node.file).proto3;
    // The full type name, CamelCased.
    let cc = names::camel_case_slice(&node.type_name);
    let cc_prefix = prefix(node);
    let proto_pkg = e.proto_pkg().to_string();

    e.print_comments(&node.path);
    e.p(format!("type {cc} int32"));
    e.add_export(
        ObjectId::Enum(id),
        Symbol::Enum(EnumSymbol {
            name: cc.clone(),
            proto3,
        }),
    );
    e.p("const (");
    e.indent();
    for (i, value) in node.proto.value.iter().enumerate() {
        e.print_comments(&comments::child_key(&node.path, comments::ENUM_VALUE_PATH, i));
        let name = format!("{cc_prefix}{}", value.name());
        e.p(format!("{name} {cc} = {}", value.number()));
        e.add_export(
            ObjectId::Enum(id),
            Symbol::ConstOrVar(ConstOrVarSymbol {
                sym: name,
                kind: DeclKind::Const,
                cast: cc.clone(),
            }),
        );
    }
    e.outdent();
    e.p(")");

    e.p(format!("var {cc}_name = map[int32]string{{"));
    e.indent();
    let mut generated = std::collections::HashSet::new();
    for value in &node.proto.value {
        // Later entries for an already-mapped number would not compile.
        let duplicate = if generated.contains(&value.number()) {
            "// Duplicate value: "
        } else {
            ""
        };
        e.p(format!(
            "{duplicate}{}: {},",
            value.number(),
            fields::go_quote(value.name())
        ));
        generated.insert(value.number());
    }
    e.outdent();
    e.p("}");
    e.p(format!("var {cc}_value = map[string]int32{{"));
    e.indent();
    for value in &node.proto.value {
        e.p(format!("{}: {},", fields::go_quote(value.name()), value.number()));
    }
    e.outdent();
    e.p("}");

    if !proto3 {
        e.p(format!("func (x {cc}) Enum() *{cc} {{"));
        e.indent();
        e.p(format!("p := new({cc})"));
        e.p("*p = x");
        e.p("return p");
        e.outdent();
        e.p("}");
    }

    e.p(format!("func (x {cc}) String() string {{"));
    e.indent();
    e.p(format!("return {proto_pkg}.EnumName({cc}_name, int32(x))"));
    e.outdent();
    e.p("}");

    if !proto3 {
        e.p(format!("func (x *{cc}) UnmarshalJSON(data []byte) error {{"));
        e.indent();
        e.p(format!(
            "value, err := {proto_pkg}.UnmarshalJSONEnum({cc}_value, data, \"{cc}\")"
        ));
        e.p("if err != nil {");
        e.indent();
        e.p("return err");
        e.outdent();
        e.p("}");
        e.p(format!("*x = {cc}(value)"));
        e.p("return nil");
        e.outdent();
        e.p("}");
    }

    let mut indexes: Vec<String> = Vec::new();
    let mut cursor = node.parent;
    while let Some(m) = cursor {
        let parent = g.model.message(m);
        indexes.insert(0, parent.index.to_string());
        cursor = parent.parent;
    }
    indexes.push(node.index.to_string());
    e.p(format!(
        "func ({cc}) EnumDescriptor() ([]byte, []int) {{ return {}, []int{{{}}} }}",
        e.var_name(),
        indexes.join(", ")
    ));
    if g.model.file(node.file).proto.package() == "google.protobuf"
        && node.proto.name() == "NullValue"
    {
        e.p(format!(
            "func ({cc}) XXX_WellKnownType() string {{ return \"{}\" }}",
            node.proto.name()
        ));
    }

    e.p("");
    Ok(())
}

/// Queues the init-time registration of an enum under its proto-world
/// name.
pub fn generate_registration(e: &mut FileEmit, id: EnumId) {
    let g = e.g;
    let node = g.model.enum_def(id);
    // We always print the full (proto-world) package name here.
    let mut pkg = g.model.file(node.file).proto.package().to_string();
    if !pkg.is_empty() {
        pkg.push('.');
    }
    let cc = names::camel_case_slice(&node.type_name);
    e.add_init(format!(
        "{}.RegisterEnum({}, {cc}_name, {cc}_value)",
        e.proto_pkg(),
        fields::go_quote(&format!("{pkg}{cc}"))
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Generator;
    use crate::descriptor::{
        CodeGeneratorRequest, EnumDescriptorProto, EnumValueDescriptorProto, FileDescriptorProto,
    };

    fn enum_file(syntax: Option<&str>) -> CodeGeneratorRequest {
        CodeGeneratorRequest {
            file_to_generate: vec!["kind.proto".to_string()],
            parameter: None,
            proto_file: vec![FileDescriptorProto {
                name: Some("kind.proto".to_string()),
                package: Some("kinds".to_string()),
                syntax: syntax.map(str::to_string),
                enum_type: vec![EnumDescriptorProto {
                    name: Some("Kind".to_string()),
                    value: vec![
                        EnumValueDescriptorProto {
                            name: Some("FIRST".to_string()),
                            number: Some(3),
                        },
                        EnumValueDescriptorProto {
                            name: Some("SECOND".to_string()),
                            number: Some(5),
                        },
                        EnumValueDescriptorProto {
                            name: Some("ALIAS".to_string()),
                            number: Some(5),
                        },
                    ],
                }],
                ..Default::default()
            }],
        }
    }

    fn render(request: CodeGeneratorRequest) -> String {
        let g = Generator::new(request).unwrap();
        let file = g.model.file_by_name("kind.proto").unwrap();
        let mut e = FileEmit::new(&g, file, true);
        let id = g.model.file(file).enums[0];
        generate_enum(&mut e, id).unwrap();
        e.into_output()
    }

    #[test]
    fn test_proto2_enum() {
        let out = render(enum_file(None));
        assert!(out.contains("type Kind int32\n"));
        assert!(out.contains("\tKind_FIRST Kind = 3\n"));
        assert!(out.contains("\tKind_SECOND Kind = 5\n"));
        assert!(out.contains("\t// Duplicate value: 5: \"ALIAS\",\n"));
        assert!(out.contains("\t\"SECOND\": 5,\n"));
        assert!(out.contains("func (x Kind) Enum() *Kind {"));
        assert!(out.contains("func (x *Kind) UnmarshalJSON(data []byte) error {"));
        assert!(out.contains(
            "func (Kind) EnumDescriptor() ([]byte, []int) { return fileDescriptor0, []int{0} }"
        ));
    }

    #[test]
    fn test_proto3_enum_has_no_proto2_methods() {
        let out = render(enum_file(Some("proto3")));
        assert!(out.contains("type Kind int32\n"));
        assert!(!out.contains("Enum()"));
        assert!(!out.contains("UnmarshalJSON"));
        assert!(out.contains("proto.EnumName(Kind_name, int32(x))"));
    }

    #[test]
    fn test_nested_enum_prefix_drops_enum_name() {
        let node = EnumNode {
            proto: EnumDescriptorProto {
                name: Some("Color".to_string()),
                value: Vec::new(),
            },
            file: crate::codegen::model::FileId(0),
            parent: Some(crate::codegen::model::MessageId(0)),
            index: 0,
            path: String::new(),
            type_name: vec!["Shape".to_string(), "Color".to_string()],
        };
        // Values of Shape.Color come out as Shape_RED, not Shape_Color_RED.
        assert_eq!(prefix(&node), "Shape_");

        let top = EnumNode {
            parent: None,
            type_name: vec!["Color".to_string()],
            ..node
        };
        assert_eq!(prefix(&top), "Color_");
    }

    #[test]
    fn test_integer_value_lookup() {
        let node = EnumNode {
            proto: EnumDescriptorProto {
                name: Some("Kind".to_string()),
                value: vec![EnumValueDescriptorProto {
                    name: Some("FIRST".to_string()),
                    number: Some(3),
                }],
            },
            file: crate::codegen::model::FileId(0),
            parent: None,
            index: 0,
            path: String::new(),
            type_name: vec!["Kind".to_string()],
        };
        assert_eq!(integer_value_as_string(&node, "FIRST").unwrap(), "3");
        assert!(integer_value_as_string(&node, "MISSING").is_err());
    }
}
