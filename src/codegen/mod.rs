// Go source generation
//
// The model module turns a CodeGeneratorRequest into an indexed tree;
// everything else here walks that tree and prints Go. A Generator holds
// the naming decisions that span files, a FileEmit the output state of
// one file. Bodies are generated before headers so the import block can
// reflect which packages the body actually mentions, and the generator
// runs over dependency files too, output suppressed, because their
// symbols feed the public-import aliases of later files.

use std::collections::{HashMap, HashSet};
use std::mem;

use anyhow::{Result, bail};
use tracing::debug;

use crate::descriptor::{CodeGeneratorRequest, CodeGeneratorResponse, ResponseFile};

pub mod blob;
pub mod comments;
pub mod enums;
pub mod extensions;
pub mod fields;
pub mod imports;
pub mod message;
pub mod model;
pub mod names;
pub mod oneof;
pub mod printer;

use model::{FileId, Model, ObjectId, Resolved, Symbol};
use printer::{Mark, Printer};

/// Generates Go bindings for a whole request.
pub fn generate(request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse> {
    Generator::new(request)?.run()
}

pub struct Generator {
    pub model: Model,
    /// Prefix prepended to the import paths of the runtime and of every
    /// dependency, from the import_prefix parameter.
    pub import_prefix: String,
    /// Import path overrides keyed by .proto file name, from M parameters.
    pub import_map: HashMap<String, String>,
    /// The Go package the generated files declare themselves in.
    pub package_name: String,
    /// Unique Go package name per file, indexed by FileId.
    unique_names: Vec<String>,
    proto_pkg: String,
    fmt_pkg: String,
    math_pkg: String,
}

impl Generator {
    pub fn new(request: CodeGeneratorRequest) -> Result<Generator> {
        let parameter = request.parameter.clone().unwrap_or_default();
        let model = Model::build(request)?;
        if model.gen_files.is_empty() {
            bail!("no files to generate");
        }

        let mut import_prefix = String::new();
        let mut package_import_path = String::new();
        let mut import_map = HashMap::new();
        for part in parameter.split(',') {
            let (key, value) = match part.find('=') {
                Some(i) => (&part[..i], &part[i + 1..]),
                None => (part, ""),
            };
            match key {
                "import_prefix" => import_prefix = value.to_string(),
                "import_path" => package_import_path = value.to_string(),
                // Accepted for compatibility; plugin generators are
                // separate programs.
                "plugins" => {}
                _ => {
                    if let Some(proto_name) = key.strip_prefix('M') {
                        import_map.insert(proto_name.to_string(), value.to_string());
                    } else if !key.is_empty() {
                        debug!("ignoring unknown parameter {key}");
                    }
                }
            }
        }

        // Pick the one Go package name for the files being generated. An
        // explicit go_package option wins, and all explicit options must
        // agree on it.
        let (mut pkg, mut explicit) = model.file(model.gen_files[0]).go_package_name();
        for &file in &model.gen_files {
            let (this_pkg, this_explicit) = model.file(file).go_package_name();
            if this_explicit {
                if !explicit {
                    // Let this option serve for all input files.
                    pkg = this_pkg;
                    explicit = true;
                } else if this_pkg != pkg {
                    bail!("inconsistent package names: {this_pkg} {pkg}");
                }
            }
        }
        // Without an explicit option, an import_path parameter decides.
        if !explicit {
            let p = names::default_package_name(&package_import_path);
            if !p.is_empty() {
                pkg = p;
                explicit = true;
            }
        }
        // Failing both, every input must imply the same name.
        if !explicit {
            for &file in &model.gen_files {
                let (this_pkg, _) = model.file(file).go_package_name();
                if this_pkg != pkg {
                    bail!("inconsistent package names: {this_pkg} {pkg}");
                }
            }
        }

        // The support packages are registered first so the generated
        // references to them are never the ones renamed; a proto package
        // that wants one of these names is the one that moves.
        let mut registry = names::PackageRegistry::new();
        let fmt_pkg = registry.unique("fmt");
        let math_pkg = registry.unique("math");
        let proto_pkg = registry.unique("proto");
        let package_name = registry.unique(&pkg);

        let mut unique_names = Vec::with_capacity(model.files.len());
        for f in &model.files {
            if f.gen_index.is_some() {
                unique_names.push(package_name.clone());
                continue;
            }
            // Imported files go by their proto package, or their base
            // file name when they have none. Their go_package option
            // only matters for the import path, not the name here.
            let pkg = f.proto.package();
            let candidate = if pkg.is_empty() {
                names::base_name(f.name())
            } else {
                pkg
            };
            unique_names.push(registry.unique(candidate));
        }

        Ok(Generator {
            model,
            import_prefix,
            import_map,
            package_name,
            unique_names,
            proto_pkg,
            fmt_pkg,
            math_pkg,
        })
    }

    /// The unique Go package name assigned to a file.
    pub fn unique_package(&self, file: FileId) -> &str {
        &self.unique_names[file.0]
    }

    /// Looks up a dotted type name as seen from `from`.
    pub fn resolve(&self, from: FileId, type_name: &str) -> Result<Resolved> {
        self.model.resolve(from, type_name)
    }

    /// `pkg.` when the resolved object is qualified by a foreign package,
    /// empty when it belongs to the output package.
    pub fn qualifier(&self, r: &Resolved) -> String {
        let pkg = self.unique_package(r.via);
        if pkg == self.package_name {
            return String::new();
        }
        format!("{pkg}.")
    }

    /// The Go name of a resolved object, qualified as needed.
    pub fn type_name(&self, r: &Resolved) -> String {
        format!(
            "{}{}",
            self.qualifier(r),
            names::camel_case_slice(self.model.type_name_of(r.object))
        )
    }

    pub fn run(&mut self) -> Result<CodeGeneratorResponse> {
        let mut response = CodeGeneratorResponse::default();
        for i in 0..self.model.files.len() {
            let file = FileId(i);
            let write = self.model.file(file).gen_index.is_some();
            let (content, exports) = generate_file(self, file, write)?;
            for (object, symbol) in exports {
                self.model.add_export(file, object, symbol);
            }
            if write {
                response.file.push(ResponseFile {
                    name: Some(self.model.file(file).go_file_name()),
                    content: Some(content),
                });
            }
        }
        Ok(response)
    }
}

/// Output state for one file: the buffer, the registrations collected for
/// the init function, and the symbols to hand back for public-import
/// replays. When `write` is false everything printed is dropped and only
/// the side tables survive.
pub struct FileEmit<'a> {
    pub g: &'a Generator,
    pub file: FileId,
    w: Printer,
    write: bool,
    /// Unique package names the body references by name; everything else
    /// is imported under `_`.
    pub used_packages: HashSet<String>,
    init: Vec<String>,
    exports: Vec<(ObjectId, Symbol)>,
}

impl<'a> FileEmit<'a> {
    pub fn new(g: &'a Generator, file: FileId, write: bool) -> FileEmit<'a> {
        FileEmit {
            g,
            file,
            w: Printer::new(),
            write,
            used_packages: HashSet::new(),
            init: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Prints one line at the current indent.
    pub fn p(&mut self, line: impl AsRef<str>) {
        if self.write {
            self.w.line(line);
        }
    }

    pub fn indent(&mut self) {
        self.w.indent();
    }

    pub fn outdent(&mut self) {
        self.w.outdent();
    }

    pub fn mark(&mut self) -> Mark {
        self.w.mark()
    }

    pub fn insert_line(&mut self, mark: Mark, line: &str) {
        if self.write {
            self.w.insert_line(mark, line);
        }
    }

    /// Writes the leading comment recorded for a source-info path, if
    /// there is one.
    pub fn print_comments(&mut self, path: &str) -> bool {
        if !self.write {
            return false;
        }
        comments::print(&mut self.w, &self.g.model.file(self.file).comments, path)
    }

    pub fn add_export(&mut self, object: ObjectId, symbol: Symbol) {
        self.exports.push((object, symbol));
    }

    pub fn add_init(&mut self, line: String) {
        self.init.push(line);
    }

    /// Notes that the generated code mentions `type_name`, so the package
    /// qualifying it must be imported under its name. Names that do not
    /// refer to a known type are ignored.
    pub fn record_type_use(&mut self, type_name: &str) -> Result<()> {
        if !self.g.model.has_type(type_name) {
            return Ok(());
        }
        let r = self.g.resolve(self.file, type_name)?;
        self.used_packages
            .insert(self.g.unique_package(r.via).to_string());
        Ok(())
    }

    pub fn proto_pkg(&self) -> &str {
        &self.g.proto_pkg
    }

    pub fn fmt_pkg(&self) -> &str {
        &self.g.fmt_pkg
    }

    pub fn math_pkg(&self) -> &str {
        &self.g.math_pkg
    }

    /// Name of this file's descriptor blob variable.
    pub fn var_name(&self) -> String {
        let f = self.g.model.file(self.file);
        format!("fileDescriptor{}", f.gen_index.unwrap_or(0))
    }

    /// Detaches everything printed so far, leaving an empty buffer for
    /// the header and import block.
    fn take_body(&mut self) -> Printer {
        mem::take(&mut self.w)
    }

    fn append(&mut self, body: Printer) {
        if self.write {
            self.w.raw(body.as_str());
        }
    }

    fn emit_init(&mut self) {
        let lines = mem::take(&mut self.init);
        if lines.is_empty() {
            return;
        }
        self.p("func init() {");
        self.indent();
        for line in lines {
            self.p(line);
        }
        self.outdent();
        self.p("}");
    }

    fn finish(self) -> (String, Vec<(ObjectId, Symbol)>) {
        (self.w.into_string(), self.exports)
    }

    #[cfg(test)]
    pub fn into_output(self) -> String {
        self.w.into_string()
    }
}

fn generate_file(
    g: &Generator,
    file: FileId,
    write: bool,
) -> Result<(String, Vec<(ObjectId, Symbol)>)> {
    let mut e = FileEmit::new(g, file, write);
    generate_body(&mut e)?;
    // Only now is it known which dependency packages the body mentions,
    // so the body moves aside and the header takes its place.
    let body = e.take_body();
    generate_header(&mut e);
    imports::generate_imports(&mut e)?;
    e.append(body);
    Ok(e.finish())
}

fn generate_body(e: &mut FileEmit) -> Result<()> {
    let g = e.g;
    let f = g.model.file(e.file);

    if f.gen_index == Some(0) {
        e.p("// This is a compile-time assertion to ensure that this generated file");
        e.p("// is compatible with the proto package it is being compiled against.");
        e.p("// A compilation error at this line likely means your copy of the");
        e.p("// proto package needs to be updated.");
        e.p(format!(
            "const _ = {}.ProtoPackageIsVersion2 // please upgrade the proto package",
            e.proto_pkg()
        ));
        e.p("");
    }

    for &h in &f.hoisted {
        imports::generate_imported(e, h)?;
    }
    for &id in &f.enums {
        enums::generate_enum(e, id)?;
    }
    for &id in &f.messages {
        // Map entries exist only inside their parent's map field.
        if g.model.message(id).proto.is_map_entry() {
            continue;
        }
        message::generate_message(e, id)?;
    }
    for &id in &f.extensions {
        extensions::generate_extension(e, id)?;
    }

    generate_init(e);
    blob::generate_file_descriptor(e)?;
    Ok(())
}

fn generate_init(e: &mut FileEmit) {
    let g = e.g;
    let f = g.model.file(e.file);
    for &id in &f.enums {
        enums::generate_registration(e, id);
    }
    for &id in &f.messages {
        for &ext in &g.model.message(id).extensions {
            extensions::generate_registration(e, ext);
        }
    }
    for &id in &f.extensions {
        extensions::generate_registration(e, id);
    }
    e.emit_init();
}

fn generate_header(e: &mut FileEmit) {
    let g = e.g;
    let f = g.model.file(e.file);
    e.p("// Code generated by protoc-gen-go. DO NOT EDIT.");
    e.p(format!("// source: {}", f.name()));
    e.p("");

    // Package docs go on the first generated file only.
    if f.gen_index == Some(0) {
        e.p("/*");
        e.p(format!(
            "Package {} is a generated protocol buffer package.",
            g.package_name
        ));
        e.p("");
        let key = comments::path_key(&[comments::PACKAGE_PATH]);
        if let Some(text) = f.comments.get(&key) {
            // Not comments::print, since this sits inside a block comment.
            for line in text.trim_end_matches('\n').split('\n') {
                let line = line.strip_prefix(' ').unwrap_or(line);
                // Keep the text from closing the comment early.
                e.p(line.replace("*/", "* /"));
            }
            e.p("");
        }
        let mut top_msgs = Vec::new();
        e.p("It is generated from these files:");
        for &gf in &g.model.gen_files {
            let gf = g.model.file(gf);
            e.p(format!("\t{}", gf.name()));
            for &m in &gf.messages {
                let msg = g.model.message(m);
                if msg.parent.is_some() {
                    continue;
                }
                top_msgs.push(names::camel_case_slice(&msg.type_name));
            }
        }
        e.p("");
        e.p("It has these top-level messages:");
        for name in top_msgs {
            e.p(format!("\t{name}"));
        }
        e.p("*/");
    }

    e.p(format!("package {}", g.package_name));
    e.p("");
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::descriptor::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FieldLabel, FieldType, FileDescriptorProto, FileOptions, OneofDescriptorProto,
    };

    fn field(name: &str, number: i32, typ: FieldType) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(FieldLabel::Optional),
            r#type: Some(typ),
            ..Default::default()
        }
    }

    fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
        FieldDescriptorProto {
            type_name: Some(type_name.to_string()),
            ..field(name, number, FieldType::Message)
        }
    }

    fn run(request: CodeGeneratorRequest) -> CodeGeneratorResponse {
        Generator::new(request).unwrap().run().unwrap()
    }

    fn output<'a>(response: &'a CodeGeneratorResponse, name: &str) -> &'a str {
        let file = response
            .file
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("no output file {name}"));
        file.content.as_deref().unwrap()
    }

    #[test]
    fn test_minimal_proto3_file() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["test.proto".to_string()],
            parameter: None,
            proto_file: vec![FileDescriptorProto {
                name: Some("test.proto".to_string()),
                package: Some("example".to_string()),
                syntax: Some("proto3".to_string()),
                message_type: vec![DescriptorProto {
                    name: Some("Ping".to_string()),
                    field: vec![field("name", 1, FieldType::String)],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        let response = run(request);
        assert_eq!(response.file.len(), 1);
        let out = output(&response, "test.pb.go");

        let (head, tail) = out.split_once("var fileDescriptor0 = []byte{\n").unwrap();
        let want = [
            "// Code generated by protoc-gen-go. DO NOT EDIT.",
            "// source: test.proto",
            "",
            "/*",
            "Package example is a generated protocol buffer package.",
            "",
            "It is generated from these files:",
            "\ttest.proto",
            "",
            "It has these top-level messages:",
            "\tPing",
            "*/",
            "package example",
            "",
            "import proto \"github.com/golang/protobuf/proto\"",
            "import fmt \"fmt\"",
            "import math \"math\"",
            "",
            "// Reference imports to suppress errors if they are not otherwise used.",
            "var _ = proto.Marshal",
            "var _ = fmt.Errorf",
            "var _ = math.Inf",
            "",
            "// This is a compile-time assertion to ensure that this generated file",
            "// is compatible with the proto package it is being compiled against.",
            "// A compilation error at this line likely means your copy of the",
            "// proto package needs to be updated.",
            "const _ = proto.ProtoPackageIsVersion2 // please upgrade the proto package",
            "",
            "type Ping struct {",
            "\tName string `protobuf:\"bytes,1,opt,name=name\" json:\"name,omitempty\"`",
            "}",
            "",
            "func (m *Ping) Reset() { *m = Ping{} }",
            "func (m *Ping) String() string { return proto.CompactTextString(m) }",
            "func (*Ping) ProtoMessage() {}",
            "func (*Ping) Descriptor() ([]byte, []int) { return fileDescriptor0, []int{0} }",
            "",
            "func (m *Ping) GetName() string {",
            "\tif m != nil {",
            "\t\treturn m.Name",
            "\t}",
            "\treturn \"\"",
            "}",
            "",
            "func init() {",
            "\tproto.RegisterType((*Ping)(nil), \"example.Ping\")",
            "}",
            "",
            "func init() { proto.RegisterFile(\"test.proto\", fileDescriptor0) }",
            "",
        ]
        .join("\n")
            + "\n";
        assert_eq!(head, want);
        assert!(tail.contains(" bytes of a gzipped FileDescriptorProto"));
        assert!(tail.ends_with("}\n"));
    }

    fn proto2_oneof_request() -> CodeGeneratorRequest {
        CodeGeneratorRequest {
            file_to_generate: vec!["m.proto".to_string()],
            parameter: None,
            proto_file: vec![FileDescriptorProto {
                name: Some("m.proto".to_string()),
                package: Some("pb".to_string()),
                message_type: vec![
                    DescriptorProto {
                        name: Some("M".to_string()),
                        field: vec![
                            FieldDescriptorProto {
                                default_value: Some("5".to_string()),
                                ..field("a", 1, FieldType::Int32)
                            },
                            FieldDescriptorProto {
                                oneof_index: Some(0),
                                ..field("x", 2, FieldType::String)
                            },
                            FieldDescriptorProto {
                                oneof_index: Some(0),
                                ..message_field("y", 3, ".pb.M2")
                            },
                        ],
                        oneof_decl: vec![OneofDescriptorProto {
                            name: Some("union".to_string()),
                        }],
                        ..Default::default()
                    },
                    DescriptorProto {
                        name: Some("M2".to_string()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_proto2_message_with_default_and_oneof() {
        let response = run(proto2_oneof_request());
        let out = output(&response, "m.pb.go");

        // Struct layout, with the oneof members replaced by the union
        // field and the wrapper list filled in after the fact.
        assert!(out.contains(
            "type M struct {\n\
             \tA *int32 `protobuf:\"varint,1,opt,name=a,def=5\" json:\"a,omitempty\"`\n\
             \t// Types that are valid to be assigned to Union:\n\
             \t//\t*M_X\n\
             \t//\t*M_Y\n\
             \tUnion isM_Union `protobuf_oneof:\"union\"`\n\
             \tXXX_unrecognized []byte `json:\"-\"`\n\
             }\n"
        ));

        // Default constant and the getter falling back to it.
        assert!(out.contains("const Default_M_A int32 = 5\n"));
        assert!(out.contains(
            "func (m *M) GetA() int32 {\n\
             \tif m != nil && m.A != nil {\n\
             \t\treturn *m.A\n\
             \t}\n\
             \treturn Default_M_A\n\
             }\n"
        ));

        // Oneof interface, wrappers, markers, and the union getter.
        assert!(out.contains("type isM_Union interface {\n\tisM_Union()\n}\n"));
        assert!(
            out.contains("type M_X struct {\n\tX string `protobuf:\"bytes,2,opt,name=x,oneof\"`\n}\n")
        );
        assert!(
            out.contains("type M_Y struct {\n\tY *M2 `protobuf:\"bytes,3,opt,name=y,oneof\"`\n}\n")
        );
        assert!(out.contains("func (*M_X) isM_Union() {}\n"));
        assert!(out.contains("func (m *M) GetUnion() isM_Union {"));

        // Member getters reach through the union.
        assert!(out.contains(
            "func (m *M) GetX() string {\n\
             \tif x, ok := m.GetUnion().(*M_X); ok {\n\
             \t\treturn x.X\n\
             \t}\n\
             \treturn \"\"\n\
             }\n"
        ));
        assert!(out.contains(
            "func (m *M) GetY() *M2 {\n\
             \tif x, ok := m.GetUnion().(*M_Y); ok {\n\
             \t\treturn x.Y\n\
             \t}\n\
             \treturn nil\n\
             }\n"
        ));

        // The three oneof codec functions and their registration hook.
        assert!(out.contains("// XXX_OneofFuncs is for the internal use of the proto package.\n"));
        assert!(out.contains(
            "func (*M) XXX_OneofFuncs() (func(msg proto.Message, b *proto.Buffer) error, \
             func(msg proto.Message, tag, wire int, b *proto.Buffer) (bool, error), \
             func(msg proto.Message) (n int), []interface{}) {"
        ));
        assert!(out.contains("func _M_OneofMarshaler(msg proto.Message, b *proto.Buffer) error {"));
        assert!(out.contains("\tcase *M_X:\n\t\tb.EncodeVarint(2<<3 | proto.WireBytes)\n"));
        assert!(out.contains("\t\tif err := b.EncodeMessage(x.Y); err != nil {"));
        assert!(out.contains("\tcase 3: // union.y\n"));
        assert!(out.contains("\t\tmsg := new(M2)\n"));
        assert!(out.contains("\t\ts := proto.Size(x.Y)\n"));

        // Both messages register themselves.
        assert!(out.contains("\tproto.RegisterType((*M)(nil), \"pb.M\")\n"));
        assert!(out.contains("\tproto.RegisterType((*M2)(nil), \"pb.M2\")\n"));
    }

    #[test]
    fn test_transitive_public_import_is_aliased_through_direct_dependency() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["top.proto".to_string()],
            parameter: None,
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("base.proto".to_string()),
                    package: Some("base".to_string()),
                    message_type: vec![DescriptorProto {
                        name: Some("Base".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("mid.proto".to_string()),
                    package: Some("mid".to_string()),
                    dependency: vec!["base.proto".to_string()],
                    public_dependency: vec![0],
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("top.proto".to_string()),
                    package: Some("top".to_string()),
                    dependency: vec!["mid.proto".to_string()],
                    public_dependency: vec![0],
                    ..Default::default()
                },
            ],
        };
        let response = run(request);
        let out = output(&response, "top.pb.go");

        // Base is defined two hops away; everything goes through mid, the
        // only package the generated file can import.
        assert!(out.contains("// Base from public import base.proto\n"));
        assert!(out.contains("type Base mid.Base\n"));
        assert!(out.contains("func (m *Base) Reset() { (*mid.Base)(m).Reset() }\n"));
        assert!(
            out.contains("func (m *Base) String() string { return (*mid.Base)(m).String() }\n")
        );
        assert!(out.contains("func (*Base) ProtoMessage() {}\n"));
        assert!(out.contains("import mid \".\"\n"));
        assert!(!out.contains("import base"));
    }

    #[test]
    fn test_public_import_of_generated_file_is_ignored() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["base.proto".to_string(), "top.proto".to_string()],
            parameter: None,
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("base.proto".to_string()),
                    package: Some("app".to_string()),
                    message_type: vec![DescriptorProto {
                        name: Some("Base".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("top.proto".to_string()),
                    package: Some("app".to_string()),
                    dependency: vec!["base.proto".to_string()],
                    public_dependency: vec![0],
                    ..Default::default()
                },
            ],
        };
        let response = run(request);
        assert_eq!(response.file.len(), 2);

        let base = output(&response, "base.pb.go");
        assert!(base.contains("type Base struct {"));
        assert!(base.contains("ProtoPackageIsVersion2"));

        // Base lands in the same output package, so no alias is wanted.
        let top = output(&response, "top.pb.go");
        assert!(top.contains("// Ignoring public import of Base from base.proto\n"));
        assert!(!top.contains("type Base"));
        // Only the first file carries the package docs and version guard.
        assert!(!top.contains("ProtoPackageIsVersion2"));
        assert!(!top.contains("/*"));
        assert!(top.contains("var fileDescriptor1 = []byte{"));
    }

    #[test]
    fn test_proto_package_moves_aside_for_support_package() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["p.proto".to_string()],
            parameter: None,
            proto_file: vec![FileDescriptorProto {
                name: Some("p.proto".to_string()),
                package: Some("proto".to_string()),
                ..Default::default()
            }],
        };
        let response = run(request);
        let out = output(&response, "p.pb.go");

        // The runtime import keeps the plain name; the output package is
        // the one renamed.
        assert!(out.contains("package proto1\n"));
        assert!(out.contains("import proto \"github.com/golang/protobuf/proto\"\n"));
        assert!(out.contains("var _ = proto.Marshal\n"));
    }

    #[test]
    fn test_dependency_sharing_the_output_package_name_is_suffixed() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_string()],
            parameter: None,
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("dep.proto".to_string()),
                    package: Some("pb".to_string()),
                    message_type: vec![DescriptorProto {
                        name: Some("Other".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("a.proto".to_string()),
                    package: Some("pb".to_string()),
                    dependency: vec!["dep.proto".to_string()],
                    message_type: vec![DescriptorProto {
                        name: Some("A".to_string()),
                        field: vec![message_field("o", 1, ".pb.Other")],
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
        };
        let response = run(request);
        let out = output(&response, "a.pb.go");

        assert!(
            out.contains("\tO *pb1.Other `protobuf:\"bytes,1,opt,name=o\" json:\"o,omitempty\"`\n")
        );
        assert!(out.contains("import pb1 \".\"\n"));
        assert!(out.contains("func (m *A) GetO() *pb1.Other {"));
    }

    #[test]
    fn test_go_package_option_sets_name_and_path() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["m.proto".to_string()],
            parameter: None,
            proto_file: vec![FileDescriptorProto {
                name: Some("m.proto".to_string()),
                package: Some("x".to_string()),
                options: Some(FileOptions {
                    go_package: Some("github.com/acme/widgets;widgets".to_string()),
                }),
                message_type: vec![DescriptorProto {
                    name: Some("W".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        let response = run(request);
        let out = output(&response, "github.com/acme/widgets/m.pb.go");
        assert!(out.contains("package widgets\n"));
        assert!(out.contains("Package widgets is a generated protocol buffer package."));
    }

    #[test]
    fn test_weak_import_is_commented_out() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_string()],
            parameter: None,
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("w.proto".to_string()),
                    package: Some("wk".to_string()),
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("a.proto".to_string()),
                    package: Some("pb".to_string()),
                    dependency: vec!["w.proto".to_string()],
                    weak_dependency: vec![0],
                    ..Default::default()
                },
            ],
        };
        let response = run(request);
        let out = output(&response, "a.pb.go");
        assert!(out.contains("// skipping weak import wk \".\"\n"));
        assert!(!out.contains("\nimport wk"));
    }

    #[test]
    fn test_import_prefix_and_import_map_rewrite_paths() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_string()],
            parameter: Some("import_prefix=corp/,Mvendor.proto=example.com/vendor".to_string()),
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("vendor.proto".to_string()),
                    package: Some("vnd".to_string()),
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("a.proto".to_string()),
                    package: Some("pb".to_string()),
                    dependency: vec!["vendor.proto".to_string()],
                    ..Default::default()
                },
            ],
        };
        let response = run(request);
        let out = output(&response, "a.pb.go");
        assert!(out.contains("import proto \"corp/github.com/golang/protobuf/proto\"\n"));
        // The dependency is unreferenced, so it is imported blank.
        assert!(out.contains("import _ \"corp/example.com/vendor\"\n"));
    }

    #[test]
    fn test_second_file_of_package_skips_shared_preamble() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_string(), "b.proto".to_string()],
            parameter: None,
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("a.proto".to_string()),
                    package: Some("pb".to_string()),
                    message_type: vec![DescriptorProto {
                        name: Some("A".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("b.proto".to_string()),
                    package: Some("pb".to_string()),
                    message_type: vec![DescriptorProto {
                        name: Some("B".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
        };
        let response = run(request);

        let a = output(&response, "a.pb.go");
        assert!(a.contains("It is generated from these files:\n\ta.proto\n\tb.proto\n"));
        assert!(a.contains("It has these top-level messages:\n\tA\n\tB\n"));
        assert!(a.contains("ProtoPackageIsVersion2"));
        assert!(a.contains("var fileDescriptor0 = []byte{"));

        let b = output(&response, "b.pb.go");
        assert!(b.contains("package pb\n"));
        assert!(!b.contains("/*"));
        assert!(!b.contains("ProtoPackageIsVersion2"));
        assert!(b.contains("var fileDescriptor1 = []byte{"));
        assert!(
            b.contains("func (*B) Descriptor() ([]byte, []int) { return fileDescriptor1, []int{0} }")
        );
    }

    #[test]
    fn test_implicit_package_mismatch_fails() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_string(), "b.proto".to_string()],
            parameter: None,
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("a.proto".to_string()),
                    package: Some("x".to_string()),
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("b.proto".to_string()),
                    package: Some("y".to_string()),
                    ..Default::default()
                },
            ],
        };
        let err = Generator::new(request).err().unwrap().to_string();
        assert!(err.contains("inconsistent package names: y x"), "{err}");
    }

    #[test]
    fn test_import_path_parameter_overrides_implicit_packages() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_string(), "b.proto".to_string()],
            parameter: Some("import_path=github.com/acme/mixed".to_string()),
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("a.proto".to_string()),
                    package: Some("x".to_string()),
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("b.proto".to_string()),
                    package: Some("y".to_string()),
                    ..Default::default()
                },
            ],
        };
        let response = run(request);
        assert!(output(&response, "a.pb.go").contains("package mixed\n"));
        assert!(output(&response, "b.pb.go").contains("package mixed\n"));
    }

    #[test]
    fn test_enum_field_defaults() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["e.proto".to_string()],
            parameter: None,
            proto_file: vec![FileDescriptorProto {
                name: Some("e.proto".to_string()),
                package: Some("pb".to_string()),
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
                    ],
                }],
                message_type: vec![DescriptorProto {
                    name: Some("M".to_string()),
                    field: vec![
                        FieldDescriptorProto {
                            type_name: Some(".pb.Kind".to_string()),
                            ..field("k", 1, FieldType::Enum)
                        },
                        FieldDescriptorProto {
                            type_name: Some(".pb.Kind".to_string()),
                            default_value: Some("SECOND".to_string()),
                            ..field("kd", 2, FieldType::Enum)
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        let response = run(request);
        let out = output(&response, "e.pb.go");

        // The tag carries the enum's proto name and the default's number.
        assert!(out.contains(
            "\tK *Kind `protobuf:\"varint,1,opt,name=k,enum=pb.Kind\" json:\"k,omitempty\"`\n"
        ));
        assert!(out.contains(
            "\tKd *Kind `protobuf:\"varint,2,opt,name=kd,enum=pb.Kind,def=5\" json:\"kd,omitempty\"`\n"
        ));
        assert!(out.contains("const Default_M_Kd Kind = Kind_SECOND\n"));

        // Without a declared default the getter falls back to the first
        // value, which is not necessarily zero.
        assert!(out.contains(
            "func (m *M) GetK() Kind {\n\
             \tif m != nil && m.K != nil {\n\
             \t\treturn *m.K\n\
             \t}\n\
             \treturn Kind_FIRST\n\
             }\n"
        ));
        assert!(out.contains("\treturn Default_M_Kd\n"));
    }
}
