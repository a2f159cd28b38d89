// Wrapped descriptor tree
//
// The raw descriptors arrive as a nested tree per file. This module
// flattens them into arena vectors with parent links, precomputed dotted
// type names and source-info paths, builds the fully-qualified type lookup
// table, and expands the public-import closure of every file. Everything
// downstream works in terms of the ids handed out here.

use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::codegen::comments;
use crate::descriptor::{
    CodeGeneratorRequest, DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FieldType,
    FileDescriptorProto,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnumId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExtensionId(pub usize);

/// Anything that can be named across files and carried through an export
/// table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectId {
    Message(MessageId),
    Enum(EnumId),
    Extension(ExtensionId),
}

/// An object re-exported into a file by a public import, together with
/// the direct dependency it arrived through. For a chained re-export the
/// carrier is the public dependency itself, not the defining file, so the
/// generated alias only ever references a package the file imports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hoisted {
    pub object: ObjectId,
    pub via: FileId,
}

/// One file of the compilation, raw descriptor plus wrapped contents.
#[derive(Debug)]
pub struct FileNode {
    pub proto: FileDescriptorProto,
    /// Every message in the file, parents before their children.
    pub messages: Vec<MessageId>,
    /// Top-level enums first, then enums nested in messages, in message
    /// order.
    pub enums: Vec<EnumId>,
    /// Extensions declared at file scope.
    pub extensions: Vec<ExtensionId>,
    /// Objects re-exported here from public imports, in replay order.
    pub hoisted: Vec<Hoisted>,
    /// Leading comments keyed by source-info path.
    pub comments: HashMap<String, String>,
    /// Aliases to emit when another file publicly imports an object of
    /// this file, keyed by that object.
    pub exports: HashMap<ObjectId, Vec<Symbol>>,
    /// Position among the files selected for output, if any.
    pub gen_index: Option<usize>,
    pub proto3: bool,
}

/// go_package option, split into its parts.
pub struct GoPackageOption {
    /// Import path portion; empty when the option is a bare name.
    pub import_path: String,
    pub package: String,
}

impl FileNode {
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    pub fn go_package_option(&self) -> Option<GoPackageOption> {
        let pkg = self.proto.go_package();
        if pkg.is_empty() {
            return None;
        }
        // The presence of a slash implies there's an import path.
        let Some(slash) = pkg.rfind('/') else {
            return Some(GoPackageOption {
                import_path: String::new(),
                package: pkg.to_string(),
            });
        };
        let (imp, name) = (pkg, &pkg[slash + 1..]);
        // A semicolon-delimited suffix overrides the package name.
        match imp.find(';') {
            Some(sc) => Some(GoPackageOption {
                import_path: imp[..sc].to_string(),
                package: imp[sc + 1..].to_string(),
            }),
            None => Some(GoPackageOption {
                import_path: imp.to_string(),
                package: name.to_string(),
            }),
        }
    }

    /// The package name to generate, and whether it came from an explicit
    /// go_package option.
    pub fn go_package_name(&self) -> (String, bool) {
        if let Some(opt) = self.go_package_option() {
            return (opt.package, true);
        }
        let pkg = self.proto.package();
        if !pkg.is_empty() {
            return (pkg.to_string(), false);
        }
        (super::names::base_name(self.name()).to_string(), false)
    }

    /// The output file name, relocated under the go_package import path
    /// when one is declared.
    pub fn go_file_name(&self) -> String {
        let mut name = self.name().to_string();
        if let Some(stripped) = name
            .strip_suffix(".proto")
            .or_else(|| name.strip_suffix(".protodevel"))
            .map(str::to_string)
        {
            name = stripped;
        }
        name.push_str(".pb.go");

        if let Some(opt) = self.go_package_option() {
            if !opt.import_path.is_empty() {
                // Replace the existing dirname with the declared import path.
                let base = match name.rfind('/') {
                    Some(i) => name[i + 1..].to_string(),
                    None => name,
                };
                return format!("{}/{}", opt.import_path, base);
            }
        }
        name
    }
}

#[derive(Debug)]
pub struct MessageNode {
    pub proto: DescriptorProto,
    pub file: FileId,
    pub parent: Option<MessageId>,
    pub nested: Vec<MessageId>,
    pub extensions: Vec<ExtensionId>,
    /// Index in the parent's nested list, or in the file's top-level list.
    pub index: usize,
    /// Source-info path of this message's declaration.
    pub path: String,
    /// Name chain from the outermost message down, without the package.
    pub type_name: Vec<String>,
    /// Whether the containing message refers to this one as a group.
    pub group: bool,
}

#[derive(Debug)]
pub struct EnumNode {
    pub proto: EnumDescriptorProto,
    pub file: FileId,
    pub parent: Option<MessageId>,
    pub index: usize,
    pub path: String,
    pub type_name: Vec<String>,
}

#[derive(Debug)]
pub struct ExtensionNode {
    pub field: FieldDescriptorProto,
    pub file: FileId,
    pub parent: Option<MessageId>,
    /// Parent name chain plus the extension's own field name.
    pub type_name: Vec<String>,
}

/// A reference to a named type as seen from some file: the object itself
/// plus the file whose package qualifies it there. For a type reached
/// through a public import the qualifying file is the re-exporting direct
/// dependency, not the defining file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub object: ObjectId,
    pub via: FileId,
}

// Exported symbols, recorded while generating a file so that files which
// publicly import it can replay them as aliases.

#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    Message(MessageSymbol),
    Enum(EnumSymbol),
    ConstOrVar(ConstOrVarSymbol),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageSymbol {
    pub sym: String,
    pub has_extensions: bool,
    pub is_message_set: bool,
    pub has_oneof: bool,
    pub getters: Vec<GetterSymbol>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetterSymbol {
    pub name: String,
    pub typ: String,
    /// Canonical proto name of the returned type; empty for plain scalars.
    pub type_name: String,
    /// Whether `typ` mentions a generated type that needs requalifying.
    pub gen_type: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumSymbol {
    pub name: String,
    /// Whether this came from a proto3 file.
    pub proto3: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeclKind {
    Const,
    Var,
}

impl DeclKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DeclKind::Const => "const",
            DeclKind::Var => "var",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstOrVarSymbol {
    pub sym: String,
    pub kind: DeclKind,
    /// If non-empty, a type cast is required (used for enums).
    pub cast: String,
}

/// The whole compilation, wrapped.
#[derive(Debug)]
pub struct Model {
    pub files: Vec<FileNode>,
    pub messages: Vec<MessageNode>,
    pub enums: Vec<EnumNode>,
    pub extensions: Vec<ExtensionNode>,
    /// Files selected for output, in request order.
    pub gen_files: Vec<FileId>,
    by_file_name: HashMap<String, FileId>,
    by_type_name: HashMap<String, ObjectId>,
}

impl Model {
    pub fn build(request: CodeGeneratorRequest) -> Result<Model> {
        let mut model = Model {
            files: Vec::with_capacity(request.proto_file.len()),
            messages: Vec::new(),
            enums: Vec::new(),
            extensions: Vec::new(),
            gen_files: Vec::new(),
            by_file_name: HashMap::new(),
            by_type_name: HashMap::new(),
        };

        for proto in request.proto_file {
            model.wrap_file(proto)?;
        }
        for id in 0..model.files.len() {
            model.check_nesting(FileId(id))?;
        }

        // Select the files to generate, in the order requested.
        for (i, name) in request.file_to_generate.iter().enumerate() {
            let Some(&id) = model.by_file_name.get(name) else {
                bail!("could not find file named {name}");
            };
            model.files[id.0].gen_index = Some(i);
            model.gen_files.push(id);
        }

        model.expand_public_imports()?;
        model.build_type_name_map();
        Ok(model)
    }

    pub fn file(&self, id: FileId) -> &FileNode {
        &self.files[id.0]
    }

    pub fn message(&self, id: MessageId) -> &MessageNode {
        &self.messages[id.0]
    }

    pub fn enum_def(&self, id: EnumId) -> &EnumNode {
        &self.enums[id.0]
    }

    pub fn extension(&self, id: ExtensionId) -> &ExtensionNode {
        &self.extensions[id.0]
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.by_type_name.contains_key(name)
    }

    pub fn file_by_name(&self, name: &str) -> Option<FileId> {
        self.by_file_name.get(name).copied()
    }

    /// The file an object was defined in.
    pub fn file_of(&self, object: ObjectId) -> FileId {
        match object {
            ObjectId::Message(id) => self.message(id).file,
            ObjectId::Enum(id) => self.enum_def(id).file,
            ObjectId::Extension(id) => self.extension(id).file,
        }
    }

    /// The object's name chain below its package.
    pub fn type_name_of(&self, object: ObjectId) -> &[String] {
        match object {
            ObjectId::Message(id) => &self.message(id).type_name,
            ObjectId::Enum(id) => &self.enum_def(id).type_name,
            ObjectId::Extension(id) => &self.extension(id).type_name,
        }
    }

    /// Indexes from the file's top-level message list down to this
    /// message, one per nesting level.
    pub fn index_path(&self, id: MessageId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(m) = cursor {
            let node = self.message(m);
            path.push(node.index);
            cursor = node.parent;
        }
        path.reverse();
        path
    }

    /// Looks up a fully-qualified type name (with leading dot) as seen
    /// from `from`. The type must be defined there, in a direct
    /// dependency, or re-exported into a direct dependency by a chain of
    /// public imports; anything else is an error, since the generated
    /// import block could never make the reference compile.
    pub fn resolve(&self, from: FileId, type_name: &str) -> Result<Resolved> {
        let Some(&object) = self.by_type_name.get(type_name) else {
            bail!("can't find object with type {type_name}");
        };
        let def = self.file_of(object);
        let def_name = self.file(def).name();
        let from_node = self.file(from);
        let direct =
            def == from || from_node.proto.dependency.iter().any(|d| d == def_name);
        if direct {
            return Ok(Resolved { object, via: def });
        }
        for dep_name in &from_node.proto.dependency {
            let Some(dep) = self.file_by_name(dep_name) else {
                continue;
            };
            if self.file(dep).hoisted.iter().any(|h| h.object == object) {
                return Ok(Resolved { object, via: dep });
            }
        }
        bail!(
            "{}: {type_name} is defined in {def_name}, which is neither imported directly \
             nor re-exported by a public import of a direct dependency",
            from_node.name(),
        );
    }

    pub fn add_export(&mut self, file: FileId, object: ObjectId, symbol: Symbol) {
        self.files[file.0]
            .exports
            .entry(object)
            .or_default()
            .push(symbol);
    }

    fn wrap_file(&mut self, proto: FileDescriptorProto) -> Result<()> {
        let id = FileId(self.files.len());
        let comments = comments::extract(&proto);
        let proto3 = proto.is_proto3();

        let mut wrapper = FileWrapper {
            model: self,
            file: id,
            package: proto.package().to_string(),
        };

        let mut messages = Vec::new();
        for (i, msg) in proto.message_type.iter().enumerate() {
            let path = comments::path_key(&[comments::MESSAGE_PATH, i as i32]);
            let wrapped = wrapper.wrap_message(None, msg, i, path, &[])?;
            messages.extend(wrapped);
        }

        let mut enums = Vec::new();
        for (i, e) in proto.enum_type.iter().enumerate() {
            let path = comments::path_key(&[comments::ENUM_PATH, i as i32]);
            enums.push(wrapper.wrap_enum(None, e.clone(), i, path, &[]));
        }
        // Enums within messages. Enums within embedded messages appear in
        // the outermost message.
        for &m in &messages {
            let node = wrapper.model.message(m);
            let (parent_path, parent_names) = (node.path.clone(), node.type_name.clone());
            for i in 0..wrapper.model.message(m).proto.enum_type.len() {
                let e = wrapper.model.message(m).proto.enum_type[i].clone();
                let path = comments::child_key(&parent_path, comments::MESSAGE_ENUM_PATH, i);
                enums.push(wrapper.wrap_enum(Some(m), e, i, path, &parent_names));
            }
        }

        let mut extensions = Vec::new();
        for field in &proto.extension {
            extensions.push(wrapper.wrap_extension(None, field, &[])?);
        }

        let name = proto.name().to_string();
        if self.by_file_name.insert(name.clone(), id).is_some() {
            bail!("duplicate file name {name}");
        }
        self.files.push(FileNode {
            proto,
            messages,
            enums,
            extensions,
            hoisted: Vec::new(),
            comments,
            exports: HashMap::new(),
            gen_index: None,
            proto3,
        });
        Ok(())
    }

    /// Verifies every wrapped child is attached exactly where the raw
    /// descriptor says it should be.
    fn check_nesting(&self, file: FileId) -> Result<()> {
        for &m in &self.file(file).messages {
            let node = self.message(m);
            let attached = self
                .messages
                .iter()
                .filter(|n| n.parent == Some(m))
                .count();
            if attached != node.proto.nested_type.len() {
                bail!("internal error: nesting failure for {}", node.proto.name());
            }
            let attached = self.enums.iter().filter(|n| n.parent == Some(m)).count();
            if attached != node.proto.enum_type.len() {
                bail!(
                    "internal error: enum nesting failure for {}",
                    node.proto.name()
                );
            }
        }
        Ok(())
    }

    /// Fills each file's hoist list: every message (except map entries),
    /// enum, and file-level extension of every public dependency, plus
    /// whatever those dependencies hoisted themselves. Files arrive
    /// dependencies-first, so a dependency's list is always complete by
    /// the time it is copied. A diamond of public imports can deliver the
    /// same object twice; the first carrier wins.
    fn expand_public_imports(&mut self) -> Result<()> {
        for id in 0..self.files.len() {
            let deps = self.files[id].proto.dependency.clone();
            let publics = self.files[id].proto.public_dependency.clone();
            let mut hoisted: Vec<Hoisted> = Vec::new();
            let push = |hoisted: &mut Vec<Hoisted>, object, via| {
                if !hoisted.iter().any(|h| h.object == object) {
                    hoisted.push(Hoisted { object, via });
                }
            };
            for index in publics {
                let Some(dep_name) = deps.get(index as usize) else {
                    bail!(
                        "internal error: {} has public dependency index {index} out of range",
                        self.files[id].name()
                    );
                };
                let Some(dep) = self.file_by_name(dep_name) else {
                    bail!("could not find file named {dep_name}");
                };
                let dep_node = self.file(dep);
                for &m in &dep_node.messages {
                    if self.message(m).proto.is_map_entry() {
                        continue;
                    }
                    push(&mut hoisted, ObjectId::Message(m), dep);
                }
                for &e in &dep_node.enums {
                    push(&mut hoisted, ObjectId::Enum(e), dep);
                }
                for &x in &dep_node.extensions {
                    push(&mut hoisted, ObjectId::Extension(x), dep);
                }
                for i in 0..self.file(dep).hoisted.len() {
                    let chained = self.file(dep).hoisted[i].object;
                    push(&mut hoisted, chained, dep);
                }
            }
            self.files[id].hoisted = hoisted;
        }
        Ok(())
    }

    fn build_type_name_map(&mut self) {
        let mut map = HashMap::new();
        for file in &self.files {
            let mut dotted = format!(".{}", file.proto.package());
            if dotted != "." {
                dotted.push('.');
            }
            for &e in &file.enums {
                let name = format!("{dotted}{}", self.enums[e.0].type_name.join("."));
                map.insert(name, ObjectId::Enum(e));
            }
            for &m in &file.messages {
                let name = format!("{dotted}{}", self.messages[m.0].type_name.join("."));
                map.insert(name, ObjectId::Message(m));
            }
        }
        self.by_type_name = map;
    }
}

/// Carries the per-file constants through the recursive wrap.
struct FileWrapper<'a> {
    model: &'a mut Model,
    file: FileId,
    package: String,
}

impl FileWrapper<'_> {
    /// Wraps a message and its descendants, returning them in wrap order,
    /// the message itself first.
    fn wrap_message(
        &mut self,
        parent: Option<MessageId>,
        proto: &DescriptorProto,
        index: usize,
        path: String,
        parent_names: &[String],
    ) -> Result<Vec<MessageId>> {
        let mut type_name = parent_names.to_vec();
        type_name.push(proto.name().to_string());

        for field in &proto.field {
            validate_field(field, &type_name)?;
        }

        // The only way to distinguish a group from a message is whether
        // the containing message has a TYPE_GROUP field that refers to it.
        let mut group = false;
        if let Some(p) = parent {
            let mut parts = type_name.clone();
            if !self.package.is_empty() {
                parts.insert(0, self.package.clone());
            }
            let expected = format!(".{}", parts.join("."));
            group = self
                .model
                .message(p)
                .proto
                .field
                .iter()
                .any(|f| f.field_type() == FieldType::Group && f.type_name() == expected);
        }

        let id = MessageId(self.model.messages.len());
        self.model.messages.push(MessageNode {
            proto: proto.clone(),
            file: self.file,
            parent,
            nested: Vec::new(),
            extensions: Vec::new(),
            index,
            path: path.clone(),
            type_name: type_name.clone(),
            group,
        });

        let mut extensions = Vec::new();
        for field in &proto.extension {
            extensions.push(self.wrap_extension(Some(id), field, &type_name)?);
        }
        self.model.messages[id.0].extensions = extensions;

        let mut all = vec![id];
        let mut nested = Vec::new();
        for (i, child) in proto.nested_type.iter().enumerate() {
            let child_path = comments::child_key(&path, comments::MESSAGE_MESSAGE_PATH, i);
            let wrapped = self.wrap_message(Some(id), child, i, child_path, &type_name)?;
            nested.push(wrapped[0]);
            all.extend(wrapped);
        }
        self.model.messages[id.0].nested = nested;
        Ok(all)
    }

    fn wrap_enum(
        &mut self,
        parent: Option<MessageId>,
        proto: EnumDescriptorProto,
        index: usize,
        path: String,
        parent_names: &[String],
    ) -> EnumId {
        let mut type_name = parent_names.to_vec();
        type_name.push(proto.name().to_string());
        let id = EnumId(self.model.enums.len());
        self.model.enums.push(EnumNode {
            proto,
            file: self.file,
            parent,
            index,
            path,
            type_name,
        });
        id
    }

    fn wrap_extension(
        &mut self,
        parent: Option<MessageId>,
        field: &FieldDescriptorProto,
        parent_names: &[String],
    ) -> Result<ExtensionId> {
        let mut type_name = parent_names.to_vec();
        type_name.push(field.name().to_string());
        validate_field(field, &type_name)?;
        if field.extendee.as_deref().unwrap_or_default().is_empty() {
            bail!("internal error: extension {} has no extendee", field.name());
        }
        let id = ExtensionId(self.model.extensions.len());
        self.model.extensions.push(ExtensionNode {
            field: field.clone(),
            file: self.file,
            parent,
            type_name,
        });
        Ok(id)
    }
}

fn validate_field(field: &FieldDescriptorProto, scope: &[String]) -> Result<()> {
    let place = || format!("{}.{}", scope.join("."), field.name());
    if field.name.as_deref().unwrap_or_default().is_empty() {
        bail!("internal error: field without a name in {}", scope.join("."));
    }
    if field.number.is_none() {
        bail!("internal error: field {} has no number", place());
    }
    if field.label.is_none() {
        bail!("internal error: field {} has no label", place());
    }
    let Some(typ) = field.r#type else {
        bail!("internal error: field {} has no type", place());
    };
    match typ {
        FieldType::Message | FieldType::Enum | FieldType::Group => {
            if field.type_name().is_empty() {
                bail!("internal error: field {} has no type name", place());
            }
        }
        _ => {}
    }
    Ok(())
}
