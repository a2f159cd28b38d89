//! Raw descriptor tree and plugin request/response types.
//!
//! These mirror the schema-compiler's descriptor protos one-to-one. The
//! frontend hands the whole set over in a [`CodeGeneratorRequest`]; nothing
//! here is interpreted beyond field access. JSON names follow the original
//! proto field names, with enum values in snake_case.

use serde::{Deserialize, Serialize};

/// The set of files to compile, as delivered by the frontend.
///
/// `proto_file` contains every transitively required file, topologically
/// ordered so that dependencies precede their dependents. `file_to_generate`
/// names the subset that should produce output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeGeneratorRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_to_generate: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proto_file: Vec<FileDescriptorProto>,
}

/// One generated source unit per requested file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeGeneratorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file: Vec<ResponseFile>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Describes a complete .proto file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Names of files imported by this file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency: Vec<String>,
    /// Indexes into `dependency` of files whose exports are re-exported here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_dependency: Vec<i32>,
    /// Indexes into `dependency` of weak imports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weak_dependency: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_type: Vec<DescriptorProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_type: Vec<EnumDescriptorProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<ServiceDescriptorProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<FieldDescriptorProto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FileOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code_info: Option<SourceCodeInfo>,
    /// "proto2" or "proto3"; absent means proto2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<String>,
}

impl FileDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn package(&self) -> &str {
        self.package.as_deref().unwrap_or_default()
    }

    pub fn is_proto3(&self) -> bool {
        self.syntax.as_deref() == Some("proto3")
    }

    pub fn go_package(&self) -> &str {
        self.options
            .as_ref()
            .and_then(|o| o.go_package.as_deref())
            .unwrap_or_default()
    }
}

/// Describes a message type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field: Vec<FieldDescriptorProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<FieldDescriptorProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_type: Vec<DescriptorProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_type: Vec<EnumDescriptorProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension_range: Vec<ExtensionRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub oneof_decl: Vec<OneofDescriptorProto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<MessageOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_range: Vec<ReservedRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_name: Vec<String>,
}

impl DescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Whether this is the synthetic entry message for a map field.
    pub fn is_map_entry(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.map_entry == Some(true))
    }

    pub fn is_message_set(&self) -> bool {
        self.options
            .as_ref()
            .is_some_and(|o| o.message_set_wire_format == Some(true))
    }
}

/// Inclusive-start, exclusive-end extension number range.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservedRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i32>,
}

/// Describes a field within a message, or an extension.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<FieldLabel>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<FieldType>,
    /// For message/enum/group kinds, the fully-qualified referenced type,
    /// with a leading dot: `.pkg.Msg.Nested`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// For extensions, the fully-qualified extended message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extendee: Option<String>,
    /// Textual default: literal for scalars, value name for enums,
    /// C-escaped for bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptions>,
}

impl FieldDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn number(&self) -> i32 {
        self.number.unwrap_or_default()
    }

    /// The declared kind. Validated present during model construction;
    /// message-typed is the fallback a malformed node would take after that.
    pub fn field_type(&self) -> FieldType {
        self.r#type.unwrap_or(FieldType::Message)
    }

    pub fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or_default()
    }

    pub fn extendee(&self) -> &str {
        self.extendee.as_deref().unwrap_or_default()
    }

    pub fn json_name(&self) -> &str {
        self.json_name.as_deref().unwrap_or_default()
    }

    pub fn is_optional(&self) -> bool {
        self.label == Some(FieldLabel::Optional)
    }

    pub fn is_required(&self) -> bool {
        self.label == Some(FieldLabel::Required)
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Some(FieldLabel::Repeated)
    }

    pub fn is_weak(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.weak == Some(true))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Double = 1,
    Float = 2,
    Int64 = 3,
    Uint64 = 4,
    Int32 = 5,
    Fixed64 = 6,
    Fixed32 = 7,
    Bool = 8,
    String = 9,
    Group = 10,
    Message = 11,
    Bytes = 12,
    Uint32 = 13,
    Enum = 14,
    Sfixed32 = 15,
    Sfixed64 = 16,
    Sint32 = 17,
    Sint64 = 18,
}

impl FieldType {
    /// Wire-format enum number, for re-encoding descriptors.
    pub fn number(self) -> i32 {
        self as i32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLabel {
    Optional = 1,
    Required = 2,
    Repeated = 3,
}

impl FieldLabel {
    pub fn number(self) -> i32 {
        self as i32
    }
}

/// Describes an enum type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumDescriptorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<EnumValueDescriptorProto>,
}

impl EnumDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumValueDescriptorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i32>,
}

impl EnumValueDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn number(&self) -> i32 {
        self.number.unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OneofDescriptorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl OneofDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// Services ride along in the descriptor set and the embedded blob, but no
/// stubs are generated for them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub method: Vec<MethodDescriptorProto>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_streaming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_streaming: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_package: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_set_wire_format: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_entry: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weak: Option<bool>,
}

/// Comment and position information for the elements of a file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCodeInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<Location>,
}

/// One located element. `path` alternates field numbers of repeated fields
/// with indexes into them, rooted at the file descriptor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub span: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leading_comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_comments: Option<String>,
}
