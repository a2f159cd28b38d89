// protogo compiles protocol-buffer descriptor sets into Go source
// bindings for the github.com/golang/protobuf runtime. The input is a
// plugin-style CodeGeneratorRequest carrying pre-parsed descriptors; the
// output is one .pb.go unit per requested file.

pub mod codegen;
pub mod descriptor;

pub use codegen::generate;
