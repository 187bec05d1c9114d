//! Turns a declarative API document into callable tool definitions.
//!
//! `document` loads YAML/JSON, `resolver` inlines `$ref`s and flattens `allOf`,
//! `extractor` produces one [`OperationDescriptor`] per (path, verb) and
//! `generator` derives tool names, signatures and requests from them.

pub mod document;
pub mod extractor;
pub mod generator;
pub mod resolver;

pub use document::ApiDocument;
pub use extractor::{
    extract_operations, HttpMethod, OperationDescriptor, ParamLocation, ParameterDescriptor,
};
pub use generator::{generate_tools, ArgKind, GeneratedTool, GeneratorOptions, ToolArg};
pub use resolver::Resolver;
