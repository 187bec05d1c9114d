//! MCP stdio server exposing the ServiceStage, CAE and FunctionGraph REST APIs
//! as tools, with tools generated from an OpenAPI document.

pub mod app;
pub mod config;
pub mod constants;
pub mod errors;
pub mod http;
pub mod mcp;
pub mod openapi;
pub mod services;
pub mod tools;
pub mod utils;
